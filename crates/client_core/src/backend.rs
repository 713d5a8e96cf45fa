//! Backend capability consumed by the list synchronizer, plus its HTTP
//! implementation against the to-do server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use shared::{
    domain::{Item, ItemId},
    error::{ApiError, ErrorCode},
    protocol::{complete_item_segments, CanonicalList},
};
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid server url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("transport failure: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {status}: {message}")]
    Status {
        status: u16,
        code: Option<ErrorCode>,
        message: String,
    },
    /// For `TodoBackend` implementations that do not speak HTTP, such as
    /// in-process or offline stores.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Every call answers with the backend's canonical list of open items.
#[async_trait]
pub trait TodoBackend: Send + Sync {
    async fn fetch_items(&self) -> Result<CanonicalList, BackendError>;
    async fn add_item(&self, item: &Item) -> Result<CanonicalList, BackendError>;
    async fn complete_item(&self, item_id: &ItemId) -> Result<CanonicalList, BackendError>;
}

pub struct HttpTodoBackend {
    http: Client,
    base_url: Url,
}

impl HttpTodoBackend {
    pub fn new(server_url: &str) -> Result<Self, BackendError> {
        Self::with_client(server_url, Client::new())
    }

    pub fn with_timeout(server_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let http = Client::builder().timeout(timeout).build()?;
        Self::with_client(server_url, http)
    }

    pub fn with_client(server_url: &str, http: Client) -> Result<Self, BackendError> {
        let base_url = Url::parse(server_url).map_err(|e| BackendError::InvalidUrl {
            url: server_url.to_string(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl {
                url: server_url.to_string(),
                reason: "url cannot carry a path".to_string(),
            });
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "url cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl TodoBackend for HttpTodoBackend {
    async fn fetch_items(&self) -> Result<CanonicalList, BackendError> {
        let url = self.endpoint(["items"])?;
        debug!(%url, "fetching items");
        let res = self.http.get(url).send().await?;
        canonical_list(res).await
    }

    async fn add_item(&self, item: &Item) -> Result<CanonicalList, BackendError> {
        let url = self.endpoint(["items"])?;
        debug!(%url, label = %item.label, "adding item");
        let res = self.http.post(url).json(item).send().await?;
        canonical_list(res).await
    }

    async fn complete_item(&self, item_id: &ItemId) -> Result<CanonicalList, BackendError> {
        let url = self.endpoint(complete_item_segments(item_id.as_str()))?;
        debug!(%url, "completing item");
        let res = self.http.post(url).send().await?;
        canonical_list(res).await
    }
}

async fn canonical_list(res: Response) -> Result<CanonicalList, BackendError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res.json().await?);
    }

    let body = res.bytes().await?;
    let (code, message) = match serde_json::from_slice::<ApiError>(&body) {
        Ok(api_error) => (Some(api_error.code), api_error.message),
        Err(_) if body.is_empty() => (None, status.to_string()),
        Err(_) => (None, String::from_utf8_lossy(&body).into_owned()),
    };
    Err(BackendError::Status {
        status: status.as_u16(),
        code,
        message,
    })
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
