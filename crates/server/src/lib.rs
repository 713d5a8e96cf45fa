//! HTTP surface of the to-do backend. The binary in `main.rs` wires settings
//! and storage into [`build_router`].

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use server_api::{add_item, list_items, mark_completed, ApiContext};
use shared::{
    domain::{Item, ItemId},
    error::{ApiError, ErrorCode},
    protocol::{CanonicalList, COMPLETE_ITEM_ROUTE, HEALTHZ_ROUTE, ITEMS_ROUTE},
};
use tracing::{error, warn};

mod app_state;
pub mod config;

pub use app_state::AppState;

type HttpError = (StatusCode, Json<ApiError>);

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(HEALTHZ_ROUTE, get(healthz))
        .route(ITEMS_ROUTE, get(http_list_items).post(http_add_item))
        .route(COMPLETE_ITEM_ROUTE, post(http_complete_item))
        .with_state(state)
}

/// Convenience for callers that only have an [`ApiContext`].
pub fn router_for(api: ApiContext) -> Router {
    build_router(Arc::new(AppState { api }))
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, HttpError> {
    state
        .api
        .storage
        .health_check()
        .await
        .map_err(|e| reject(ApiError::new(ErrorCode::Internal, e.to_string())))?;
    Ok("ok")
}

async fn http_list_items(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CanonicalList>, HttpError> {
    let items = list_items(&state.api).await.map_err(reject)?;
    Ok(Json(items))
}

async fn http_add_item(
    State(state): State<Arc<AppState>>,
    Json(item): Json<Item>,
) -> Result<Json<CanonicalList>, HttpError> {
    let items = add_item(&state.api, item).await.map_err(reject)?;
    Ok(Json(items))
}

async fn http_complete_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
) -> Result<Json<CanonicalList>, HttpError> {
    let items = mark_completed(&state.api, &ItemId(item_id))
        .await
        .map_err(reject)?;
    Ok(Json(items))
}

fn reject(err: ApiError) -> HttpError {
    let status = match err.code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(message = %err.message, "request failed");
    } else {
        warn!(code = ?err.code, message = %err.message, "request rejected");
    }
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
