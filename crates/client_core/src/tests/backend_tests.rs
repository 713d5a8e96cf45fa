use super::*;

use std::num::NonZeroU32;

use axum::{http::StatusCode, routing::get, Router};
use server_api::ApiContext;
use shared::domain::{ItemKind, Period};
use storage::Storage;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

async fn serve(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

async fn spawn_todo_server() -> String {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    serve(server::router_for(ApiContext { storage })).await
}

#[tokio::test]
async fn add_fetch_and_complete_against_live_server() {
    let backend = HttpTodoBackend::new(&spawn_todo_server().await).expect("backend");
    assert!(backend.fetch_items().await.expect("fetch").is_empty());

    backend
        .add_item(&Item::task("An item"))
        .await
        .expect("add first");
    let recurring = Item::new(
        "Another item",
        ItemKind::Recurring {
            frequency: NonZeroU32::new(2).expect("non-zero"),
            period: Period::Week,
        },
    );
    let items = backend.add_item(&recurring).await.expect("add second");
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].kind, recurring.kind);
    assert!(items.iter().all(Item::is_persisted));

    let first_id = items[0].id.clone().expect("id");
    let items = backend.complete_item(&first_id).await.expect("complete");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].label, "Another item");
    assert_eq!(backend.fetch_items().await.expect("fetch"), items);
}

#[tokio::test]
async fn base_url_path_prefix_is_preserved() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let app = Router::new().nest("/api", server::router_for(ApiContext { storage }));
    let server_url = serve(app).await;

    let backend = HttpTodoBackend::new(&format!("{server_url}/api/")).expect("backend");
    let items = backend
        .add_item(&Item::task("Nested"))
        .await
        .expect("add");
    assert_eq!(items[0].label, "Nested");
}

#[tokio::test]
async fn validation_error_body_is_decoded() {
    let backend = HttpTodoBackend::new(&spawn_todo_server().await).expect("backend");

    let err = backend
        .add_item(&Item::task("   "))
        .await
        .expect_err("blank label");
    match err {
        BackendError::Status {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 400);
            assert_eq!(code, Some(ErrorCode::Validation));
            assert!(message.contains("label"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn completing_unknown_item_is_not_found() {
    let backend = HttpTodoBackend::new(&spawn_todo_server().await).expect("backend");

    let err = backend
        .complete_item(&ItemId::new("999"))
        .await
        .expect_err("unknown id");
    assert!(matches!(
        err,
        BackendError::Status {
            status: 404,
            code: Some(ErrorCode::NotFound),
            ..
        }
    ));
}

#[tokio::test]
async fn non_json_error_body_is_kept_as_message() {
    let app = Router::new().route(
        "/items",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
    );
    let backend = HttpTodoBackend::with_timeout(&serve(app).await, Duration::from_secs(5))
        .expect("backend");

    let err = backend.fetch_items().await.expect_err("503");
    match err {
        BackendError::Status {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 503);
            assert_eq!(code, None);
            assert_eq!(message, "maintenance");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let backend = HttpTodoBackend::new(&format!("http://{addr}")).expect("backend");
    let err = backend.fetch_items().await.expect_err("refused");
    assert!(matches!(err, BackendError::Http(_)), "{err:?}");
}

#[tokio::test]
async fn truncated_error_body_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket
                .write_all(
                    b"HTTP/1.1 500 Internal Server Error\r\n\
                      content-type: application/json\r\n\
                      content-length: 64\r\n\r\n{\"code\"",
                )
                .await;
        }
    });

    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let backend = HttpTodoBackend::new(&format!("http://{addr}")).expect("backend");
    let err = backend.fetch_items().await.expect_err("body cut short");
    assert!(matches!(err, BackendError::Http(_)), "{err:?}");
}

#[test]
fn rejects_unparsable_or_pathless_urls() {
    assert!(matches!(
        HttpTodoBackend::new("not a url"),
        Err(BackendError::InvalidUrl { .. })
    ));
    assert!(matches!(
        HttpTodoBackend::new("mailto:someone@example.com"),
        Err(BackendError::InvalidUrl { .. })
    ));
}

#[test]
fn endpoints_append_to_base_path() {
    let backend = HttpTodoBackend::new("http://localhost:8080/todo").expect("backend");
    assert_eq!(
        backend.endpoint(["items"]).expect("url").as_str(),
        "http://localhost:8080/todo/items"
    );
    assert_eq!(
        backend
            .endpoint(complete_item_segments("a/b"))
            .expect("url")
            .as_str(),
        "http://localhost:8080/todo/items/a%2Fb/complete"
    );
    assert_eq!(backend.base_url().as_str(), "http://localhost:8080/todo");
}
