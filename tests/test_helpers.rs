// tests/test_helpers.rs
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use berea::llm::CompletionClient;
use berea::AppState;

/// In-memory SQLite with the real migrations applied.
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("create in-memory sqlite");

    berea::server::db::run_migrations(&pool, Path::new("./migrations"))
        .await
        .expect("run migrations");

    pool
}

#[derive(Clone)]
struct UpstreamState {
    chunks: Arc<Vec<String>>,
    requests: Arc<tokio::sync::Mutex<Vec<serde_json::Value>>>,
}

async fn serve_chunks(
    State(state): State<UpstreamState>,
    axum::Json(body): axum::Json<serde_json::Value>,
) -> Response {
    state.requests.lock().await.push(body);

    let parts: Vec<Result<axum::body::Bytes, std::convert::Infallible>> = state
        .chunks
        .iter()
        .map(|c| Ok(axum::body::Bytes::from(c.clone())))
        .collect();

    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(Body::from_stream(futures::stream::iter(parts)))
        .unwrap()
}

/// Fake chat-completion API that streams the given chunks verbatim and
/// records every request body. Chunk boundaries are preserved so tests can
/// exercise partial-line and multi-line delivery.
pub async fn spawn_fake_upstream(
    chunks: Vec<String>,
) -> (SocketAddr, Arc<tokio::sync::Mutex<Vec<serde_json::Value>>>) {
    let requests = Arc::new(tokio::sync::Mutex::new(Vec::new()));
    let state = UpstreamState {
        chunks: Arc::new(chunks),
        requests: requests.clone(),
    };

    let app = Router::new()
        .route("/v1/chat/completions", post(serve_chunks))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, requests)
}

/// Fake upstream that rejects every request.
pub async fn spawn_failing_upstream(status: u16, body: &'static str) -> SocketAddr {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(move || async move {
            (
                StatusCode::from_u16(status).unwrap(),
                body.to_string(),
            )
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Build the app over the given pool, pointed at a fake upstream.
pub fn test_app_state(pool: SqlitePool, upstream: SocketAddr) -> AppState {
    let llm = CompletionClient::with_config(
        "test-key",
        format!("http://{}/v1", upstream),
        "test-model",
    );
    AppState::new(pool, llm)
}

/// Serve the real router on an ephemeral port.
pub async fn spawn_app(state: AppState) -> SocketAddr {
    let app = berea::api::http::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
