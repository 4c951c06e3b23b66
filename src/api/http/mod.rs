// src/api/http/mod.rs

pub mod chat;
pub mod study;

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/api/status", get(chat::status_handler))
        .route("/api/chat/stream", post(chat::chat_stream_handler))
        .route("/api/chats", get(chat::list_chats_handler))
        .route("/api/chats/{slug}", get(chat::load_chat_handler))
        .route("/api/study/toggle", post(study::toggle_handler))
        .route("/api/study/{guide_slug}", get(study::progress_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
