// src/api/http/chat.rs
// Streaming chat proxy and conversation history endpoints.

use axum::{
    extract::{Path, Query, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use tracing::{error, info, warn};

use crate::api::error::{ApiError, IntoApiError};
use crate::chat::types::{ChatMessage, ChatSummary};
use crate::chat::ChatStore;
use crate::config::CONFIG;
use crate::llm::{to_wire_messages, StreamEvent};
use crate::server::db;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct StreamChatRequest {
    pub messages: Vec<ChatMessage>,
    pub system_prompt: Option<String>,
    pub book_slug: Option<String>,
}

/// Health check and status endpoint
pub async fn status_handler(State(state): State<AppState>) -> Json<Value> {
    let schema_version = db::get_schema_version(&state.db).await.unwrap_or(0);
    Json(json!({
        "status": "ok",
        "model": CONFIG.model,
        "database": true,
        "schema_version": schema_version,
    }))
}

/// SSE streaming chat proxy.
///
/// Forwards the message list to the completion API with streaming enabled
/// and re-emits each token as `data: {"content": token}`. The stream always
/// ends with an explicit `data: [DONE]` frame; upstream failures become a
/// single `data: {"error": ...}` frame rather than a silent close.
pub async fn chat_stream_handler(
    State(state): State<AppState>,
    Json(request): Json<StreamChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if request.messages.is_empty() {
        return Err(ApiError::bad_request("messages must not be empty"));
    }

    let system_prompt = match request.system_prompt {
        Some(prompt) => Some(prompt),
        None => state
            .prompts
            .resolve(request.book_slug.as_deref())
            .await
            .into_api_error("Failed to resolve book prompt")?,
    };

    info!(
        messages = request.messages.len(),
        has_prompt = system_prompt.is_some(),
        "opening chat stream"
    );

    let payload = to_wire_messages(system_prompt.as_deref(), &request.messages);
    let llm = state.llm.clone();

    let stream = async_stream::stream! {
        let mut rx = match llm.stream_chat(payload).await {
            Ok(rx) => rx,
            Err(e) => {
                error!(error = %e, "upstream completion request failed");
                yield Ok(Event::default().data(json!({ "error": e.to_string() }).to_string()));
                return;
            }
        };

        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::Delta(token) => {
                    yield Ok(Event::default().data(json!({ "content": token }).to_string()));
                }
                StreamEvent::Done => {
                    yield Ok(Event::default().data("[DONE]"));
                    return;
                }
                StreamEvent::Error(message) => {
                    warn!(error = %message, "upstream emitted error mid-stream");
                    yield Ok(Event::default().data(json!({ "error": message }).to_string()));
                    return;
                }
            }
        }

        // Upstream closed without its sentinel; still end the frame stream
        // explicitly so buffered clients see a terminal marker.
        yield Ok(Event::default().data("[DONE]"));
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Load one stored conversation.
pub async fn load_chat_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let messages = state
        .chat_store
        .load(&slug)
        .await
        .into_api_error("Failed to load chat")?
        .ok_or_else(|| ApiError::not_found("Chat not found"))?;

    Ok(Json(json!({ "slug": slug, "messages": messages })))
}

#[derive(Deserialize)]
pub struct ListChatsQuery {
    pub user_id: String,
    pub limit: Option<usize>,
}

/// Recent conversations for the sidebar, newest first.
pub async fn list_chats_handler(
    State(state): State<AppState>,
    Query(params): Query<ListChatsQuery>,
) -> Result<Json<Vec<ChatSummary>>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(CONFIG.history_default_limit)
        .min(CONFIG.history_max_limit);

    let chats = state
        .chat_store
        .list_recent(&params.user_id, limit)
        .await
        .into_api_error("Failed to list chats")?;

    Ok(Json(chats))
}
