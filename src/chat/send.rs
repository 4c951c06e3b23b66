// src/chat/send.rs
// Send-message flow: stream the assistant response, render, checkpoint.

use anyhow::{bail, Result};
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::llm::sse::{data_payload, SseLineBuffer};
use crate::prompt::BookPromptResolver;

use super::checkpoint::CheckpointQueue;
use super::store::ChatStore;
use super::types::ChatMessage;

/// Default checkpoint granularity: persist in-progress assistant content
/// every time it grows by this many characters.
pub const DEFAULT_CHECKPOINT_CHARS: usize = 100;

/// One send operation.
#[derive(Debug, Clone, Default)]
pub struct SendRequest {
    pub content: String,
    pub prior_messages: Vec<ChatMessage>,
    pub book_slug: Option<String>,
    pub user_id: Option<String>,
    pub slug: Option<String>,
    pub system_prompt_override: Option<String>,
}

/// Result of a send: the full message list (user message appended, assistant
/// reply or error bubble at the tail) and the conversation slug.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub messages: Vec<ChatMessage>,
    pub slug: String,
}

/// Consumes the streaming chat endpoint: sends a message, renders tokens as
/// they arrive via the `on_chunk` callback, and persists conversation state
/// incrementally through a [`ChatStore`].
pub struct ChatClient {
    http: reqwest::Client,
    stream_url: String,
    store: Arc<dyn ChatStore>,
    prompts: BookPromptResolver,
    checkpoint_every: usize,
}

impl ChatClient {
    pub fn new(
        stream_url: impl Into<String>,
        store: Arc<dyn ChatStore>,
        prompts: BookPromptResolver,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            stream_url: stream_url.into(),
            store,
            prompts,
            checkpoint_every: DEFAULT_CHECKPOINT_CHARS,
        }
    }

    pub fn with_checkpoint_interval(mut self, chars: usize) -> Self {
        self.checkpoint_every = chars.max(1);
        self
    }

    /// Send a message and stream the reply.
    ///
    /// Rendering always precedes persistence: `on_chunk` fires for a token
    /// before any checkpoint containing it is enqueued, so the stored record
    /// never shows content the caller has not seen. With a `user_id`, the
    /// user message is persisted before the stream opens, a checkpoint is
    /// enqueued at every 100-character boundary of assistant content, and a
    /// final authoritative persist runs once the stream ends.
    ///
    /// Any failure mid-stream replaces the in-progress assistant entry with
    /// a visible error bubble; the outcome still carries the full list.
    pub async fn send_message(
        &self,
        request: SendRequest,
        mut on_chunk: impl FnMut(&str),
    ) -> Result<SendOutcome> {
        let mut messages = request.prior_messages.clone();
        messages.push(ChatMessage::user(request.content.as_str()));

        let system_prompt = match &request.system_prompt_override {
            Some(prompt) => Some(prompt.clone()),
            None => self
                .prompts
                .resolve(request.book_slug.as_deref())
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "book prompt lookup failed, using default behavior");
                    None
                }),
        };

        let slug = request
            .slug
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        // A recoverable record must exist even if the reply never completes.
        if let Some(user_id) = &request.user_id {
            if let Err(e) = self
                .store
                .persist(user_id, &slug, &messages, request.book_slug.as_deref())
                .await
            {
                warn!(slug = %slug, error = %e, "pre-send persist failed");
            }
        }

        let mut checkpoints = request.user_id.as_ref().map(|user_id| {
            CheckpointQueue::spawn(
                self.store.clone(),
                user_id.clone(),
                slug.clone(),
                request.book_slug.clone(),
            )
        });

        let assistant_content = match self
            .stream_assistant(
                &messages,
                system_prompt.as_deref(),
                request.book_slug.as_deref(),
                &mut on_chunk,
                &mut checkpoints,
            )
            .await
        {
            Ok(content) => {
                info!(slug = %slug, chars = content.chars().count(), "assistant reply complete");
                content
            }
            Err(e) => {
                warn!(slug = %slug, error = %e, "send failed mid-stream");
                format!("Ocorreu um erro: {e}")
            }
        };

        messages.push(ChatMessage::assistant(assistant_content));

        if let Some(queue) = checkpoints.take() {
            queue.finish().await;
        }

        if let Some(user_id) = &request.user_id {
            if let Err(e) = self
                .store
                .persist(user_id, &slug, &messages, request.book_slug.as_deref())
                .await
            {
                warn!(slug = %slug, error = %e, "final persist failed");
            }
        }

        Ok(SendOutcome { messages, slug })
    }

    /// Read the streaming endpoint until its terminal frame, accumulating
    /// assistant text and firing callbacks/checkpoints per token.
    async fn stream_assistant(
        &self,
        base: &[ChatMessage],
        system_prompt: Option<&str>,
        book_slug: Option<&str>,
        on_chunk: &mut impl FnMut(&str),
        checkpoints: &mut Option<CheckpointQueue>,
    ) -> Result<String> {
        let body = json!({
            "messages": base,
            "system_prompt": system_prompt,
            "book_slug": book_slug,
        });

        let response = self.http.post(&self.stream_url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            bail!("chat endpoint returned {status}: {text}");
        }

        let mut stream = response.bytes_stream();
        let mut lines = SseLineBuffer::new();
        let mut accumulated = String::new();
        let mut assistant_chars = 0usize;
        let mut checkpoint_marks = 0usize;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for line in lines.push(&chunk) {
                let Some(data) = data_payload(&line) else {
                    continue;
                };
                if data == "[DONE]" {
                    return Ok(accumulated);
                }

                let frame: Value = match serde_json::from_str(data) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(error = %e, "skipping malformed frame");
                        continue;
                    }
                };

                if let Some(message) = frame.get("error").and_then(|e| e.as_str()) {
                    bail!("{message}");
                }

                let Some(token) = frame.get("content").and_then(|t| t.as_str()) else {
                    continue;
                };

                accumulated.push_str(token);
                assistant_chars += token.chars().count();
                on_chunk(token);

                if let Some(queue) = checkpoints.as_mut() {
                    let marks = assistant_chars / self.checkpoint_every;
                    if marks > checkpoint_marks {
                        checkpoint_marks = marks;
                        let mut snapshot = base.to_vec();
                        snapshot.push(ChatMessage::assistant(accumulated.clone()));
                        queue.enqueue(snapshot);
                    }
                }
            }
        }

        // Stream closed without a terminal frame; treat what we have as the
        // complete reply.
        debug!("stream closed without [DONE]");
        Ok(accumulated)
    }
}
