// src/llm/client.rs

use futures::StreamExt;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::chat::types::ChatMessage;
use crate::config::CONFIG;

use super::sse::SseLineBuffer;
use super::streaming::StreamEvent;

/// Errors surfaced by the streaming completion request.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("upstream API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("OPENAI_API_KEY not set")]
    MissingApiKey,
}

/// Client for the external chat-completion API.
#[derive(Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl CompletionClient {
    /// Build from the environment, with base URL and model from config.
    pub fn new() -> Result<Self, StreamError> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| StreamError::MissingApiKey)?;
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONFIG.openai_timeout))
            .build()?;

        Ok(Self {
            client,
            api_key,
            api_base: CONFIG.openai_base_url.clone(),
            model: CONFIG.model.clone(),
        })
    }

    pub fn with_config(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            api_base: api_base.into(),
            model: model.into(),
        }
    }

    /// Open a streaming completion for `messages` and forward its events
    /// through a channel.
    ///
    /// A non-OK upstream response is read in full and returned as
    /// `StreamError::Api` before any event is emitted. Once streaming, a
    /// malformed line is skipped (never fatal), a transport error becomes a
    /// final `StreamEvent::Error`, and the channel closes when the upstream
    /// finishes.
    pub async fn stream_chat(
        &self,
        messages: Vec<Value>,
    ) -> Result<mpsc::Receiver<StreamEvent>, StreamError> {
        let payload = json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.api_base.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(StreamError::Api { status, body });
        }

        let (tx, rx) = mpsc::channel(100);
        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut lines = SseLineBuffer::new();

            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(error = %e, "completion stream transport error");
                        let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                        return;
                    }
                };

                for line in lines.push(&chunk) {
                    let Some(event) = StreamEvent::from_sse_line(&line) else {
                        continue;
                    };
                    let done = matches!(event, StreamEvent::Done | StreamEvent::Error(_));
                    if tx.send(event).await.is_err() {
                        debug!("stream consumer dropped, abandoning completion");
                        return;
                    }
                    if done {
                        return;
                    }
                }
            }
            // Upstream closed without [DONE]; channel close signals the end.
        });

        Ok(rx)
    }
}

/// Assemble the upstream message payload, prepending the system prompt
/// when one resolved.
pub fn to_wire_messages(system_prompt: Option<&str>, messages: &[ChatMessage]) -> Vec<Value> {
    let mut wire = Vec::with_capacity(messages.len() + 1);
    if let Some(prompt) = system_prompt {
        wire.push(json!({ "role": "system", "content": prompt }));
    }
    for message in messages {
        wire.push(json!({ "role": message.role.to_string(), "content": message.content }));
    }
    wire
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_messages_prepend_system() {
        let messages = vec![ChatMessage::user("oi")];
        let wire = to_wire_messages(Some("Você é um assistente de estudo bíblico."), &messages);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[1]["role"], "user");
        assert_eq!(wire[1]["content"], "oi");
    }

    #[test]
    fn test_wire_messages_without_system() {
        let messages = vec![
            ChatMessage::user("pergunta"),
            ChatMessage::assistant("resposta"),
        ];
        let wire = to_wire_messages(None, &messages);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0]["role"], "user");
        assert_eq!(wire[1]["role"], "assistant");
    }
}
