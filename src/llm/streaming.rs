// src/llm/streaming.rs
// Event types for the chat-completions SSE stream.

use serde_json::Value;
use tracing::warn;

use super::sse::data_payload;

/// Events emitted while streaming a completion.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Text delta from the model
    Delta(String),
    /// Upstream emitted its `[DONE]` sentinel
    Done,
    /// Error frame mid-stream
    Error(String),
}

impl StreamEvent {
    /// Parse one SSE line from the chat-completions stream.
    ///
    /// Returns `None` for lines that carry no event: non-data lines,
    /// keep-alive comments, deltas without content (role preludes), and
    /// malformed JSON. A malformed line is logged and skipped so one bad
    /// frame never loses the rest of the response.
    pub fn from_sse_line(line: &str) -> Option<Self> {
        let data = data_payload(line)?;

        if data == "[DONE]" {
            return Some(StreamEvent::Done);
        }

        let json: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "skipping malformed stream line");
                return None;
            }
        };

        if let Some(error) = json.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown upstream error")
                .to_string();
            return Some(StreamEvent::Error(message));
        }

        json.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("delta"))
            .and_then(|d| d.get("content"))
            .and_then(|t| t.as_str())
            .map(|t| StreamEvent::Delta(t.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_extraction() {
        let line = r#"data: {"choices":[{"delta":{"content":"He"}}]}"#;
        match StreamEvent::from_sse_line(line) {
            Some(StreamEvent::Delta(text)) => assert_eq!(text, "He"),
            other => panic!("expected delta, got {:?}", other),
        }
    }

    #[test]
    fn test_done_sentinel() {
        assert!(matches!(
            StreamEvent::from_sse_line("data: [DONE]"),
            Some(StreamEvent::Done)
        ));
    }

    #[test]
    fn test_malformed_json_skipped() {
        assert!(StreamEvent::from_sse_line("data: {not json").is_none());
    }

    #[test]
    fn test_non_data_line_skipped() {
        assert!(StreamEvent::from_sse_line(": keep-alive").is_none());
    }

    #[test]
    fn test_role_prelude_has_no_content() {
        let line = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert!(StreamEvent::from_sse_line(line).is_none());
    }

    #[test]
    fn test_error_frame() {
        let line = r#"data: {"error":{"message":"rate limited"}}"#;
        match StreamEvent::from_sse_line(line) {
            Some(StreamEvent::Error(msg)) => assert_eq!(msg, "rate limited"),
            other => panic!("expected error, got {:?}", other),
        }
    }
}
