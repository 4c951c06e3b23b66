// src/chat/store.rs
// Conversation persistence keyed by slug, one row per conversation.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::warn;

use super::types::{ChatMessage, ChatSummary};

/// Max characters of the first message used for the derived title.
const TITLE_MAX_CHARS: usize = 50;

/// Persistence seam for conversations.
///
/// `persist` is called often (pre-send, every streaming checkpoint, final
/// write), so it must stay a cheap single upsert. Failures propagate to the
/// caller, who is expected to log and keep the live stream going.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn persist(
        &self,
        user_id: &str,
        slug: &str,
        messages: &[ChatMessage],
        book_slug: Option<&str>,
    ) -> Result<()>;

    /// Load the stored message list. Returns `None` for a missing row or a
    /// payload that fails shape validation - never a partially-valid list.
    async fn load(&self, slug: &str) -> Result<Option<Vec<ChatMessage>>>;

    /// Recent conversations for one user, newest first.
    async fn list_recent(&self, user_id: &str, limit: usize) -> Result<Vec<ChatSummary>>;
}

/// Derive the sidebar title from the first message: first 50 chars, with a
/// trailing ellipsis iff the original was longer.
pub fn derive_title(messages: &[ChatMessage]) -> String {
    let first = match messages.first() {
        Some(m) => m.content.as_str(),
        None => return String::new(),
    };
    let truncated: String = first.chars().take(TITLE_MAX_CHARS).collect();
    if first.chars().count() > TITLE_MAX_CHARS {
        format!("{truncated}…")
    } else {
        truncated
    }
}

/// Plain-text tail shown in the conversation list.
pub fn derive_last_message(messages: &[ChatMessage]) -> String {
    messages
        .last()
        .map(|m| m.content.clone())
        .unwrap_or_default()
}

/// Validate and decode a stored message payload. Any element with an
/// unknown role or a non-string content rejects the whole list.
pub fn decode_messages(raw: &str) -> Option<Vec<ChatMessage>> {
    serde_json::from_str::<Vec<ChatMessage>>(raw).ok()
}

/// SQLite-backed conversation store.
pub struct SqliteChatStore {
    pool: SqlitePool,
}

impl SqliteChatStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    async fn persist(
        &self,
        user_id: &str,
        slug: &str,
        messages: &[ChatMessage],
        book_slug: Option<&str>,
    ) -> Result<()> {
        if user_id.is_empty() || slug.is_empty() || messages.is_empty() {
            return Ok(());
        }

        let title = derive_title(messages);
        let last_message = derive_last_message(messages);
        let serialized = serde_json::to_string(messages)?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"INSERT INTO chats (slug, user_id, title, book_slug, last_message, last_accessed, messages)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               ON CONFLICT(slug) DO UPDATE SET
                   user_id = excluded.user_id,
                   title = excluded.title,
                   book_slug = excluded.book_slug,
                   last_message = excluded.last_message,
                   last_accessed = excluded.last_accessed,
                   messages = excluded.messages"#,
        )
        .bind(slug)
        .bind(user_id)
        .bind(&title)
        .bind(book_slug)
        .bind(&last_message)
        .bind(now)
        .bind(&serialized)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load(&self, slug: &str) -> Result<Option<Vec<ChatMessage>>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT messages FROM chats WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        let Some((raw,)) = row else {
            return Ok(None);
        };

        match decode_messages(&raw) {
            Some(messages) => Ok(Some(messages)),
            None => {
                warn!(slug = %slug, "stored messages failed validation, treating as missing");
                Ok(None)
            }
        }
    }

    async fn list_recent(&self, user_id: &str, limit: usize) -> Result<Vec<ChatSummary>> {
        let rows: Vec<(String, String, String, i64)> = sqlx::query_as(
            r#"SELECT slug, title, last_message, last_accessed
               FROM chats
               WHERE user_id = $1
               ORDER BY last_accessed DESC
               LIMIT $2"#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(slug, title, last_message, last_accessed)| ChatSummary {
                slug,
                title,
                last_message,
                last_accessed,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::types::Role;

    #[test]
    fn test_title_short_message_untouched() {
        let messages = vec![ChatMessage::user("O que é graça?")];
        assert_eq!(derive_title(&messages), "O que é graça?");
    }

    #[test]
    fn test_title_truncated_with_ellipsis() {
        let long = "a".repeat(80);
        let messages = vec![ChatMessage::user(long)];
        let title = derive_title(&messages);
        assert_eq!(title.chars().count(), 51);
        assert!(title.ends_with('…'));
    }

    #[test]
    fn test_title_exactly_at_boundary_has_no_ellipsis() {
        let exact = "b".repeat(50);
        let messages = vec![ChatMessage::user(exact.clone())];
        assert_eq!(derive_title(&messages), exact);
    }

    #[test]
    fn test_title_counts_chars_not_bytes() {
        // 60 multibyte chars; truncation must not split a char
        let accented = "é".repeat(60);
        let messages = vec![ChatMessage::user(accented)];
        let title = derive_title(&messages);
        assert_eq!(title.chars().count(), 51);
    }

    #[test]
    fn test_last_message_is_final_entry() {
        let messages = vec![
            ChatMessage::user("pergunta"),
            ChatMessage::assistant("resposta final"),
        ];
        assert_eq!(derive_last_message(&messages), "resposta final");
    }

    #[test]
    fn test_decode_valid_messages() {
        let raw = r#"[{"role":"user","content":"oi"},{"role":"assistant","content":"olá"}]"#;
        let messages = decode_messages(raw).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].content, "olá");
    }

    #[test]
    fn test_decode_rejects_unknown_role() {
        let raw = r#"[{"role":"user","content":"oi"},{"role":"system","content":"x"}]"#;
        assert!(decode_messages(raw).is_none());
    }

    #[test]
    fn test_decode_rejects_non_string_content() {
        let raw = r#"[{"role":"user","content":42}]"#;
        assert!(decode_messages(raw).is_none());
    }

    #[test]
    fn test_decode_rejects_non_object_element() {
        let raw = r#"[{"role":"user","content":"ok"},"stray"]"#;
        assert!(decode_messages(raw).is_none());
    }
}
