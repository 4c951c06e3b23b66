// src/prompt/mod.rs
// System prompt lookup for book-scoped conversations.

use anyhow::Result;
use sqlx::SqlitePool;

/// Resolves the system prompt associated with a book of scripture.
///
/// `Ok(None)` is the expected result for "no book given" and "no prompt
/// configured" alike - the caller falls back to default behavior. Only row
/// store failures are errors.
#[derive(Clone)]
pub struct BookPromptResolver {
    pool: SqlitePool,
}

impl BookPromptResolver {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn resolve(&self, book_slug: Option<&str>) -> Result<Option<String>> {
        let Some(slug) = book_slug else {
            return Ok(None);
        };

        let row: Option<(String,)> =
            sqlx::query_as("SELECT system_prompt FROM book_prompts WHERE book_slug = $1")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(prompt,)| prompt))
    }
}
