// src/state.rs

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::chat::SqliteChatStore;
use crate::llm::CompletionClient;
use crate::prompt::BookPromptResolver;
use crate::study::StudyProgressStore;

/// Shared server state: the pool plus the services built over it.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub chat_store: Arc<SqliteChatStore>,
    pub prompts: BookPromptResolver,
    pub progress: StudyProgressStore,
    pub llm: Arc<CompletionClient>,
}

impl AppState {
    pub fn new(pool: SqlitePool, llm: CompletionClient) -> Self {
        Self {
            chat_store: Arc::new(SqliteChatStore::new(pool.clone())),
            prompts: BookPromptResolver::new(pool.clone()),
            progress: StudyProgressStore::new(pool.clone()),
            llm: Arc::new(llm),
            db: pool,
        }
    }
}
