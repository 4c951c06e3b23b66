// src/chat/mod.rs

pub mod checkpoint;
pub mod send;
pub mod store;
pub mod types;

pub use send::{ChatClient, SendOutcome, SendRequest};
pub use store::{ChatStore, SqliteChatStore};
pub use types::{ChatMessage, ChatSummary, Role};
