// src/chat/types.rs

use serde::{Deserialize, Serialize};

/// Who authored a message. Serialized lowercase to match the wire format
/// of the completion API and the stored conversation JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry in a conversation. The in-flight assistant message grows
/// while its response streams; everything else is append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sidebar summary of a stored conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSummary {
    pub slug: String,
    pub title: String,
    pub last_message: String,
    pub last_accessed: i64,
}
