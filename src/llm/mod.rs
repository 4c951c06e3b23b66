// src/llm/mod.rs

pub mod client;
pub mod sse;
pub mod streaming;

pub use client::{to_wire_messages, CompletionClient, StreamError};
pub use streaming::StreamEvent;
