//! Language-model provider trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatRequest, ChatResponse};

/// A chat-completion backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name, used in log lines.
    fn name(&self) -> &str;

    /// Send one system + user prompt pair and return the completion.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;
}
