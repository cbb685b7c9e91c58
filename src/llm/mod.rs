//! Text generation
//!
//! Abstraction over the external LLM provider:
//! - A trait for different generation backends
//! - An OpenAI-compatible chat completion backend
//!
//! Generation calls are never retried; they are not assumed idempotent.

mod http_backend;

pub use http_backend::*;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One chat message in a generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Trait for generation providers
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce a completion for the messages
    async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}
