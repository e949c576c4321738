use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod catalog;
pub mod mocks;
pub mod openrouter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One role-tagged message in a chat-completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Sampling parameters for one request. Temperature is clamped to the
/// valid range at request time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingProfile {
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Generated text plus usage accounting.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

/// Boundary to the text-generation service. Implementations own their
/// connection pool and transport retry policy; callers see a single
/// request that either yields text or a final `LlmError`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        profile: SamplingProfile,
    ) -> Result<Completion, LlmError>;
}
