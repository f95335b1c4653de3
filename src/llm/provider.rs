//! Provider abstraction — what the session layer needs from a model.

use async_trait::async_trait;

use crate::error::LlmError;
use crate::store::Role;

/// One `{role, content}` pair sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
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

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Text-generation capability: one request/response call per user turn.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a reply from the system prompt and the ordered history.
    /// The last history entry is the user turn being answered.
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
    ) -> Result<String, LlmError>;

    /// Model identifier, for logging and display.
    fn model_name(&self) -> &str;
}
