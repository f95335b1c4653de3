//! Adapter bridging rig-core's `CompletionModel` to our `LlmProvider` trait.

use std::time::Duration;

use async_trait::async_trait;
use rig::completion::CompletionModel;
use rig::message::{AssistantContent, Message};

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, LlmProvider};
use crate::store::Role;

/// Wraps a rig completion model. The generation call runs under a bounded
/// timeout; the original design had none and a hung provider blocked the
/// whole session.
pub struct RigAdapter<M: CompletionModel> {
    model: M,
    model_name: String,
    timeout: Duration,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str, timeout: Duration) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl<M: CompletionModel> LlmProvider for RigAdapter<M> {
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
    ) -> Result<String, LlmError> {
        let mut preamble = system_prompt.to_string();
        let mut messages: Vec<Message> = Vec::with_capacity(history.len());

        for msg in history {
            match msg.role {
                Role::User => messages.push(Message::user(msg.content.clone())),
                Role::Assistant => messages.push(Message::assistant(msg.content.clone())),
                // Stored system messages fold into the preamble.
                Role::System => {
                    preamble.push_str("\n\n");
                    preamble.push_str(&msg.content);
                }
            }
        }

        // The final user turn is the prompt; everything before it is chat
        // history.
        let prompt = messages.pop().ok_or_else(|| LlmError::RequestFailed {
            provider: self.model_name.clone(),
            reason: "empty message history".to_string(),
        })?;

        let request = self
            .model
            .completion_request(prompt)
            .preamble(preamble)
            .messages(messages);

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| LlmError::Timeout {
                timeout: self.timeout,
            })?
            .map_err(|e| LlmError::RequestFailed {
                provider: self.model_name.clone(),
                reason: e.to_string(),
            })?;

        let text: String = response
            .choice
            .iter()
            .filter_map(|content| match content {
                AssistantContent::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.model_name.clone(),
                reason: "response contained no text".to_string(),
            });
        }

        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
