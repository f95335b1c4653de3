//! Session layer — tracks the conversation currently receiving messages and
//! drives the persist → generate → persist pipeline for each user turn.
//!
//! Session state is an explicit value passed into every operation, not a
//! field of the manager, so one manager can serve any number of sessions.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::llm::{ChatMessage, LlmProvider};
use crate::store::{Conversation, ConversationStore, Role, StoredMessage};

/// Per-session state. `current_conversation_id` is `None` until a
/// conversation is started or loaded; nothing within a process resets it.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub user_id: String,
    pub current_conversation_id: Option<String>,
}

impl SessionState {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            current_conversation_id: None,
        }
    }
}

/// Result of loading a conversation by id.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Conversation),
    NotFound,
}

/// Result of sending a message.
#[derive(Debug)]
pub enum SendOutcome {
    /// No active conversation — the message was not sent or persisted.
    NoConversation,
    /// The assistant's reply, already persisted.
    Reply(String),
}

/// Stateless service translating user intents into store and provider calls.
pub struct SessionManager {
    store: Arc<ConversationStore>,
    llm: Arc<dyn LlmProvider>,
    system_prompt: String,
    resource_id: String,
}

impl SessionManager {
    pub fn new(
        store: Arc<ConversationStore>,
        llm: Arc<dyn LlmProvider>,
        system_prompt: String,
        resource_id: String,
    ) -> Self {
        Self {
            store,
            llm,
            system_prompt,
            resource_id,
        }
    }

    /// Create a fresh conversation and make it current. Returns the new id.
    pub async fn start_new(&self, state: &mut SessionState) -> Result<String> {
        let metadata = serde_json::json!({
            "source": "terminal",
            "started_at": Utc::now().to_rfc3339(),
        });
        let conversation_id = self
            .store
            .create_conversation(&state.user_id, &self.resource_id, metadata)
            .await?;

        state.current_conversation_id = Some(conversation_id.clone());
        info!(conversation_id = %conversation_id, "Started new conversation");
        Ok(conversation_id)
    }

    /// Make an existing conversation current. On `NotFound` the state is
    /// left unchanged.
    pub async fn load(&self, state: &mut SessionState, conversation_id: &str) -> Result<LoadOutcome> {
        match self.store.get_conversation(conversation_id).await? {
            Some(conversation) => {
                state.current_conversation_id = Some(conversation.id.clone());
                info!(conversation_id, "Loaded conversation");
                Ok(LoadOutcome::Loaded(conversation))
            }
            None => {
                debug!(conversation_id, "Conversation not found");
                Ok(LoadOutcome::NotFound)
            }
        }
    }

    /// Persist the user's message, generate a reply over the full history,
    /// and persist the reply.
    ///
    /// A provider failure propagates as an error for this turn only; the
    /// user's message stays persisted and the session remains usable.
    pub async fn send(&self, state: &mut SessionState, text: &str) -> Result<SendOutcome> {
        let Some(conversation_id) = state.current_conversation_id.clone() else {
            warn!("send called with no active conversation");
            return Ok(SendOutcome::NoConversation);
        };

        self.store
            .add_message(&conversation_id, &state.user_id, Role::User, text, None)
            .await?;

        let history: Vec<ChatMessage> = self
            .store
            .conversation_messages(&conversation_id)
            .await?
            .into_iter()
            .map(|msg| ChatMessage {
                role: msg.role,
                content: msg.content,
            })
            .collect();

        let reply = self.llm.generate(&self.system_prompt, &history).await?;

        // The assistant reply is recorded under the same user id; there is
        // no separate agent identity.
        self.store
            .add_message(
                &conversation_id,
                &state.user_id,
                Role::Assistant,
                &reply,
                None,
            )
            .await?;

        debug!(conversation_id = %conversation_id, turns = history.len() + 1, "Turn completed");
        Ok(SendOutcome::Reply(reply))
    }

    /// Ordered history of the current conversation, or `None` when no
    /// conversation is active.
    pub async fn history(&self, state: &SessionState) -> Result<Option<Vec<StoredMessage>>> {
        let Some(conversation_id) = state.current_conversation_id.as_deref() else {
            return Ok(None);
        };
        let messages = self.store.conversation_messages(conversation_id).await?;
        Ok(Some(messages))
    }

    /// The user's conversations, most recent activity first.
    pub async fn list(&self, state: &SessionState, limit: usize) -> Result<Vec<Conversation>> {
        Ok(self.store.list_conversations(&state.user_id, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::{Error, LlmError};

    /// Echoes the last user message and records what it was asked.
    struct EchoProvider {
        calls: Mutex<Vec<(String, Vec<ChatMessage>)>>,
    }

    impl EchoProvider {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for EchoProvider {
        async fn generate(
            &self,
            system_prompt: &str,
            history: &[ChatMessage],
        ) -> std::result::Result<String, LlmError> {
            self.calls
                .lock()
                .unwrap()
                .push((system_prompt.to_string(), history.to_vec()));
            let last = history.last().expect("history never empty");
            Ok(format!("echo: {}", last.content))
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl LlmProvider for FailingProvider {
        async fn generate(
            &self,
            _system_prompt: &str,
            _history: &[ChatMessage],
        ) -> std::result::Result<String, LlmError> {
            Err(LlmError::RequestFailed {
                provider: "failing".to_string(),
                reason: "network down".to_string(),
            })
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    async fn manager_with(llm: Arc<dyn LlmProvider>) -> SessionManager {
        let store = Arc::new(ConversationStore::open_memory().await.unwrap());
        SessionManager::new(
            store,
            llm,
            "be helpful".to_string(),
            "tui-session".to_string(),
        )
    }

    #[tokio::test]
    async fn send_without_conversation_is_a_noop() {
        let manager = manager_with(Arc::new(EchoProvider::new())).await;
        let mut state = SessionState::new("user_alice");

        let outcome = manager.send(&mut state, "hello?").await.unwrap();
        assert!(matches!(outcome, SendOutcome::NoConversation));
        assert!(state.current_conversation_id.is_none());
    }

    #[tokio::test]
    async fn start_new_sets_current_and_stamps_metadata() {
        let manager = manager_with(Arc::new(EchoProvider::new())).await;
        let mut state = SessionState::new("user_alice");

        let id = manager.start_new(&mut state).await.unwrap();
        assert_eq!(state.current_conversation_id.as_deref(), Some(id.as_str()));

        let conversations = manager.list(&state, 10).await.unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].resource_id, "tui-session");
        assert_eq!(conversations[0].metadata["source"], "terminal");
        assert!(conversations[0].metadata["started_at"].is_string());
    }

    #[tokio::test]
    async fn send_persists_both_turns() {
        let echo = Arc::new(EchoProvider::new());
        let manager = manager_with(echo.clone()).await;
        let mut state = SessionState::new("user_alice");
        manager.start_new(&mut state).await.unwrap();

        let outcome = manager.send(&mut state, "hi").await.unwrap();
        match outcome {
            SendOutcome::Reply(reply) => assert_eq!(reply, "echo: hi"),
            other => panic!("expected reply, got {other:?}"),
        }

        let history = manager.history(&state).await.unwrap().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "hi");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "echo: hi");
        // Assistant turns carry the human user id.
        assert_eq!(history[1].user_id, "user_alice");
    }

    #[tokio::test]
    async fn provider_sees_system_prompt_and_full_history() {
        let echo = Arc::new(EchoProvider::new());
        let manager = manager_with(echo.clone()).await;
        let mut state = SessionState::new("user_alice");
        manager.start_new(&mut state).await.unwrap();

        manager.send(&mut state, "first").await.unwrap();
        manager.send(&mut state, "second").await.unwrap();

        let calls = echo.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "be helpful");
        assert_eq!(calls[0].1.len(), 1);
        // Second call includes the first exchange plus the new user turn.
        assert_eq!(calls[1].1.len(), 3);
        assert_eq!(calls[1].1[0].content, "first");
        assert_eq!(calls[1].1[1].content, "echo: first");
        assert_eq!(calls[1].1[2].content, "second");
    }

    #[tokio::test]
    async fn provider_failure_keeps_user_message() {
        let store = Arc::new(ConversationStore::open_memory().await.unwrap());
        let manager = SessionManager::new(
            store,
            Arc::new(FailingProvider),
            "be helpful".to_string(),
            "tui-session".to_string(),
        );
        let mut state = SessionState::new("user_alice");
        manager.start_new(&mut state).await.unwrap();

        let err = manager.send(&mut state, "hi").await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));

        // The user's turn is persisted even though no reply was produced.
        let history = manager.history(&state).await.unwrap().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);
        assert!(state.current_conversation_id.is_some());
    }

    #[tokio::test]
    async fn load_unknown_leaves_state_unchanged() {
        let manager = manager_with(Arc::new(EchoProvider::new())).await;
        let mut state = SessionState::new("user_alice");
        let original = manager.start_new(&mut state).await.unwrap();

        let outcome = manager.load(&mut state, "nonexistent-id").await.unwrap();
        assert!(matches!(outcome, LoadOutcome::NotFound));
        assert_eq!(state.current_conversation_id.as_deref(), Some(original.as_str()));
    }

    #[tokio::test]
    async fn load_switches_current_conversation() {
        let manager = manager_with(Arc::new(EchoProvider::new())).await;
        let mut state = SessionState::new("user_alice");
        let first = manager.start_new(&mut state).await.unwrap();
        manager.start_new(&mut state).await.unwrap();

        let outcome = manager.load(&mut state, &first).await.unwrap();
        match outcome {
            LoadOutcome::Loaded(conversation) => assert_eq!(conversation.id, first),
            LoadOutcome::NotFound => panic!("expected load to succeed"),
        }
        assert_eq!(state.current_conversation_id.as_deref(), Some(first.as_str()));
    }

    #[tokio::test]
    async fn history_without_conversation_is_none() {
        let manager = manager_with(Arc::new(EchoProvider::new())).await;
        let state = SessionState::new("user_alice");
        assert!(manager.history(&state).await.unwrap().is_none());
    }
}
