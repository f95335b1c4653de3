//! Persistence layer — libSQL-backed storage for conversations and messages.

pub mod conversations;
pub mod migrations;
pub mod model;

pub use conversations::{ConversationStore, DEFAULT_LIST_LIMIT};
pub use model::{Conversation, Role, StoredMessage};
