//! Row types for the persistence layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// The DB string for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// Parse a role string from the DB. Unknown strings map to `User` so a
    /// hand-edited row never poisons history reconstruction.
    pub fn parse(s: &str) -> Self {
        match s {
            "assistant" => Role::Assistant,
            "system" => Role::System,
            _ => Role::User,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub resource_id: String,
    pub user_id: String,
    /// Opaque document set at creation. Parsed from the JSON TEXT column.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// Advances to the timestamp of each appended message.
    pub updated_at: DateTime<Utc>,
}

/// A persisted message. Identity is `(conversation_id, message_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub conversation_id: String,
    pub message_id: String,
    pub user_id: String,
    pub role: Role,
    pub content: String,
    pub metadata: Option<serde_json::Value>,
    /// Sole ordering key within a conversation.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_db_strings() {
        for role in [Role::User, Role::Assistant, Role::System] {
            assert_eq!(Role::parse(role.as_str()), role);
        }
    }

    #[test]
    fn unknown_role_falls_back_to_user() {
        assert_eq!(Role::parse("tool"), Role::User);
        assert_eq!(Role::parse(""), Role::User);
    }
}
