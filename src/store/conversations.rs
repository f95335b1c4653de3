//! Conversation store — all reads and writes against the two relations.
//!
//! Owns a libsql connection. Timestamps are written as RFC 3339 TEXT, which
//! sorts lexicographically in query ORDER BY clauses; ties on `created_at`
//! fall back to rowid, i.e. insertion order.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::migrations;
use crate::store::model::{Conversation, Role, StoredMessage};

/// Default page size for conversation listings.
pub const DEFAULT_LIST_LIMIT: usize = 20;

const CONVERSATION_COLUMNS: &str = "id, resource_id, user_id, metadata, created_at, updated_at";

const MESSAGE_COLUMNS: &str =
    "conversation_id, message_id, user_id, role, content, metadata, created_at";

/// libSQL-backed conversation store.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct ConversationStore {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
}

impl ConversationStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Open(format!("Failed to create database directory: {e}")))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.initialize().await?;
        info!(path = %path.display(), "Conversation store opened");
        Ok(store)
    }

    /// Create an in-memory store (for tests).
    pub async fn open_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.initialize().await?;
        Ok(store)
    }

    /// Idempotently ensure the schema exists.
    async fn initialize(&self) -> Result<(), StoreError> {
        migrations::run_migrations(&self.conn).await
    }

    /// Create a conversation and return its id.
    ///
    /// `created_at == updated_at` at insertion.
    pub async fn create_conversation(
        &self,
        user_id: &str,
        resource_id: &str,
        metadata: serde_json::Value,
    ) -> Result<String, StoreError> {
        let conversation_id = format!("chat_{}", Uuid::new_v4());
        let now = Utc::now().to_rfc3339();
        let metadata_json = serde_json::to_string(&metadata)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.conn
            .execute(
                "INSERT INTO memory_conversations (id, resource_id, user_id, metadata, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![conversation_id.clone(), resource_id, user_id, metadata_json, now],
            )
            .await
            .map_err(|e| StoreError::Query(format!("create_conversation: {e}")))?;

        debug!(conversation_id = %conversation_id, user_id, "Conversation created");
        Ok(conversation_id)
    }

    /// Append a message and advance the owning conversation's `updated_at`
    /// to the message timestamp. Both writes happen in one transaction.
    ///
    /// The conversation's existence is not checked; appending to an unknown
    /// id inserts an orphan row the read paths will never surface.
    pub async fn add_message(
        &self,
        conversation_id: &str,
        user_id: &str,
        role: Role,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<String, StoreError> {
        let message_id = format!("msg_{}", Uuid::new_v4());
        let now = Utc::now().to_rfc3339();
        let metadata_json = match metadata {
            Some(value) => libsql::Value::Text(
                serde_json::to_string(&value)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?,
            ),
            None => libsql::Value::Null,
        };

        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| StoreError::Query(format!("add_message begin: {e}")))?;

        tx.execute(
            "INSERT INTO memory_messages (conversation_id, message_id, user_id, role, content, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                conversation_id,
                message_id.clone(),
                user_id,
                role.as_str(),
                content,
                metadata_json,
                now.clone(),
            ],
        )
        .await
        .map_err(|e| StoreError::Query(format!("add_message insert: {e}")))?;

        tx.execute(
            "UPDATE memory_conversations SET updated_at = ?1 WHERE id = ?2",
            params![now, conversation_id],
        )
        .await
        .map_err(|e| StoreError::Query(format!("add_message touch: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Query(format!("add_message commit: {e}")))?;

        debug!(conversation_id, message_id = %message_id, role = role.as_str(), "Message appended");
        Ok(message_id)
    }

    /// All messages of a conversation, oldest first.
    ///
    /// Returns an empty vec (not an error) for an unknown or empty
    /// conversation.
    pub async fn conversation_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM memory_messages
                     WHERE conversation_id = ?1 ORDER BY created_at ASC, rowid ASC"
                ),
                params![conversation_id],
            )
            .await
            .map_err(|e| StoreError::Query(format!("conversation_messages: {e}")))?;

        let mut messages = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_message(&row) {
                Ok(msg) => messages.push(msg),
                Err(e) => {
                    tracing::warn!("Skipping message row: {e}");
                }
            }
        }
        Ok(messages)
    }

    /// Look up a conversation by id. `None` when absent.
    pub async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Conversation>, StoreError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM memory_conversations WHERE id = ?1"),
                params![conversation_id],
            )
            .await
            .map_err(|e| StoreError::Query(format!("get_conversation: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let conversation = row_to_conversation(&row)
                    .map_err(|e| StoreError::Query(format!("get_conversation row parse: {e}")))?;
                Ok(Some(conversation))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("get_conversation: {e}"))),
        }
    }

    /// Conversations owned by `user_id`, most recent activity first.
    pub async fn list_conversations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Conversation>, StoreError> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM memory_conversations
                     WHERE user_id = ?1 ORDER BY updated_at DESC LIMIT ?2"
                ),
                params![user_id, limit as i64],
            )
            .await
            .map_err(|e| StoreError::Query(format!("list_conversations: {e}")))?;

        let mut conversations = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_conversation(&row) {
                Ok(conversation) => conversations.push(conversation),
                Err(e) => {
                    tracing::warn!("Skipping conversation row: {e}");
                }
            }
        }
        Ok(conversations)
    }

    /// Delete a conversation and all its messages in one transaction.
    ///
    /// Deleting an unknown id is not an error.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<(), StoreError> {
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| StoreError::Query(format!("delete_conversation begin: {e}")))?;

        tx.execute(
            "DELETE FROM memory_messages WHERE conversation_id = ?1",
            params![conversation_id],
        )
        .await
        .map_err(|e| StoreError::Query(format!("delete_conversation messages: {e}")))?;

        tx.execute(
            "DELETE FROM memory_conversations WHERE id = ?1",
            params![conversation_id],
        )
        .await
        .map_err(|e| StoreError::Query(format!("delete_conversation: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Query(format!("delete_conversation commit: {e}")))?;

        debug!(conversation_id, "Conversation deleted");
        Ok(())
    }

    /// Release the underlying storage handle. Consumes the store, so a
    /// closed store cannot be used again.
    pub fn close(self) {
        debug!("Conversation store closed");
    }
}

// ── Row mapping ─────────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Map a libsql row to a Conversation. Column order matches
/// CONVERSATION_COLUMNS.
fn row_to_conversation(row: &libsql::Row) -> Result<Conversation, libsql::Error> {
    let metadata_str: String = row.get(3)?;
    let created_str: String = row.get(4)?;
    let updated_str: String = row.get(5)?;

    Ok(Conversation {
        id: row.get(0)?,
        resource_id: row.get(1)?,
        user_id: row.get(2)?,
        metadata: serde_json::from_str(&metadata_str).unwrap_or(serde_json::json!({})),
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

/// Map a libsql row to a StoredMessage. Column order matches
/// MESSAGE_COLUMNS.
fn row_to_message(row: &libsql::Row) -> Result<StoredMessage, libsql::Error> {
    let role_str: String = row.get(3)?;
    let metadata_str: Option<String> = row.get(5).ok();
    let created_str: String = row.get(6)?;

    Ok(StoredMessage {
        conversation_id: row.get(0)?,
        message_id: row.get(1)?,
        user_id: row.get(2)?,
        role: Role::parse(&role_str),
        content: row.get(4)?,
        metadata: metadata_str.and_then(|s| serde_json::from_str(&s).ok()),
        created_at: parse_datetime(&created_str),
    })
}
