//! Database operations for chat messages.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use fixflow_core::messaging::DirectChannel;
use fixflow_core::{ChatMessage, ChatMessageId, NewChatMessage, RequestId, Role, UserId};

use super::RepositoryError;

/// Message columns plus the sender's role, selected from `m` joined to `p`.
const MESSAGE_COLUMNS: &str = "m.id, m.request_id, m.sender_id, m.sender_name, m.recipient_id, \
     m.message, m.created_at, p.role AS sender_role";

const SENDER_JOIN: &str = "LEFT JOIN profiles p ON p.id = m.sender_id";

#[derive(Debug, sqlx::FromRow)]
struct ChatMessageRow {
    id: i64,
    request_id: Option<i64>,
    sender_id: Uuid,
    sender_name: String,
    sender_role: Option<Role>,
    recipient_id: Option<Uuid>,
    message: String,
    created_at: DateTime<Utc>,
}

impl From<ChatMessageRow> for ChatMessage {
    fn from(row: ChatMessageRow) -> Self {
        Self {
            id: ChatMessageId::new(row.id),
            request_id: row.request_id.map(RequestId::new),
            sender_id: UserId::new(row.sender_id),
            sender_name: row.sender_name,
            sender_role: row.sender_role,
            recipient_id: row.recipient_id.map(UserId::new),
            message: row.message,
            created_at: row.created_at,
        }
    }
}

/// Repository for chat message database operations.
pub struct MessageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MessageRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append a message and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn append(&self, message: &NewChatMessage) -> Result<ChatMessage, RepositoryError> {
        let row = sqlx::query_as::<_, ChatMessageRow>(&format!(
            "WITH m AS (
                 INSERT INTO chat_messages (request_id, sender_id, sender_name, recipient_id, message)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING *
             )
             SELECT {MESSAGE_COLUMNS} FROM m {SENDER_JOIN}"
        ))
        .bind(message.addressing.request_id())
        .bind(message.sender_id)
        .bind(&message.sender_name)
        .bind(message.addressing.recipient_id())
        .bind(&message.message)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Messages on a request thread, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn request_thread(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ChatMessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages m {SENDER_JOIN}
             WHERE m.request_id = $1
             ORDER BY m.created_at, m.id"
        ))
        .bind(request_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// One direction of a direct channel, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn direct(
        &self,
        sender: UserId,
        recipient: UserId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ChatMessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages m {SENDER_JOIN}
             WHERE m.request_id IS NULL AND m.sender_id = $1 AND m.recipient_id = $2
             ORDER BY m.created_at, m.id"
        ))
        .bind(sender)
        .bind(recipient)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Both directions of a direct channel in one query, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn direct_thread(
        &self,
        channel: DirectChannel,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let (a, b) = channel.participants();
        let rows = sqlx::query_as::<_, ChatMessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages m {SENDER_JOIN}
             WHERE m.request_id IS NULL
               AND ((m.sender_id = $1 AND m.recipient_id = $2)
                 OR (m.sender_id = $2 AND m.recipient_id = $1))
             ORDER BY m.created_at, m.id"
        ))
        .bind(a)
        .bind(b)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
