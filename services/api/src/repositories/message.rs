//! Message repository for database operations

use anyhow::Result;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::models::message::{Message, NewMessage};

const MESSAGE_COLUMNS: &str = "id, sender_id, recipient_id, content, read, read_at, \
                               message_type, attachment_url, is_active, created_at, updated_at";

/// Message repository for database operations
#[derive(Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    /// Create a new message repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a new message
    pub async fn create(&self, new_message: &NewMessage) -> Result<Message> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO messages (sender_id, recipient_id, content, message_type, attachment_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MESSAGE_COLUMNS}
            "#,
        ))
        .bind(new_message.sender_id)
        .bind(new_message.recipient_id)
        .bind(&new_message.content)
        .bind(new_message.message_type.as_str())
        .bind(&new_message.attachment_url)
        .fetch_one(&self.pool)
        .await?;

        map_message(&row)
    }

    /// Find an active message by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Message>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE id = $1 AND is_active = TRUE
            "#,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_message).transpose()
    }

    /// A two-party conversation in chronological order
    pub async fn conversation(
        &self,
        user_id: Uuid,
        other_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Message>, i64)> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE is_active = TRUE
              AND ((sender_id = $1 AND recipient_id = $2)
                OR (sender_id = $2 AND recipient_id = $1))
            ORDER BY created_at ASC
            LIMIT $3 OFFSET $4
            "#,
        ))
        .bind(user_id)
        .bind(other_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM messages
            WHERE is_active = TRUE
              AND ((sender_id = $1 AND recipient_id = $2)
                OR (sender_id = $2 AND recipient_id = $1))
            "#,
        )
        .bind(user_id)
        .bind(other_id)
        .fetch_one(&self.pool)
        .await?;

        let messages = rows.iter().map(map_message).collect::<Result<Vec<_>>>()?;
        Ok((messages, total))
    }

    /// Latest message and unread count per contact, most recent first
    pub async fn conversations(&self, user_id: Uuid) -> Result<Vec<(Uuid, Message, i64)>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT DISTINCT ON (other_id) *
            FROM (
                SELECT {MESSAGE_COLUMNS},
                       CASE WHEN sender_id = $1 THEN recipient_id ELSE sender_id END AS other_id
                FROM messages
                WHERE is_active = TRUE AND (sender_id = $1 OR recipient_id = $1)
            ) conversations
            ORDER BY other_id, created_at DESC
            "#,
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            let other_id: Uuid = row.get("other_id");
            let message = map_message(row)?;
            let unread: i64 = sqlx::query_scalar(
                r#"
                SELECT COUNT(*)
                FROM messages
                WHERE sender_id = $1 AND recipient_id = $2
                  AND read = FALSE AND is_active = TRUE
                "#,
            )
            .bind(other_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
            summaries.push((other_id, message, unread));
        }

        summaries.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
        Ok(summaries)
    }

    /// Count of unread messages addressed to a user
    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM messages
            WHERE recipient_id = $1 AND read = FALSE AND is_active = TRUE
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Mark one message read; only its recipient may do so
    pub async fn mark_read(&self, message_id: Uuid, reader_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET read = TRUE, read_at = now(), updated_at = now()
            WHERE id = $1 AND recipient_id = $2 AND read = FALSE AND is_active = TRUE
            "#,
        )
        .bind(message_id)
        .bind(reader_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark every unread message from `sender_id` to `reader_id` read
    pub async fn mark_conversation_read(&self, sender_id: Uuid, reader_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET read = TRUE, read_at = now(), updated_at = now()
            WHERE sender_id = $1 AND recipient_id = $2 AND read = FALSE AND is_active = TRUE
            "#,
        )
        .bind(sender_id)
        .bind(reader_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Soft-delete a message, sender-only
    pub async fn soft_delete(&self, message_id: Uuid, sender_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_active = FALSE, updated_at = now()
            WHERE id = $1 AND sender_id = $2 AND is_active = TRUE
            "#,
        )
        .bind(message_id)
        .bind(sender_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn map_message(row: &PgRow) -> Result<Message> {
    Ok(Message {
        id: row.get("id"),
        sender_id: row.get("sender_id"),
        recipient_id: row.get("recipient_id"),
        content: row.get("content"),
        read: row.get("read"),
        read_at: row.get("read_at"),
        message_type: row
            .get::<String, _>("message_type")
            .parse()
            .map_err(anyhow::Error::msg)?,
        attachment_url: row.get("attachment_url"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
