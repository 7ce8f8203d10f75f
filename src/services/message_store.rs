use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::message::{ChatMessage, MessageKind};

/// Opaque pagination cursor: the `(created_at, id)` order key of the last
/// retrieved document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageCursor {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

impl MessageCursor {
    pub fn of(message: &ChatMessage) -> Self {
        Self {
            created_at: message.created_at,
            id: message.id,
        }
    }

    pub fn encode(&self) -> String {
        STANDARD.encode(format!(
            "{}:{}",
            self.created_at.timestamp_micros(),
            self.id
        ))
    }

    pub fn decode(raw: &str) -> AppResult<Self> {
        let invalid = || AppError::Validation("invalid cursor".into());
        let bytes = STANDARD.decode(raw).map_err(|_| invalid())?;
        let text = String::from_utf8(bytes).map_err(|_| invalid())?;
        let (micros, id) = text.split_once(':').ok_or_else(invalid)?;
        let micros: i64 = micros.parse().map_err(|_| invalid())?;
        let created_at = DateTime::from_timestamp_micros(micros).ok_or_else(invalid)?;
        let id = Uuid::parse_str(id).map_err(|_| invalid())?;
        Ok(Self { created_at, id })
    }
}

/// Write model for a new document.
pub struct NewMessageDoc {
    pub channel_key: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub sender_avatar: Option<String>,
    pub kind: MessageKind,
    pub content: String,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub reply_to: Option<Uuid>,
}

/// The only component that touches the message store. Owns its own pool; no
/// transaction ever spans this store and the membership store.
#[derive(Clone)]
pub struct MessageStore {
    pool: Pool<Postgres>,
}

impl MessageStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Append a document. The sender starts in its own readers set.
    pub async fn append(&self, doc: NewMessageDoc) -> AppResult<ChatMessage> {
        let message = sqlx::query_as::<_, ChatMessage>(
            r#"
            INSERT INTO chat_messages
                (id, channel_key, sender_id, sender_name, sender_avatar, kind,
                 content, media_url, thumbnail_url, metadata, reply_to, read_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, ARRAY[$3])
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(doc.channel_key)
        .bind(doc.sender_id)
        .bind(&doc.sender_name)
        .bind(&doc.sender_avatar)
        .bind(doc.kind.as_str())
        .bind(&doc.content)
        .bind(&doc.media_url)
        .bind(&doc.thumbnail_url)
        .bind(&doc.metadata)
        .bind(doc.reply_to)
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    /// One page in descending `(created_at, id)` order. Soft-deleted
    /// documents are excluded from reads; they stay in the table.
    pub async fn page(
        &self,
        channel_key: Uuid,
        limit: i64,
        cursor: Option<MessageCursor>,
    ) -> AppResult<Vec<ChatMessage>> {
        let rows = match cursor {
            Some(cursor) => {
                sqlx::query_as::<_, ChatMessage>(
                    r#"
                    SELECT * FROM chat_messages
                    WHERE channel_key = $1 AND NOT is_deleted
                      AND (created_at, id) < ($2, $3)
                    ORDER BY created_at DESC, id DESC
                    LIMIT $4
                    "#,
                )
                .bind(channel_key)
                .bind(cursor.created_at)
                .bind(cursor.id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ChatMessage>(
                    r#"
                    SELECT * FROM chat_messages
                    WHERE channel_key = $1 AND NOT is_deleted
                    ORDER BY created_at DESC, id DESC
                    LIMIT $2
                    "#,
                )
                .bind(channel_key)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows)
    }

    /// Fetch regardless of deletion state (integrity checks and ownership
    /// validation look at deleted documents too).
    pub async fn fetch(&self, id: Uuid) -> AppResult<ChatMessage> {
        sqlx::query_as::<_, ChatMessage>("SELECT * FROM chat_messages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Edit-in-place of content and update timestamp.
    pub async fn update_content(&self, id: Uuid, content: &str) -> AppResult<ChatMessage> {
        sqlx::query_as::<_, ChatMessage>(
            "UPDATE chat_messages SET content = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound)
    }

    /// Flag-only delete; the document is never physically removed.
    pub async fn soft_delete(&self, id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE chat_messages SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Readers only grow; appending an existing reader is a no-op.
    pub async fn mark_read(&self, id: Uuid, reader: Uuid) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE chat_messages SET read_by = array_append(read_by, $2)
            WHERE id = $1 AND NOT (read_by @> ARRAY[$2])
            "#,
        )
        .bind(id)
        .bind(reader)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Atomic reply counter maintenance on a parent document.
    pub async fn adjust_reply_count(&self, id: Uuid, delta: i32) -> AppResult<()> {
        sqlx::query(
            "UPDATE chat_messages SET reply_count = GREATEST(reply_count + $2, 0) WHERE id = $1",
        )
        .bind(id)
        .bind(delta)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips() {
        let cursor = MessageCursor {
            created_at: DateTime::from_timestamp_micros(1_722_000_000_123_456).unwrap(),
            id: Uuid::new_v4(),
        };

        let decoded = MessageCursor::decode(&cursor.encode()).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn cursor_rejects_garbage() {
        assert!(MessageCursor::decode("not-base64!").is_err());
        assert!(MessageCursor::decode(&STANDARD.encode("no-separator")).is_err());
        assert!(MessageCursor::decode(&STANDARD.encode("abc:not-a-uuid")).is_err());
    }

    #[test]
    fn cursor_is_opaque_but_stable() {
        let cursor = MessageCursor {
            created_at: DateTime::from_timestamp_micros(42).unwrap(),
            id: Uuid::nil(),
        };
        assert_eq!(cursor.encode(), cursor.encode());
        assert_ne!(cursor.encode(), format!("42:{}", Uuid::nil()));
    }
}
