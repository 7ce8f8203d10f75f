use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::channel::{Channel, ChannelMemberInfo, ChannelSummary, ChannelType};
use crate::models::participant::{Participant, ParticipantRole};

pub struct CreateChannelInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub channel_type: ChannelType,
    pub group_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub participant_ids: Vec<Uuid>,
}

pub struct ChannelService;

impl ChannelService {
    /// Create a channel. The creator's admin row is written in the same
    /// transaction as the channel row; requested members follow as
    /// idempotent inserts.
    pub async fn create_channel(
        db: &Pool<Postgres>,
        input: CreateChannelInput,
        requester_id: Uuid,
    ) -> AppResult<Channel> {
        if matches!(input.channel_type, ChannelType::Group) && input.group_id.is_none() {
            return Err(AppError::Validation(
                "group channels require a group id".into(),
            ));
        }
        if matches!(input.channel_type, ChannelType::Announcement) {
            match input.owner_id {
                None => {
                    return Err(AppError::Validation(
                        "announcement channels require an owner id".into(),
                    ))
                }
                Some(owner_id) if owner_id != requester_id => {
                    return Err(AppError::Unauthorized);
                }
                Some(_) => {}
            }
        }

        let is_announcement = matches!(input.channel_type, ChannelType::Announcement);
        let channel_id = Uuid::new_v4();
        let message_store_key = Uuid::new_v4();

        let mut tx = db.begin().await?;

        let channel = sqlx::query_as::<_, Channel>(
            r#"
            INSERT INTO chat_channels
                (id, name, description, channel_type, group_id, owner_id,
                 is_announcement, message_store_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(channel_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.channel_type.as_str())
        .bind(input.group_id)
        .bind(input.owner_id)
        .bind(is_announcement)
        .bind(message_store_key)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO chat_participants (id, channel_id, user_id, role) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(channel_id)
        .bind(requester_id)
        .bind(ParticipantRole::Admin.as_str())
        .execute(&mut *tx)
        .await?;

        for user_id in input.participant_ids.iter().filter(|id| **id != requester_id) {
            sqlx::query(
                "INSERT INTO chat_participants (id, channel_id, user_id, role) VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (channel_id, user_id) DO NOTHING",
            )
            .bind(Uuid::new_v4())
            .bind(channel_id)
            .bind(user_id)
            .bind(ParticipantRole::Member.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(channel)
    }

    /// Channels the user actively participates in, most recent activity
    /// first, with that user's read state attached.
    pub async fn get_my_channels(
        db: &Pool<Postgres>,
        user_id: Uuid,
    ) -> AppResult<Vec<ChannelSummary>> {
        let rows = sqlx::query_as::<_, ChannelSummary>(
            r#"
            SELECT c.id, c.name, c.description, c.channel_type, c.is_announcement,
                   c.message_store_key, c.last_message_at, c.version,
                   p.unread_count, p.last_read_at, p.is_muted
            FROM chat_participants p
            JOIN chat_channels c ON c.id = p.channel_id
            WHERE p.user_id = $1 AND p.is_active AND c.is_active
            ORDER BY c.last_message_at DESC NULLS LAST
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;

        Ok(rows)
    }

    pub async fn get_channel(db: &Pool<Postgres>, channel_id: Uuid) -> AppResult<Channel> {
        sqlx::query_as::<_, Channel>("SELECT * FROM chat_channels WHERE id = $1 AND is_active")
            .bind(channel_id)
            .fetch_optional(db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Resolve a channel from its message-store partition key.
    pub async fn find_by_store_key(db: &Pool<Postgres>, key: Uuid) -> AppResult<Channel> {
        sqlx::query_as::<_, Channel>(
            "SELECT * FROM chat_channels WHERE message_store_key = $1 AND is_active",
        )
        .bind(key)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)
    }

    /// Member list with display fields joined in at read time from the
    /// profile source of truth.
    pub async fn get_channel_members(
        db: &Pool<Postgres>,
        channel_id: Uuid,
    ) -> AppResult<Vec<ChannelMemberInfo>> {
        let rows = sqlx::query_as::<_, ChannelMemberInfo>(
            r#"
            SELECT p.user_id, u.display_name, u.avatar_url, p.role, u.is_online, p.is_active
            FROM chat_participants p
            JOIN users u ON u.id = p.user_id
            WHERE p.channel_id = $1
            ORDER BY p.created_at ASC
            "#,
        )
        .bind(channel_id)
        .fetch_all(db)
        .await?;

        Ok(rows)
    }

    /// Idempotent bulk insert of member rows; returns the count actually
    /// inserted. The caller has already verified the requester's admin role.
    pub async fn add_participants(
        db: &Pool<Postgres>,
        channel_id: Uuid,
        user_ids: &[Uuid],
    ) -> AppResult<u64> {
        let mut added = 0;
        for user_id in user_ids {
            let result = sqlx::query(
                "INSERT INTO chat_participants (id, channel_id, user_id, role) VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (channel_id, user_id) DO NOTHING",
            )
            .bind(Uuid::new_v4())
            .bind(channel_id)
            .bind(user_id)
            .bind(ParticipantRole::Member.as_str())
            .execute(db)
            .await?;
            added += result.rows_affected();
        }

        if added > 0 {
            sqlx::query("UPDATE chat_channels SET version = version + 1 WHERE id = $1")
                .bind(channel_id)
                .execute(db)
                .await?;
        }

        Ok(added)
    }

    /// Leave: the row goes inactive, never away. Message history and the
    /// channel itself are untouched.
    pub async fn leave_channel(
        db: &Pool<Postgres>,
        channel_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<()> {
        let participant = sqlx::query_as::<_, Participant>(
            "SELECT * FROM chat_participants WHERE channel_id = $1 AND user_id = $2",
        )
        .bind(channel_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::Unauthorized)?;

        sqlx::query("UPDATE chat_participants SET is_active = FALSE WHERE id = $1")
            .bind(participant.id)
            .execute(db)
            .await?;

        sqlx::query("UPDATE chat_channels SET version = version + 1 WHERE id = $1")
            .bind(channel_id)
            .execute(db)
            .await?;

        Ok(())
    }

    /// Reset the caller's unread state. Other participants' read state is
    /// never touched.
    pub async fn mark_as_read(
        db: &Pool<Postgres>,
        channel_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE chat_participants SET last_read_at = NOW(), unread_count = 0 \
             WHERE channel_id = $1 AND user_id = $2 AND is_active",
        )
        .bind(channel_id)
        .bind(user_id)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Unauthorized);
        }

        Ok(())
    }

    /// Accepted-message side effects on the membership store: bump the
    /// channel clock and version, and increment every other active,
    /// non-muted participant's unread counter. Both are single atomic
    /// statements, safe under concurrent senders.
    pub async fn apply_message_side_effects(
        db: &Pool<Postgres>,
        channel_id: Uuid,
        sender_id: Uuid,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE chat_channels SET last_message_at = NOW(), version = version + 1 WHERE id = $1",
        )
        .bind(channel_id)
        .execute(db)
        .await?;

        sqlx::query(
            "UPDATE chat_participants SET unread_count = unread_count + 1 \
             WHERE channel_id = $1 AND user_id <> $2 AND is_active AND NOT is_muted",
        )
        .bind(channel_id)
        .bind(sender_id)
        .execute(db)
        .await?;

        Ok(())
    }

    /// Device tokens for the push trigger: every other active, non-muted
    /// participant that has one registered.
    pub async fn push_recipients(
        db: &Pool<Postgres>,
        channel_id: Uuid,
        sender_id: Uuid,
    ) -> AppResult<Vec<(Uuid, String)>> {
        let rows = sqlx::query_as::<_, (Uuid, String)>(
            r#"
            SELECT p.user_id, u.device_token
            FROM chat_participants p
            JOIN users u ON u.id = p.user_id
            WHERE p.channel_id = $1 AND p.user_id <> $2
              AND p.is_active AND NOT p.is_muted
              AND u.device_token IS NOT NULL
            "#,
        )
        .bind(channel_id)
        .bind(sender_id)
        .fetch_all(db)
        .await?;

        Ok(rows)
    }
}
