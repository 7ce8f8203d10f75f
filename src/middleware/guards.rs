//! Authorization guards that enforce permission checks at the type level
//! This prevents handlers from accidentally bypassing authorization

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::AuthContext;

/// Authenticated user extracted from the verified credential
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AppError::Unauthenticated)?;

        Ok(AuthUser {
            id: ctx.user_id,
            role: ctx.role,
        })
    }
}

/// A verified channel participant with permission context.
/// One database query checks membership, activity and the channel itself.
#[derive(Debug, Clone)]
pub struct ChannelParticipant {
    pub user_id: Uuid,
    pub channel_id: Uuid,
    pub role: String,
    pub is_muted: bool,
    pub is_announcement: bool,
    pub message_store_key: Uuid,
}

impl ChannelParticipant {
    pub async fn verify(
        db: &PgPool,
        user_id: Uuid,
        channel_id: Uuid,
    ) -> Result<Self, AppError> {
        let member = sqlx::query_as::<_, ChannelParticipantRecord>(
            r#"
            SELECT
                p.user_id,
                p.channel_id,
                p.role,
                p.is_muted,
                c.is_announcement,
                c.message_store_key
            FROM chat_participants p
            JOIN chat_channels c ON c.id = p.channel_id
            WHERE p.user_id = $1 AND p.channel_id = $2
              AND p.is_active AND c.is_active
            "#,
        )
        .bind(user_id)
        .bind(channel_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::Unauthorized)?;

        Ok(ChannelParticipant {
            user_id: member.user_id,
            channel_id: member.channel_id,
            role: member.role,
            is_muted: member.is_muted,
            is_announcement: member.is_announcement,
            message_store_key: member.message_store_key,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }

    /// Announcement channels accept messages from admins only.
    pub fn can_send(&self) -> Result<(), AppError> {
        if self.is_announcement && !self.is_admin() {
            return Err(AppError::Unauthorized);
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ChannelParticipantRecord {
    user_id: Uuid,
    channel_id: Uuid,
    role: String,
    is_muted: bool,
    is_announcement: bool,
    message_store_key: Uuid,
}

/// A stricter guard than ChannelParticipant: the requester must hold the
/// admin role in the channel.
#[derive(Debug, Clone)]
pub struct ChannelAdmin {
    pub inner: ChannelParticipant,
}

impl ChannelAdmin {
    pub async fn verify(
        db: &PgPool,
        user_id: Uuid,
        channel_id: Uuid,
    ) -> Result<Self, AppError> {
        let member = ChannelParticipant::verify(db, user_id, channel_id).await?;

        if !member.is_admin() {
            return Err(AppError::Unauthorized);
        }

        Ok(ChannelAdmin { inner: member })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(role: &str, is_announcement: bool) -> ChannelParticipant {
        ChannelParticipant {
            user_id: Uuid::new_v4(),
            channel_id: Uuid::new_v4(),
            role: role.to_string(),
            is_muted: false,
            is_announcement,
            message_store_key: Uuid::new_v4(),
        }
    }

    #[test]
    fn member_can_send_in_regular_channel() {
        assert!(participant("member", false).can_send().is_ok());
    }

    #[test]
    fn member_cannot_send_in_announcement_channel() {
        assert!(participant("member", true).can_send().is_err());
    }

    #[test]
    fn admin_can_send_in_announcement_channel() {
        assert!(participant("admin", true).can_send().is_ok());
    }

    #[test]
    fn admin_role_is_recognized() {
        assert!(participant("admin", false).is_admin());
        assert!(!participant("member", false).is_admin());
    }
}
