use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Admin,
    Member,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantRole::Admin => "admin",
            ParticipantRole::Member => "member",
        }
    }
}

/// Membership record tying a user to a channel. Exactly one row per
/// (channel, user); rows go inactive on leave, they are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub last_read_at: Option<DateTime<Utc>>,
    pub unread_count: i32,
    pub is_muted: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
