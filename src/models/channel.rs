use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Direct,
    Group,
    Announcement,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Direct => "direct",
            ChannelType::Group => "group",
            ChannelType::Announcement => "announcement",
        }
    }
}

/// A channel row in the membership store. Soft-deactivated, never removed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
    pub channel_type: String,
    pub group_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub is_announcement: bool,
    pub message_store_key: Uuid,
    pub last_message_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

/// A channel as seen by one member: channel metadata plus that member's
/// read state, ordered by recent activity in listings.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
    pub channel_type: String,
    pub is_announcement: bool,
    pub message_store_key: Uuid,
    pub last_message_at: Option<DateTime<Utc>>,
    pub version: i32,
    pub unread_count: i32,
    pub last_read_at: Option<DateTime<Utc>>,
    pub is_muted: bool,
}

/// Participant entry for channel detail responses; display fields come from
/// the identity/profile rows at read time.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMemberInfo {
    pub user_id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub role: String,
    pub is_online: bool,
    pub is_active: bool,
}
