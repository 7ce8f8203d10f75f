//! Server→client event system.
//!
//! Every real-time event is a variant of one tagged enum and is serialized
//! in exactly one place; handlers never hand-build JSON. Fan-out goes
//! through the helpers below: local subscribers first, then Redis pub/sub
//! so other instances can deliver to their own connections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::channel::Channel;
use crate::models::message::ChatMessage;
use crate::state::AppState;
use crate::websocket::pubsub;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    NewMessage {
        channel_id: Uuid,
        message: ChatMessage,
    },
    MessageUpdated {
        channel_id: Uuid,
        message: ChatMessage,
    },
    MessageDeleted {
        channel_id: Uuid,
        message_id: Uuid,
    },
    NewChannel {
        channel: Channel,
    },
    UserTyping {
        channel_id: Uuid,
        user_id: Uuid,
        #[serde(skip_serializing_if = "Option::is_none")]
        user_name: Option<String>,
        is_typing: bool,
    },
    MessageReadReceipt {
        channel_id: Uuid,
        message_id: Uuid,
        user_id: Uuid,
        read_at: DateTime<Utc>,
    },
    UserStatusChanged {
        user_id: Uuid,
        is_online: bool,
        timestamp: DateTime<Utc>,
    },
}

impl ChatEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::NewMessage { .. } => "new_message",
            Self::MessageUpdated { .. } => "message_updated",
            Self::MessageDeleted { .. } => "message_deleted",
            Self::NewChannel { .. } => "new_channel",
            Self::UserTyping { .. } => "user_typing",
            Self::MessageReadReceipt { .. } => "message_read_receipt",
            Self::UserStatusChanged { .. } => "user_status_changed",
        }
    }

    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Fan an event out to a channel's current subscribers. Local delivery is
/// at-most-once per connection; the Redis frame carries this instance's id
/// so remote listeners drop frames they already delivered.
pub async fn broadcast_to_channel(state: &AppState, channel_id: Uuid, event: &ChatEvent) {
    let payload = match event.to_payload() {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, event = event.event_type(), "failed to serialize chat event");
            return;
        }
    };

    state.sessions.broadcast(channel_id, &payload).await;

    if let Err(e) =
        pubsub::publish_channel(&state.redis, state.instance_id, channel_id, &payload).await
    {
        tracing::warn!(error = %e, %channel_id, "redis publish failed; remote fanout skipped");
    }
}

/// Like [`broadcast_to_channel`] but skips every local connection owned by
/// one user (typing indicators never echo back to their sender).
pub async fn broadcast_to_channel_except(
    state: &AppState,
    channel_id: Uuid,
    excluded_user: Uuid,
    event: &ChatEvent,
) {
    let payload = match event.to_payload() {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, event = event.event_type(), "failed to serialize chat event");
            return;
        }
    };

    state
        .sessions
        .broadcast_except_user(channel_id, excluded_user, &payload)
        .await;

    if let Err(e) =
        pubsub::publish_channel(&state.redis, state.instance_id, channel_id, &payload).await
    {
        tracing::warn!(error = %e, %channel_id, "redis publish failed; remote fanout skipped");
    }
}

/// Deliver an event to every live connection of one user (e.g. `new_channel`
/// for a freshly added participant).
pub async fn send_to_user(state: &AppState, user_id: Uuid, event: &ChatEvent) {
    let payload = match event.to_payload() {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, event = event.event_type(), "failed to serialize chat event");
            return;
        }
    };

    state.registry.send_to_user(user_id, &payload).await;

    if let Err(e) = pubsub::publish_user(&state.redis, state.instance_id, user_id, &payload).await {
        tracing::warn!(error = %e, %user_id, "redis publish failed; remote fanout skipped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_status_event_shape() {
        let user_id = Uuid::new_v4();
        let event = ChatEvent::UserStatusChanged {
            user_id,
            is_online: true,
            timestamp: Utc::now(),
        };

        let parsed: serde_json::Value =
            serde_json::from_str(&event.to_payload().unwrap()).unwrap();
        assert_eq!(parsed["type"], "user_status_changed");
        assert_eq!(parsed["user_id"], user_id.to_string());
        assert_eq!(parsed["is_online"], true);
        assert!(parsed["timestamp"].is_string());
    }

    #[test]
    fn typing_event_omits_missing_user_name() {
        let event = ChatEvent::UserTyping {
            channel_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_name: None,
            is_typing: false,
        };

        let parsed: serde_json::Value =
            serde_json::from_str(&event.to_payload().unwrap()).unwrap();
        assert_eq!(parsed["type"], "user_typing");
        assert!(parsed.get("user_name").is_none());
    }

    #[test]
    fn event_type_matches_wire_tag() {
        let event = ChatEvent::MessageDeleted {
            channel_id: Uuid::new_v4(),
            message_id: Uuid::new_v4(),
        };
        let parsed: serde_json::Value =
            serde_json::from_str(&event.to_payload().unwrap()).unwrap();
        assert_eq!(parsed["type"], event.event_type());
    }
}
