use chrono::Utc;
use sqlx::{Pool, Postgres};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::AppResult;
use crate::state::AppState;
use crate::websocket::events::{self, ChatEvent};
use crate::websocket::ConnectionId;

/// Channels the user actively participates in.
async fn participant_channels(db: &Pool<Postgres>, user_id: Uuid) -> AppResult<Vec<Uuid>> {
    let channels = sqlx::query_scalar::<_, Uuid>(
        "SELECT channel_id FROM chat_participants WHERE user_id = $1 AND is_active",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(channels)
}

/// Online path: auto-subscribe the new connection to every channel the user
/// participates in, and on the 0→1 transition persist the online flag and
/// announce the status change to those channels.
///
/// A membership-store failure here degrades the connection to receiving no
/// channel broadcasts until it joins explicitly; it never rejects the
/// connection.
pub async fn on_connect(
    state: &AppState,
    user_id: Uuid,
    connection_id: ConnectionId,
    sender: &UnboundedSender<String>,
    came_online: bool,
) -> Vec<Uuid> {
    let channels = match participant_channels(&state.db, user_id).await {
        Ok(channels) => channels,
        Err(e) => {
            error!(error = %e, %user_id, "auto-subscribe failed; connection receives no channel broadcasts");
            return Vec::new();
        }
    };

    for channel_id in &channels {
        state
            .sessions
            .subscribe(*channel_id, connection_id, user_id, sender.clone())
            .await;
    }
    info!(%user_id, channels = channels.len(), "connection auto-subscribed");

    if came_online {
        if let Err(e) = sqlx::query("UPDATE users SET is_online = TRUE WHERE id = $1")
            .bind(user_id)
            .execute(&state.db)
            .await
        {
            error!(error = %e, %user_id, "failed to persist online status");
        }

        let event = ChatEvent::UserStatusChanged {
            user_id,
            is_online: true,
            timestamp: Utc::now(),
        };
        for channel_id in &channels {
            events::broadcast_to_channel(state, *channel_id, &event).await;
        }
    }

    channels
}

/// Offline path, called after the registry reported the user's last
/// connection gone. Presence failures are swallowed: they never propagate
/// into the disconnect flow.
pub async fn on_disconnect(state: &AppState, user_id: Uuid) {
    if let Err(e) = sqlx::query("UPDATE users SET is_online = FALSE WHERE id = $1")
        .bind(user_id)
        .execute(&state.db)
        .await
    {
        error!(error = %e, %user_id, "failed to persist offline status");
    }

    let channels = match participant_channels(&state.db, user_id).await {
        Ok(channels) => channels,
        Err(e) => {
            error!(error = %e, %user_id, "offline broadcast skipped; channel lookup failed");
            return;
        }
    };

    let event = ChatEvent::UserStatusChanged {
        user_id,
        is_online: false,
        timestamp: Utc::now(),
    };
    for channel_id in &channels {
        events::broadcast_to_channel(state, *channel_id, &event).await;
    }
}
