use redis::AsyncCommands;
use redis::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::websocket::{sessions::ChannelSessions, ConnectionRegistry};

fn channel_topic(id: Uuid) -> String {
    format!("chat:channel:{}", id)
}

fn user_topic(id: Uuid) -> String {
    format!("chat:user:{}", id)
}

/// Published frame. The origin id lets an instance drop its own frames, so
/// local subscribers never see a broadcast twice.
#[derive(Serialize, Deserialize)]
struct Frame {
    origin: Uuid,
    payload: String,
}

async fn publish(
    client: &Client,
    origin: Uuid,
    topic: String,
    payload: &str,
) -> redis::RedisResult<()> {
    let frame = serde_json::to_string(&Frame {
        origin,
        payload: payload.to_string(),
    })
    .map_err(|e| {
        redis::RedisError::from((
            redis::ErrorKind::TypeError,
            "frame serialize",
            e.to_string(),
        ))
    })?;

    let mut conn = client.get_multiplexed_async_connection().await?;
    conn.publish::<_, _, ()>(topic, frame).await
}

pub async fn publish_channel(
    client: &Client,
    origin: Uuid,
    channel_id: Uuid,
    payload: &str,
) -> redis::RedisResult<()> {
    publish(client, origin, channel_topic(channel_id), payload).await
}

pub async fn publish_user(
    client: &Client,
    origin: Uuid,
    user_id: Uuid,
    payload: &str,
) -> redis::RedisResult<()> {
    publish(client, origin, user_topic(user_id), payload).await
}

/// Listen for frames from other instances and re-deliver them locally.
/// PubSub requires a dedicated connection, not multiplexed.
pub async fn start_psub_listener(
    client: Client,
    instance_id: Uuid,
    registry: ConnectionRegistry,
    sessions: ChannelSessions,
) -> redis::RedisResult<()> {
    let conn = client.get_async_connection().await?;
    let mut pubsub = conn.into_pubsub();
    pubsub.psubscribe("chat:channel:*").await?;
    pubsub.psubscribe("chat:user:*").await?;

    let mut stream = pubsub.on_message();
    use futures_util::StreamExt;
    while let Some(msg) = stream.next().await {
        let topic: String = msg.get_channel_name().into();
        let raw: String = msg.get_payload()?;

        let frame = match serde_json::from_str::<Frame>(&raw) {
            Ok(frame) => frame,
            Err(_) => continue,
        };
        if frame.origin == instance_id {
            continue;
        }

        if let Some(rest) = topic.strip_prefix("chat:channel:") {
            if let Ok(channel_id) = Uuid::parse_str(rest) {
                sessions.broadcast(channel_id, &frame.payload).await;
            }
        } else if let Some(rest) = topic.strip_prefix("chat:user:") {
            if let Ok(user_id) = Uuid::parse_str(rest) {
                registry.send_to_user(user_id, &frame.payload).await;
            }
        }
    }
    Ok(())
}
