use chrono::Utc;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::guards::ChannelParticipant;
use crate::models::message::{ChatMessage, MessageKind};
use crate::services::channel_service::ChannelService;
use crate::services::message_store::{MessageCursor, NewMessageDoc};
use crate::services::profile::ProfileResolver;
use crate::services::push::PushProvider;
use crate::state::AppState;
use crate::websocket::events::{self, ChatEvent};

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 200;

pub struct SendMessageInput {
    pub channel_id: Uuid,
    pub kind: MessageKind,
    pub content: String,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub reply_to: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<ChatMessage>,
    pub next_cursor: Option<String>,
}

pub struct MessageService;

impl MessageService {
    /// The write path. Everything before the document write is validated
    /// synchronously and rejects without touching either store. Once the
    /// document is durable, the remaining steps are best-effort: logged on
    /// failure, never rolled back into the sender's response.
    pub async fn send_message(
        state: &AppState,
        sender_id: Uuid,
        input: SendMessageInput,
    ) -> AppResult<ChatMessage> {
        if input.content.trim().is_empty() {
            return Err(AppError::Validation("message content cannot be empty".into()));
        }

        let member = ChannelParticipant::verify(&state.db, sender_id, input.channel_id).await?;
        member.can_send()?;

        // sender display fields resolved fresh, never from a stored copy
        let profile = ProfileResolver::resolve(&state.db, sender_id).await?;

        let message = state
            .messages
            .append(NewMessageDoc {
                channel_key: member.message_store_key,
                sender_id,
                sender_name: profile.display_name,
                sender_avatar: profile.avatar_url,
                kind: input.kind,
                content: input.content,
                media_url: input.media_url,
                thumbnail_url: input.thumbnail_url,
                metadata: input.metadata,
                reply_to: input.reply_to,
            })
            .await?;

        if let Some(parent_id) = message.reply_to {
            if let Err(e) = state.messages.adjust_reply_count(parent_id, 1).await {
                warn!(error = %e, %parent_id, "reply counter increment failed");
            }
        }

        if let Err(e) =
            ChannelService::apply_message_side_effects(&state.db, input.channel_id, sender_id)
                .await
        {
            // counters lag until a reconciliation pass repeats this step
            error!(error = %e, channel_id = %input.channel_id, "membership side effects failed");
        }

        events::broadcast_to_channel(
            state,
            input.channel_id,
            &ChatEvent::NewMessage {
                channel_id: input.channel_id,
                message: message.clone(),
            },
        )
        .await;

        Self::trigger_push_notifications(state, input.channel_id, &message).await;

        Ok(message)
    }

    /// Push trigger for offline, non-muted participants holding a device
    /// token. Live connections already received the broadcast.
    async fn trigger_push_notifications(
        state: &AppState,
        channel_id: Uuid,
        message: &ChatMessage,
    ) {
        let push = match &state.push {
            Some(push) => push.clone(),
            None => return,
        };

        let recipients =
            match ChannelService::push_recipients(&state.db, channel_id, message.sender_id).await
            {
                Ok(recipients) => recipients,
                Err(e) => {
                    warn!(error = %e, %channel_id, "push recipient lookup failed");
                    return;
                }
            };

        for (user_id, device_token) in recipients {
            if state.registry.is_online(user_id).await {
                continue;
            }

            let data = HashMap::from([
                ("type".to_string(), "chat_message".to_string()),
                ("channel_id".to_string(), channel_id.to_string()),
                ("sender_id".to_string(), message.sender_id.to_string()),
            ]);

            if let Err(e) = push
                .send(
                    device_token,
                    message.sender_name.clone(),
                    message.content.clone(),
                    data,
                )
                .await
            {
                warn!(error = %e, %user_id, "push delivery failed");
            }
        }
    }

    /// History page in descending `(created_at, id)` order. `requester_id`
    /// is checked when present; trusted service-to-service calls omit it.
    pub async fn get_messages(
        state: &AppState,
        channel_id: Uuid,
        requester_id: Option<Uuid>,
        limit: Option<i64>,
        cursor: Option<String>,
    ) -> AppResult<MessagePage> {
        let channel_key = match requester_id {
            Some(user_id) => {
                ChannelParticipant::verify(&state.db, user_id, channel_id)
                    .await?
                    .message_store_key
            }
            None => {
                ChannelService::get_channel(&state.db, channel_id)
                    .await?
                    .message_store_key
            }
        };

        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        let cursor = cursor.as_deref().map(MessageCursor::decode).transpose()?;

        let mut messages = state.messages.page(channel_key, limit, cursor).await?;

        Self::refresh_sender_profiles(state, &mut messages).await;

        let next_cursor = if messages.len() as i64 == limit {
            messages.last().map(|m| MessageCursor::of(m).encode())
        } else {
            None
        };

        Ok(MessagePage {
            messages,
            next_cursor,
        })
    }

    /// Overwrite stored sender display fields with fresh profile data. A
    /// resolver failure returns the stored copies rather than failing the
    /// read.
    async fn refresh_sender_profiles(state: &AppState, messages: &mut [ChatMessage]) {
        if messages.is_empty() {
            return;
        }

        let sender_ids: Vec<Uuid> = messages
            .iter()
            .map(|m| m.sender_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        match ProfileResolver::resolve_many(&state.db, &sender_ids).await {
            Ok(profiles) => {
                for message in messages.iter_mut() {
                    if let Some(profile) = profiles.get(&message.sender_id) {
                        message.sender_name = profile.display_name.clone();
                        message.sender_avatar = profile.avatar_url.clone();
                    }
                }
            }
            Err(e) => warn!(error = %e, "sender profile refresh failed"),
        }
    }

    /// Edit-in-place. Only the original sender may edit, and a deleted
    /// message accepts no further mutation.
    pub async fn update_message(
        state: &AppState,
        message_id: Uuid,
        editor_id: Uuid,
        content: String,
    ) -> AppResult<ChatMessage> {
        if content.trim().is_empty() {
            return Err(AppError::Validation("message content cannot be empty".into()));
        }

        let existing = state.messages.fetch(message_id).await?;
        if existing.sender_id != editor_id {
            return Err(AppError::Forbidden);
        }
        if existing.is_deleted {
            return Err(AppError::Conflict("message already deleted".into()));
        }

        let message = state.messages.update_content(message_id, &content).await?;

        match ChannelService::find_by_store_key(&state.db, message.channel_key).await {
            Ok(channel) => {
                events::broadcast_to_channel(
                    state,
                    channel.id,
                    &ChatEvent::MessageUpdated {
                        channel_id: channel.id,
                        message: message.clone(),
                    },
                )
                .await;
            }
            Err(e) => warn!(error = %e, %message_id, "channel lookup for edit broadcast failed"),
        }

        Ok(message)
    }

    /// Soft delete: terminal state. Decrements the parent's reply counter
    /// when the deleted message was a reply.
    pub async fn delete_message(
        state: &AppState,
        message_id: Uuid,
        requester_id: Uuid,
    ) -> AppResult<()> {
        let existing = state.messages.fetch(message_id).await?;
        if existing.sender_id != requester_id {
            return Err(AppError::Forbidden);
        }
        if existing.is_deleted {
            return Err(AppError::Conflict("message already deleted".into()));
        }

        state.messages.soft_delete(message_id).await?;

        if let Some(parent_id) = existing.reply_to {
            if let Err(e) = state.messages.adjust_reply_count(parent_id, -1).await {
                warn!(error = %e, %parent_id, "reply counter decrement failed");
            }
        }

        match ChannelService::find_by_store_key(&state.db, existing.channel_key).await {
            Ok(channel) => {
                events::broadcast_to_channel(
                    state,
                    channel.id,
                    &ChatEvent::MessageDeleted {
                        channel_id: channel.id,
                        message_id,
                    },
                )
                .await;
            }
            Err(e) => warn!(error = %e, %message_id, "channel lookup for delete broadcast failed"),
        }

        Ok(())
    }

    /// Read receipt path: grow the document's readers set, then broadcast.
    pub async fn mark_message_read(
        state: &AppState,
        channel_id: Uuid,
        reader_id: Uuid,
        message_id: Uuid,
    ) -> AppResult<()> {
        state.messages.mark_read(message_id, reader_id).await?;

        events::broadcast_to_channel(
            state,
            channel_id,
            &ChatEvent::MessageReadReceipt {
                channel_id,
                message_id,
                user_id: reader_id,
                read_at: Utc::now(),
            },
        )
        .await;

        Ok(())
    }
}
