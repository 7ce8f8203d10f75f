use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::AuthUser;
use crate::models::message::{ChatMessage, MessageKind};
use crate::response::ApiResponse;
use crate::services::message_service::{MessagePage, MessageService, SendMessageInput};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub channel_id: Uuid,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub reply_to: Option<Uuid>,
}

pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<SendMessageRequest>,
) -> Result<ApiResponse<ChatMessage>, AppError> {
    let message = MessageService::send_message(
        &state,
        user.id,
        SendMessageInput {
            channel_id: body.channel_id,
            kind: body.kind,
            content: body.content,
            media_url: body.media_url,
            thumbnail_url: body.thumbnail_url,
            metadata: body.metadata,
            reply_to: body.reply_to,
        },
    )
    .await?;

    Ok(ApiResponse::created(message))
}

#[derive(Deserialize)]
pub struct GetMessagesParams {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

pub async fn get_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(channel_id): Path<Uuid>,
    Query(params): Query<GetMessagesParams>,
) -> Result<ApiResponse<MessagePage>, AppError> {
    let page = MessageService::get_messages(
        &state,
        channel_id,
        Some(user.id),
        params.limit,
        params.cursor,
    )
    .await?;

    Ok(ApiResponse::of(page))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessageRequest {
    pub content: String,
}

pub async fn update_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(message_id): Path<Uuid>,
    Json(body): Json<UpdateMessageRequest>,
) -> Result<ApiResponse<ChatMessage>, AppError> {
    let message = MessageService::update_message(&state, message_id, user.id, body.content).await?;
    Ok(ApiResponse::of(message))
}

pub async fn delete_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(message_id): Path<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    MessageService::delete_message(&state, message_id, user.id).await?;
    Ok(ApiResponse::ok())
}
