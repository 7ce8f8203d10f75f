use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::{AuthUser, ChannelAdmin, ChannelParticipant};
use crate::models::channel::{Channel, ChannelMemberInfo, ChannelSummary, ChannelType};
use crate::response::ApiResponse;
use crate::services::channel_service::{ChannelService, CreateChannelInput};
use crate::state::AppState;
use crate::websocket::events::{self, ChatEvent};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChannelRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    pub group_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    #[serde(default)]
    pub participant_ids: Vec<Uuid>,
}

pub async fn create_channel(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateChannelRequest>,
) -> Result<ApiResponse<Channel>, AppError> {
    let participant_ids = body.participant_ids.clone();

    let channel = ChannelService::create_channel(
        &state.db,
        CreateChannelInput {
            name: body.name,
            description: body.description,
            channel_type: body.channel_type,
            group_id: body.group_id,
            owner_id: body.owner_id,
            participant_ids: body.participant_ids,
        },
        user.id,
    )
    .await?;

    // tell added participants about their new channel
    for user_id in participant_ids.into_iter().filter(|id| *id != user.id) {
        events::send_to_user(
            &state,
            user_id,
            &ChatEvent::NewChannel {
                channel: channel.clone(),
            },
        )
        .await;
    }

    Ok(ApiResponse::created(channel))
}

pub async fn get_my_channels(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ApiResponse<Vec<ChannelSummary>>, AppError> {
    let channels = ChannelService::get_my_channels(&state.db, user.id).await?;
    Ok(ApiResponse::of(channels))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDetail {
    #[serde(flatten)]
    pub channel: Channel,
    pub participants: Vec<ChannelMemberInfo>,
}

pub async fn get_channel_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(channel_id): Path<Uuid>,
) -> Result<ApiResponse<ChannelDetail>, AppError> {
    ChannelParticipant::verify(&state.db, user.id, channel_id).await?;

    let channel = ChannelService::get_channel(&state.db, channel_id).await?;
    let participants = ChannelService::get_channel_members(&state.db, channel_id).await?;

    Ok(ApiResponse::of(ChannelDetail {
        channel,
        participants,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAsReadRequest {
    pub channel_id: Uuid,
}

pub async fn mark_as_read(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<MarkAsReadRequest>,
) -> Result<ApiResponse<()>, AppError> {
    ChannelService::mark_as_read(&state.db, body.channel_id, user.id).await?;
    Ok(ApiResponse::ok())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddParticipantsRequest {
    pub channel_id: Uuid,
    pub user_ids: Vec<Uuid>,
}

#[derive(Serialize)]
pub struct AddParticipantsResponse {
    pub added: u64,
}

pub async fn add_participants(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<AddParticipantsRequest>,
) -> Result<ApiResponse<AddParticipantsResponse>, AppError> {
    ChannelAdmin::verify(&state.db, user.id, body.channel_id).await?;

    let added = ChannelService::add_participants(&state.db, body.channel_id, &body.user_ids).await?;

    if added > 0 {
        let channel = ChannelService::get_channel(&state.db, body.channel_id).await?;
        for user_id in &body.user_ids {
            events::send_to_user(
                &state,
                *user_id,
                &ChatEvent::NewChannel {
                    channel: channel.clone(),
                },
            )
            .await;
        }
    }

    Ok(ApiResponse::of(AddParticipantsResponse { added }))
}

pub async fn leave_channel(
    State(state): State<AppState>,
    user: AuthUser,
    Path(channel_id): Path<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    ChannelService::leave_channel(&state.db, channel_id, user.id).await?;
    Ok(ApiResponse::ok())
}
