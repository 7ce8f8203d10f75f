use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::HashSet;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::verify_jwt;
use crate::middleware::guards::ChannelParticipant;
use crate::services::message_service::MessageService;
use crate::state::AppState;
use crate::websocket::events::{self, ChatEvent};
use crate::websocket::message_types::{WsAck, WsInboundEvent};
use crate::websocket::presence;
use crate::websocket::ConnectionId;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

fn token_from(params: &WsParams, headers: &HeaderMap) -> Option<String> {
    params.token.clone().or_else(|| {
        headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    })
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let token = match token_from(&params, &headers) {
        Some(token) => token,
        None => {
            warn!("websocket rejected: no credential provided");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    let claims = match verify_jwt(&token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(_) => {
            warn!("websocket rejected: invalid credential");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    let user_id = match Uuid::parse_str(&claims.sub) {
        Ok(user_id) => user_id,
        Err(_) => return StatusCode::UNAUTHORIZED.into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(state, user_id, socket))
        .into_response()
}

async fn handle_socket(state: AppState, user_id: Uuid, socket: WebSocket) {
    let (connection_id, tx, mut rx, came_online) = state.registry.register(user_id).await;
    info!(%user_id, ?connection_id, "client connected");

    let mut subscribed: HashSet<Uuid> =
        presence::on_connect(&state, user_id, connection_id, &tx, came_online)
            .await
            .into_iter()
            .collect();

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            // outgoing broadcasts queued for this connection
            maybe = rx.recv() => {
                match maybe {
                    Some(payload) => {
                        if sender.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // incoming client events, processed in arrival order
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<WsInboundEvent>(&text) {
                            Ok(event) => {
                                handle_ws_event(
                                    &state,
                                    user_id,
                                    connection_id,
                                    &tx,
                                    &mut subscribed,
                                    event,
                                )
                                .await;
                            }
                            Err(_) => warn!(%user_id, "unparseable ws event ignored"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    state.sessions.unsubscribe_all(&subscribed, connection_id).await;
    let went_offline = state.registry.unregister(user_id, connection_id).await;
    if went_offline {
        presence::on_disconnect(&state, user_id).await;
    }
    info!(%user_id, ?connection_id, "client disconnected");
}

fn send_ack(tx: &UnboundedSender<String>, ack: WsAck) {
    match serde_json::to_string(&ack) {
        Ok(payload) => {
            let _ = tx.send(payload);
        }
        Err(e) => error!(error = %e, "failed to serialize ws ack"),
    }
}

async fn handle_ws_event(
    state: &AppState,
    user_id: Uuid,
    connection_id: ConnectionId,
    tx: &UnboundedSender<String>,
    subscribed: &mut HashSet<Uuid>,
    event: WsInboundEvent,
) {
    match event {
        WsInboundEvent::JoinChannel { channel_id } => {
            match ChannelParticipant::verify(&state.db, user_id, channel_id).await {
                Ok(_) => {
                    state
                        .sessions
                        .subscribe(channel_id, connection_id, user_id, tx.clone())
                        .await;
                    subscribed.insert(channel_id);
                    send_ack(tx, WsAck::ok("join_channel", channel_id));
                }
                Err(AppError::Unauthorized) => {
                    send_ack(tx, WsAck::error("join_channel", channel_id, "NOT_A_PARTICIPANT"));
                }
                Err(e) => {
                    error!(error = %e, %channel_id, %user_id, "join_channel check failed");
                    send_ack(
                        tx,
                        WsAck::error("join_channel", channel_id, "INTERNAL_SERVER_ERROR"),
                    );
                }
            }
        }

        WsInboundEvent::LeaveChannel { channel_id } => {
            // local subscription only; the participant row is untouched
            state.sessions.unsubscribe(channel_id, connection_id).await;
            subscribed.remove(&channel_id);
            send_ack(tx, WsAck::ok("leave_channel", channel_id));
        }

        WsInboundEvent::TypingStart {
            channel_id,
            user_name,
        } => {
            let event = ChatEvent::UserTyping {
                channel_id,
                user_id,
                user_name,
                is_typing: true,
            };
            events::broadcast_to_channel_except(state, channel_id, user_id, &event).await;
        }

        WsInboundEvent::TypingStop { channel_id } => {
            let event = ChatEvent::UserTyping {
                channel_id,
                user_id,
                user_name: None,
                is_typing: false,
            };
            events::broadcast_to_channel_except(state, channel_id, user_id, &event).await;
        }

        WsInboundEvent::MessageRead {
            channel_id,
            message_id,
        } => {
            // read receipts are best-effort; a failure never fails the
            // connection
            if let Err(e) =
                MessageService::mark_message_read(state, channel_id, user_id, message_id).await
            {
                warn!(error = %e, %message_id, %user_id, "message_read handling failed");
            }
        }
    }
}
