use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;
use crate::websocket::handlers::ws_handler;

pub mod channels;
pub mod messages;

use channels::{
    add_participants, create_channel, get_channel_by_id, get_my_channels, leave_channel,
    mark_as_read,
};
use messages::{delete_message, get_messages, send_message, update_message};

/// Assemble the HTTP surface. Introspection stays public for healthchecks;
/// the chat API and the WebSocket endpoint sit behind the auth middleware.
pub fn build_router(state: AppState) -> Router {
    let introspection: Router<AppState> = Router::new().route("/health", get(|| async { "OK" }));

    let api_v1 = Router::new()
        // Channels
        .route("/chat/channels", post(create_channel).get(get_my_channels))
        .route("/chat/channels/read", post(mark_as_read))
        .route("/chat/channels/participants", post(add_participants))
        .route("/chat/channels/:channel_id", get(get_channel_by_id))
        .route("/chat/channels/:channel_id/messages", get(get_messages))
        .route("/chat/channels/:channel_id/leave", post(leave_channel))
        // Messages
        .route("/chat/messages", post(send_message))
        .route(
            "/chat/messages/:message_id",
            put(update_message).delete(delete_message),
        )
        // Persistent connection endpoint
        .route("/chat/ws", get(ws_handler));

    let secured_api_v1 = api_v1.layer(middleware::from_fn_with_state(
        state.clone(),
        crate::middleware::auth::auth_middleware,
    ));

    let router = introspection
        .merge(Router::new().nest("/api/v1", secured_api_v1))
        .with_state(state);

    crate::middleware::with_defaults(router)
}
