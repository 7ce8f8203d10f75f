use crate::{
    config::Config,
    services::{message_store::MessageStore, push::FcmPush},
    websocket::{sessions::ChannelSessions, ConnectionRegistry},
};
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    /// Membership store (channels, participants, users).
    pub db: Pool<Postgres>,
    /// Append-only message document store.
    pub messages: MessageStore,
    pub registry: ConnectionRegistry,
    pub sessions: ChannelSessions,
    pub redis: redis::Client,
    pub config: Arc<Config>,
    pub push: Option<Arc<FcmPush>>,
    /// Identifies this process in cross-instance pub/sub frames.
    pub instance_id: Uuid,
}
