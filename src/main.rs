use chat_service::{
    config, db, error, logging, routes,
    services::{message_store::MessageStore, push::FcmPush},
    state::AppState,
    websocket::{pubsub, sessions::ChannelSessions, ConnectionRegistry},
};
use std::sync::Arc;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    // Membership store pool + embedded migrations (idempotent)
    let db = db::init_pool(&cfg.database_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;
    db::MIGRATOR
        .run(&db)
        .await
        .map_err(|e| error::AppError::StartServer(format!("membership migrations: {e}")))?;

    // Message store gets its own pool; the two stores never share a
    // transaction even when both URLs point at the same database.
    let store_pool = db::init_pool(&cfg.message_store_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("message store: {e}")))?;
    db::STORE_MIGRATOR
        .run(&store_pool)
        .await
        .map_err(|e| error::AppError::StartServer(format!("message store migrations: {e}")))?;

    let redis = redis::Client::open(cfg.redis_url.clone())
        .map_err(|e| error::AppError::StartServer(format!("redis: {e}")))?;

    let push = match cfg.fcm_api_key.clone() {
        Some(api_key) => match FcmPush::new(api_key) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "failed to initialize FCM client; push delivery disabled");
                None
            }
        },
        None => None,
    };

    let registry = ConnectionRegistry::new();
    let sessions = ChannelSessions::new();
    let instance_id = Uuid::new_v4();

    let state = AppState {
        db,
        messages: MessageStore::new(store_pool),
        registry: registry.clone(),
        sessions: sessions.clone(),
        redis: redis.clone(),
        config: cfg.clone(),
        push,
        instance_id,
    };

    // Cross-instance fanout listener
    tokio::spawn(async move {
        if let Err(e) = pubsub::start_psub_listener(redis, instance_id, registry, sessions).await {
            tracing::error!(error = %e, "redis pubsub listener failed");
        }
    });

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting chat-service");

    let app = routes::build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;

    Ok(())
}
