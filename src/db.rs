use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

/// Membership store schema (users, channels, participants).
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Message store schema (append-only documents). Kept separate so the two
/// stores can live in different databases.
pub static STORE_MIGRATOR: Migrator = sqlx::migrate!("./store_migrations");

pub async fn init_pool(database_url: &str) -> Result<Pool<Postgres>, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}
