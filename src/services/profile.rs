use sqlx::{Pool, Postgres};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Display fields resolved from the identity/profile source of truth.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Profile {
    pub user_id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

pub struct ProfileResolver;

impl ProfileResolver {
    /// Stored sender fields are never trusted; every path that shows display
    /// fields resolves them fresh from here.
    pub async fn resolve(db: &Pool<Postgres>, user_id: Uuid) -> AppResult<Profile> {
        sqlx::query_as::<_, Profile>(
            "SELECT id AS user_id, display_name, avatar_url FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)
    }

    pub async fn resolve_many(
        db: &Pool<Postgres>,
        user_ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, Profile>> {
        let rows = sqlx::query_as::<_, Profile>(
            "SELECT id AS user_id, display_name, avatar_url FROM users WHERE id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(db)
        .await?;

        Ok(rows.into_iter().map(|p| (p.user_id, p)).collect())
    }
}
