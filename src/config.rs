use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Message store connection. Defaults to the membership database so a
    /// single-node deployment needs one URL; production points it elsewhere.
    pub message_store_url: String,
    pub redis_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub fcm_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| crate::error::AppError::Config("DATABASE_URL missing".into()))?;
        let message_store_url =
            env::var("MESSAGE_STORE_URL").unwrap_or_else(|_| database_url.clone());
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| crate::error::AppError::Config("JWT_SECRET missing".into()))?;
        let fcm_api_key = env::var("FCM_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        Ok(Self {
            database_url,
            message_store_url,
            redis_url,
            port,
            jwt_secret,
            fcm_api_key,
        })
    }

    #[cfg(test)]
    pub fn test_defaults() -> Self {
        Self {
            database_url: "postgres://localhost/test".into(),
            message_store_url: "postgres://localhost/test".into(),
            redis_url: "redis://127.0.0.1:6379/0".into(),
            port: 3000,
            jwt_secret: "test-secret".into(),
            fcm_api_key: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_disable_push_and_share_one_database() {
        let cfg = Config::test_defaults();
        assert!(cfg.fcm_api_key.is_none());
        assert_eq!(cfg.database_url, cfg.message_store_url);
        assert_eq!(cfg.port, 3000);
    }
}
