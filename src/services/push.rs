use async_trait::async_trait;
use fcm::{Client, MessageBuilder, NotificationBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::AppError;

/// Notification trigger boundary. Delivery is best-effort; callers log
/// failures and never surface them to the message sender.
#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn send(
        &self,
        device_token: String,
        title: String,
        body: String,
        data: HashMap<String, String>,
    ) -> Result<(), AppError>;
}

/// FCM (Firebase Cloud Messaging) push notification provider
#[derive(Clone)]
pub struct FcmPush {
    client: Arc<Client>,
    api_key: String,
}

impl FcmPush {
    pub fn new(api_key: String) -> Result<Self, AppError> {
        if api_key.trim().is_empty() {
            return Err(AppError::Config("FCM api key is empty".into()));
        }
        Ok(Self {
            client: Arc::new(Client::new()),
            api_key,
        })
    }
}

fn token_prefix(token: &str) -> &str {
    // log only a prefix for privacy
    token.get(..8).unwrap_or(token)
}

#[async_trait]
impl PushProvider for FcmPush {
    async fn send(
        &self,
        device_token: String,
        title: String,
        body: String,
        data: HashMap<String, String>,
    ) -> Result<(), AppError> {
        let mut notification_builder = NotificationBuilder::new();
        notification_builder
            .title(&title)
            .body(&body)
            .sound("default");
        let notification = notification_builder.finalize();

        let mut message_builder = MessageBuilder::new(&self.api_key, &device_token);
        message_builder.notification(notification);
        if let Err(e) = message_builder.data(&data) {
            warn!(error = %e, "failed to attach data payload to push message");
        }

        match self.client.send(message_builder.finalize()).await {
            Ok(response) => {
                info!(
                    token = token_prefix(&device_token),
                    message_id = ?response.message_id,
                    "push notification sent"
                );
                Ok(())
            }
            Err(e) => {
                error!(token = token_prefix(&device_token), error = %e, "push send failed");
                Err(AppError::Config(format!("FCM send failed: {e}")))
            }
        }
    }
}
