use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc::UnboundedSender, RwLock};
use uuid::Uuid;

use crate::websocket::ConnectionId;

struct Subscriber {
    connection_id: ConnectionId,
    user_id: Uuid,
    sender: UnboundedSender<String>,
}

/// Per-channel subscription state: which live connections receive a
/// channel's broadcasts. Membership checks happen before subscribe is
/// called; this component only routes.
#[derive(Default, Clone)]
pub struct ChannelSessions {
    // channel_id -> subscribers
    inner: Arc<RwLock<HashMap<Uuid, Vec<Subscriber>>>>,
}

impl ChannelSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a connection to a channel. Idempotent per connection.
    pub async fn subscribe(
        &self,
        channel_id: Uuid,
        connection_id: ConnectionId,
        user_id: Uuid,
        sender: UnboundedSender<String>,
    ) {
        let mut guard = self.inner.write().await;
        let subscribers = guard.entry(channel_id).or_default();
        if subscribers.iter().any(|s| s.connection_id == connection_id) {
            return;
        }
        subscribers.push(Subscriber {
            connection_id,
            user_id,
            sender,
        });
    }

    /// Drop one connection's subscription. Local state only; participant
    /// rows are untouched.
    pub async fn unsubscribe(&self, channel_id: Uuid, connection_id: ConnectionId) {
        let mut guard = self.inner.write().await;
        if let Some(subscribers) = guard.get_mut(&channel_id) {
            subscribers.retain(|s| s.connection_id != connection_id);
            if subscribers.is_empty() {
                guard.remove(&channel_id);
            }
        }
    }

    /// Cleanup on disconnect: remove the connection from every channel it
    /// subscribed to.
    pub async fn unsubscribe_all(&self, channels: &HashSet<Uuid>, connection_id: ConnectionId) {
        let mut guard = self.inner.write().await;
        for channel_id in channels {
            if let Some(subscribers) = guard.get_mut(channel_id) {
                subscribers.retain(|s| s.connection_id != connection_id);
                if subscribers.is_empty() {
                    guard.remove(channel_id);
                }
            }
        }
    }

    /// Best-effort, at-most-once push to current subscribers. Dead senders
    /// are pruned as a side effect.
    pub async fn broadcast(&self, channel_id: Uuid, payload: &str) {
        let mut guard = self.inner.write().await;
        if let Some(subscribers) = guard.get_mut(&channel_id) {
            subscribers.retain(|s| s.sender.send(payload.to_string()).is_ok());
        }
    }

    /// Broadcast excluding every connection owned by one user (typing
    /// indicators never echo back to their sender).
    pub async fn broadcast_except_user(
        &self,
        channel_id: Uuid,
        excluded_user: Uuid,
        payload: &str,
    ) {
        let mut guard = self.inner.write().await;
        if let Some(subscribers) = guard.get_mut(&channel_id) {
            subscribers.retain(|s| {
                s.user_id == excluded_user || s.sender.send(payload.to_string()).is_ok()
            });
        }
    }

    pub async fn subscriber_count(&self, channel_id: Uuid) -> usize {
        let guard = self.inner.read().await;
        guard.get(&channel_id).map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn subscribe_is_idempotent_per_connection() {
        let sessions = ChannelSessions::new();
        let channel = Uuid::new_v4();
        let user = Uuid::new_v4();
        let conn = ConnectionId::new();
        let (tx, _rx) = unbounded_channel();

        sessions.subscribe(channel, conn, user, tx.clone()).await;
        sessions.subscribe(channel, conn, user, tx).await;

        assert_eq!(sessions.subscriber_count(channel).await, 1);
    }

    #[tokio::test]
    async fn broadcast_reaches_all_subscribers() {
        let sessions = ChannelSessions::new();
        let channel = Uuid::new_v4();
        let (tx_a, mut rx_a) = unbounded_channel();
        let (tx_b, mut rx_b) = unbounded_channel();

        sessions
            .subscribe(channel, ConnectionId::new(), Uuid::new_v4(), tx_a)
            .await;
        sessions
            .subscribe(channel, ConnectionId::new(), Uuid::new_v4(), tx_b)
            .await;

        sessions.broadcast(channel, "hello").await;

        assert_eq!(rx_a.recv().await.unwrap(), "hello");
        assert_eq!(rx_b.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn typing_broadcast_skips_all_of_senders_connections() {
        let sessions = ChannelSessions::new();
        let channel = Uuid::new_v4();
        let typist = Uuid::new_v4();
        let (tx_a, mut rx_a) = unbounded_channel();
        let (tx_b, mut rx_b) = unbounded_channel();
        let (tx_c, mut rx_c) = unbounded_channel();

        // typist has two live connections; both must be excluded
        sessions
            .subscribe(channel, ConnectionId::new(), typist, tx_a)
            .await;
        sessions
            .subscribe(channel, ConnectionId::new(), typist, tx_b)
            .await;
        sessions
            .subscribe(channel, ConnectionId::new(), Uuid::new_v4(), tx_c)
            .await;

        sessions
            .broadcast_except_user(channel, typist, "typing")
            .await;

        assert_eq!(rx_c.recv().await.unwrap(), "typing");
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribe_removes_only_that_connection() {
        let sessions = ChannelSessions::new();
        let channel = Uuid::new_v4();
        let conn_a = ConnectionId::new();
        let (tx_a, _rx_a) = unbounded_channel();
        let (tx_b, _rx_b) = unbounded_channel();

        sessions.subscribe(channel, conn_a, Uuid::new_v4(), tx_a).await;
        sessions
            .subscribe(channel, ConnectionId::new(), Uuid::new_v4(), tx_b)
            .await;

        sessions.unsubscribe(channel, conn_a).await;

        assert_eq!(sessions.subscriber_count(channel).await, 1);
    }
}
