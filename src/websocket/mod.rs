use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod events;
pub mod handlers;
pub mod message_types;
pub mod presence;
pub mod pubsub;
pub mod sessions;

/// Unique identifier for one live WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

struct ConnectionHandle {
    id: ConnectionId,
    sender: UnboundedSender<String>,
}

/// Live connections per user. Authoritative for presence within this
/// process: a user is online exactly while their set is non-empty.
///
/// Online/offline transitions are decided under the write guard, so
/// concurrent connects and disconnects for one user cannot produce a lost
/// first-connection or premature last-connection event.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    // user_id -> live connection handles
    inner: Arc<RwLock<HashMap<Uuid, Vec<ConnectionHandle>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection for a user.
    ///
    /// Returns the connection id, the outbound sender/receiver pair for the
    /// socket task, and whether this registration took the user online.
    pub async fn register(
        &self,
        user_id: Uuid,
    ) -> (
        ConnectionId,
        UnboundedSender<String>,
        UnboundedReceiver<String>,
        bool,
    ) {
        let (tx, rx) = unbounded_channel();
        let id = ConnectionId::new();

        let mut guard = self.inner.write().await;
        let handles = guard.entry(user_id).or_default();
        let came_online = handles.is_empty();
        handles.push(ConnectionHandle {
            id,
            sender: tx.clone(),
        });

        (id, tx, rx, came_online)
    }

    /// Remove a connection. Returns true when this removal took the user
    /// offline (their live set became empty).
    pub async fn unregister(&self, user_id: Uuid, connection_id: ConnectionId) -> bool {
        let mut guard = self.inner.write().await;
        if let Some(handles) = guard.get_mut(&user_id) {
            handles.retain(|handle| handle.id != connection_id);
            if handles.is_empty() {
                guard.remove(&user_id);
                return true;
            }
        }
        false
    }

    /// Push a payload to every live connection of one user, pruning dead
    /// senders.
    pub async fn send_to_user(&self, user_id: Uuid, payload: &str) {
        let mut guard = self.inner.write().await;
        if let Some(handles) = guard.get_mut(&user_id) {
            handles.retain(|handle| handle.sender.send(payload.to_string()).is_ok());
        }
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        let guard = self.inner.read().await;
        guard.get(&user_id).map(|h| !h.is_empty()).unwrap_or(false)
    }

    pub async fn connection_count(&self, user_id: Uuid) -> usize {
        let guard = self.inner.read().await;
        guard.get(&user_id).map(|h| h.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_connection_reports_online_once() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();

        let (_c1, _tx1, _rx1, online1) = registry.register(user).await;
        let (_c2, _tx2, _rx2, online2) = registry.register(user).await;

        assert!(online1);
        assert!(!online2);
        assert!(registry.is_online(user).await);
        assert_eq!(registry.connection_count(user).await, 2);
    }

    #[tokio::test]
    async fn last_disconnect_reports_offline_exactly_once() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();

        let (c1, _tx1, _rx1, _) = registry.register(user).await;
        let (c2, _tx2, _rx2, _) = registry.register(user).await;

        assert!(!registry.unregister(user, c1).await);
        assert!(registry.unregister(user, c2).await);
        assert!(!registry.unregister(user, c2).await);
        assert!(!registry.is_online(user).await);
    }

    #[tokio::test]
    async fn send_to_user_reaches_all_connections() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();

        let (_c1, _tx1, mut rx1, _) = registry.register(user).await;
        let (_c2, _tx2, mut rx2, _) = registry.register(user).await;

        registry.send_to_user(user, "hello").await;

        assert_eq!(rx1.recv().await.unwrap(), "hello");
        assert_eq!(rx2.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn dead_connections_are_pruned_on_send() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();

        let (_c1, _tx1, rx1, _) = registry.register(user).await;
        drop(rx1);
        let (_c2, _tx2, mut rx2, _) = registry.register(user).await;

        registry.send_to_user(user, "ping").await;

        assert_eq!(registry.connection_count(user).await, 1);
        assert_eq!(rx2.recv().await.unwrap(), "ping");
    }
}
