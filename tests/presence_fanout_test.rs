use chat_service::websocket::sessions::ChannelSessions;
use chat_service::websocket::ConnectionRegistry;
use uuid::Uuid;

// Presence transitions and channel fan-out for one user with several live
// connections. The registry decides online/offline; sessions route
// broadcasts at-most-once per connection.

#[tokio::test]
async fn connection_churn_above_one_emits_no_presence_events() {
    let registry = ConnectionRegistry::new();
    let user = Uuid::new_v4();

    let (c1, _t1, _r1, online1) = registry.register(user).await;
    assert!(online1);

    // second and third connection churn while the first stays up
    let (c2, _t2, _r2, online2) = registry.register(user).await;
    let (c3, _t3, _r3, online3) = registry.register(user).await;
    assert!(!online2);
    assert!(!online3);

    assert!(!registry.unregister(user, c2).await);
    assert!(!registry.unregister(user, c3).await);
    assert!(registry.is_online(user).await);

    // only dropping the final connection reports offline
    assert!(registry.unregister(user, c1).await);
    assert!(!registry.is_online(user).await);
}

#[tokio::test]
async fn each_subscribed_connection_receives_a_broadcast_once() {
    let registry = ConnectionRegistry::new();
    let sessions = ChannelSessions::new();
    let channel = Uuid::new_v4();
    let user = Uuid::new_v4();

    let (c1, t1, mut r1, _) = registry.register(user).await;
    let (c2, t2, mut r2, _) = registry.register(user).await;

    sessions.subscribe(channel, c1, user, t1.clone()).await;
    sessions.subscribe(channel, c1, user, t1).await; // duplicate join is a no-op
    sessions.subscribe(channel, c2, user, t2).await;

    sessions.broadcast(channel, "payload").await;

    assert_eq!(r1.recv().await.unwrap(), "payload");
    assert!(r1.try_recv().is_err());
    assert_eq!(r2.recv().await.unwrap(), "payload");
    assert!(r2.try_recv().is_err());
}

#[tokio::test]
async fn disconnect_cleanup_stops_further_delivery() {
    let registry = ConnectionRegistry::new();
    let sessions = ChannelSessions::new();
    let channel = Uuid::new_v4();
    let user = Uuid::new_v4();

    let (c1, t1, mut r1, _) = registry.register(user).await;
    sessions.subscribe(channel, c1, user, t1).await;

    let subscribed = std::collections::HashSet::from([channel]);
    sessions.unsubscribe_all(&subscribed, c1).await;
    registry.unregister(user, c1).await;

    sessions.broadcast(channel, "late").await;
    assert!(r1.try_recv().is_err());
    assert_eq!(sessions.subscriber_count(channel).await, 0);
}
