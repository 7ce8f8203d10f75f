use chat_service::models::channel::Channel;
use chat_service::models::message::ChatMessage;
use chat_service::websocket::events::ChatEvent;
use chat_service::websocket::message_types::{AckResult, WsAck, WsInboundEvent};
use chrono::Utc;
use uuid::Uuid;

fn sample_message(channel_key: Uuid, sender_id: Uuid) -> ChatMessage {
    ChatMessage {
        id: Uuid::new_v4(),
        channel_key,
        sender_id,
        sender_name: "alice".into(),
        sender_avatar: None,
        kind: "text".into(),
        content: "hello".into(),
        media_url: None,
        thumbnail_url: None,
        metadata: None,
        reply_to: None,
        reply_count: 0,
        read_by: vec![sender_id],
        is_deleted: false,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn new_message_event_carries_channel_and_message() {
    let channel_id = Uuid::new_v4();
    let sender_id = Uuid::new_v4();
    let message = sample_message(Uuid::new_v4(), sender_id);

    let payload = ChatEvent::NewMessage {
        channel_id,
        message: message.clone(),
    }
    .to_payload()
    .unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(parsed["type"], "new_message");
    assert_eq!(parsed["channel_id"], channel_id.to_string());
    assert_eq!(parsed["message"]["content"], "hello");
    assert_eq!(parsed["message"]["senderId"], sender_id.to_string());
    // sender starts in its own readers set
    assert_eq!(parsed["message"]["readBy"][0], sender_id.to_string());
}

#[test]
fn all_server_event_tags_match_the_wire_contract() {
    let channel_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let message = sample_message(Uuid::new_v4(), user_id);

    let events = vec![
        ChatEvent::NewMessage {
            channel_id,
            message: message.clone(),
        },
        ChatEvent::MessageUpdated {
            channel_id,
            message,
        },
        ChatEvent::MessageDeleted {
            channel_id,
            message_id: Uuid::new_v4(),
        },
        ChatEvent::NewChannel {
            channel: Channel {
                id: channel_id,
                name: Some("general".into()),
                description: None,
                channel_type: "group".into(),
                group_id: Some(Uuid::new_v4()),
                owner_id: None,
                is_announcement: false,
                message_store_key: Uuid::new_v4(),
                last_message_at: None,
                is_active: true,
                version: 0,
                created_at: Utc::now(),
            },
        },
        ChatEvent::UserTyping {
            channel_id,
            user_id,
            user_name: Some("alice".into()),
            is_typing: true,
        },
        ChatEvent::MessageReadReceipt {
            channel_id,
            message_id: Uuid::new_v4(),
            user_id,
            read_at: Utc::now(),
        },
        ChatEvent::UserStatusChanged {
            user_id,
            is_online: false,
            timestamp: Utc::now(),
        },
    ];

    let expected = [
        "new_message",
        "message_updated",
        "message_deleted",
        "new_channel",
        "user_typing",
        "message_read_receipt",
        "user_status_changed",
    ];

    for (event, expected_tag) in events.iter().zip(expected) {
        let parsed: serde_json::Value =
            serde_json::from_str(&event.to_payload().unwrap()).unwrap();
        assert_eq!(parsed["type"], expected_tag);
        assert_eq!(event.event_type(), expected_tag);
    }
}

#[test]
fn inbound_events_round_trip_from_client_json() {
    let channel_id = Uuid::new_v4();
    let message_id = Uuid::new_v4();

    let raw = format!(
        r#"{{"type":"message_read","channel_id":"{channel_id}","message_id":"{message_id}"}}"#
    );
    match serde_json::from_str::<WsInboundEvent>(&raw).unwrap() {
        WsInboundEvent::MessageRead {
            channel_id: c,
            message_id: m,
        } => {
            assert_eq!(c, channel_id);
            assert_eq!(m, message_id);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let raw = format!(r#"{{"type":"typing_stop","channel_id":"{channel_id}"}}"#);
    assert!(serde_json::from_str::<WsInboundEvent>(&raw).is_ok());
}

#[test]
fn join_ack_reports_tagged_result() {
    let channel_id = Uuid::new_v4();

    let ack: WsAck = serde_json::from_str(
        &serde_json::to_string(&WsAck::error("join_channel", channel_id, "NOT_A_PARTICIPANT"))
            .unwrap(),
    )
    .unwrap();

    assert_eq!(ack.kind, "ack");
    assert_eq!(ack.event, "join_channel");
    assert_eq!(ack.result, AckResult::Error);
    assert_eq!(ack.error_code.as_deref(), Some("NOT_A_PARTICIPANT"));
}
