use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Client→server events over the persistent connection.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsInboundEvent {
    JoinChannel {
        channel_id: Uuid,
    },
    LeaveChannel {
        channel_id: Uuid,
    },
    TypingStart {
        channel_id: Uuid,
        #[serde(default)]
        user_name: Option<String>,
    },
    TypingStop {
        channel_id: Uuid,
    },
    MessageRead {
        channel_id: Uuid,
        message_id: Uuid,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckResult {
    Ok,
    Error,
}

/// Explicit acknowledgement for join/leave requests: a tagged result message
/// instead of an ad hoc object literal.
#[derive(Debug, Serialize, Deserialize)]
pub struct WsAck {
    #[serde(rename = "type")]
    pub kind: String,
    pub event: String,
    pub channel_id: Uuid,
    pub result: AckResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl WsAck {
    pub fn ok(event: &str, channel_id: Uuid) -> Self {
        Self {
            kind: "ack".into(),
            event: event.into(),
            channel_id,
            result: AckResult::Ok,
            error_code: None,
        }
    }

    pub fn error(event: &str, channel_id: Uuid, error_code: &str) -> Self {
        Self {
            kind: "ack".into(),
            event: event.into(),
            channel_id,
            result: AckResult::Error,
            error_code: Some(error_code.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_join_channel_event() {
        let channel_id = Uuid::new_v4();
        let raw = format!(r#"{{"type":"join_channel","channel_id":"{channel_id}"}}"#);
        match serde_json::from_str::<WsInboundEvent>(&raw).unwrap() {
            WsInboundEvent::JoinChannel { channel_id: id } => assert_eq!(id, channel_id),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn typing_start_user_name_is_optional() {
        let channel_id = Uuid::new_v4();
        let raw = format!(r#"{{"type":"typing_start","channel_id":"{channel_id}"}}"#);
        match serde_json::from_str::<WsInboundEvent>(&raw).unwrap() {
            WsInboundEvent::TypingStart { user_name, .. } => assert!(user_name.is_none()),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn ack_serializes_tagged_result() {
        let channel_id = Uuid::new_v4();
        let ok = serde_json::to_value(WsAck::ok("join_channel", channel_id)).unwrap();
        assert_eq!(ok["type"], "ack");
        assert_eq!(ok["result"], "ok");
        assert!(ok.get("error_code").is_none());

        let err =
            serde_json::to_value(WsAck::error("join_channel", channel_id, "NOT_A_PARTICIPANT"))
                .unwrap();
        assert_eq!(err["result"], "error");
        assert_eq!(err["error_code"], "NOT_A_PARTICIPANT");
    }
}
