//! Wire Frames
//!
//! Inbound frames are validated into a tagged variant at the connection
//! boundary; anything that does not parse never reaches the services.

use serde::{Deserialize, Serialize};

use super::scope::Scope;
use crate::models::{ChatMessage, DescriptionMessage, GroupBatch};

/// Payload carried by the hub
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Broadcast {
    Chat(ChatMessage),
    Groups(GroupBatch),
    Description(DescriptionMessage),
}

/// Frames accepted from a client
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundFrame {
    /// Event-scoped chat message, gated by membership
    Chat(ChatMessage),
    /// Grouping result to relay on the `groups` scope
    Groups { groups: GroupBatch },
    /// Self-description relayed on the `description` scope
    Description(DescriptionMessage),
    Subscribe { scope: Scope },
    Unsubscribe { scope: Scope },
    Ping,
}

/// Reasons an inbound frame is rejected
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("invalid frame: {0}")]
    Shape(#[source] serde_json::Error),
}

impl InboundFrame {
    /// Parse a text frame
    ///
    /// A bare JSON array is taken as a grouping result, which is what the
    /// grouping worker sends.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(FrameError::Json)?;
        if value.is_array() {
            let groups = GroupBatch::from_value(value).map_err(FrameError::Shape)?;
            return Ok(InboundFrame::Groups { groups });
        }
        serde_json::from_value(value).map_err(FrameError::Shape)
    }
}

/// Frames sent to a client
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundFrame<'a> {
    Connected { id: &'a str, timestamp: String },
    Message { scope: Scope, data: &'a Broadcast },
    Subscribed { scope: Scope },
    Unsubscribed { scope: Scope },
    Evicted { scope: Scope },
    Pong { timestamp: String },
    Error { message: String },
}

impl OutboundFrame<'_> {
    pub fn to_json(&self) -> String {
        // Every variant is plain data with string keys.
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"serialization failed: {}"}}"#, e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_chat_frame() {
        let frame =
            InboundFrame::parse(r#"{"type":"chat","eventId":42,"senderId":7,"content":"hi"}"#)
                .unwrap();
        assert_eq!(frame, InboundFrame::Chat(ChatMessage::new(42, 7, "hi")));
    }

    #[test]
    fn test_parse_chat_missing_field_is_rejected() {
        let err = InboundFrame::parse(r#"{"type":"chat","eventId":42,"content":"hi"}"#);
        assert!(matches!(err, Err(FrameError::Shape(_))));
    }

    #[test]
    fn test_parse_garbage_is_rejected() {
        assert!(matches!(
            InboundFrame::parse("not json"),
            Err(FrameError::Json(_))
        ));
        assert!(matches!(
            InboundFrame::parse(r#"{"type":"teleport"}"#),
            Err(FrameError::Shape(_))
        ));
    }

    #[test]
    fn test_parse_bare_group_list() {
        let frame = InboundFrame::parse(
            r#"[{"groupId":1,"users":[1,2],"topTraits":["music"],"latitude":52.1,"longitude":20.0}]"#,
        )
        .unwrap();
        match frame {
            InboundFrame::Groups { groups } => assert_eq!(groups.len(), 1),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_parse_subscribe() {
        let frame = InboundFrame::parse(r#"{"type":"subscribe","scope":"event-chat.42"}"#).unwrap();
        assert_eq!(
            frame,
            InboundFrame::Subscribe {
                scope: Scope::EventChat(42)
            }
        );
        assert!(InboundFrame::parse(r#"{"type":"subscribe","scope":"nowhere"}"#).is_err());
    }

    #[test]
    fn test_outbound_message_shape() {
        let payload = Broadcast::Chat(ChatMessage::new(42, 7, "hi"));
        let frame = OutboundFrame::Message {
            scope: Scope::EventChat(42),
            data: &payload,
        };
        let value: serde_json::Value = serde_json::from_str(&frame.to_json()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "message",
                "scope": "event-chat.42",
                "data": {"eventId": 42, "senderId": 7, "content": "hi"}
            })
        );
    }

    #[test]
    fn test_outbound_groups_echo_the_inbound_list() {
        let inbound =
            r#"[{"groupId":1,"users":[1,2],"topTraits":["music"],"latitude":52.1,"longitude":20.0}]"#;
        let InboundFrame::Groups { groups } = InboundFrame::parse(inbound).unwrap() else {
            panic!("expected a grouping result");
        };

        let frame = OutboundFrame::Message {
            scope: Scope::Groups,
            data: &Broadcast::Groups(groups),
        };
        let value: serde_json::Value = serde_json::from_str(&frame.to_json()).unwrap();
        let expected: serde_json::Value = serde_json::from_str(inbound).unwrap();
        assert_eq!(value["data"], expected);
    }

    #[test]
    fn test_tagged_groups_frame_keeps_missing_coordinates_absent() {
        let frame =
            InboundFrame::parse(r#"{"type":"groups","groups":[{"groupId":4,"memberIds":[8]}]}"#)
                .unwrap();
        let InboundFrame::Groups { groups } = frame else {
            panic!("expected a grouping result");
        };
        assert_eq!(
            serde_json::to_value(Broadcast::Groups(groups)).unwrap(),
            json!([{"groupId": 4, "memberIds": [8]}])
        );
    }
}
