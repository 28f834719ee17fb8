//! Event payload DTOs for the chat application.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    domain::{InboundEvent, MessageKind, OutboundEvent},
    infrastructure::protocol::{Packet, placeholder},
};

/// `message` payload pushed by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDto {
    pub username: String,
    /// Text, or image URL for image messages
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    #[serde(default)]
    pub timestamp: String, // ISO 8601, local time, no offset
}

impl From<MessageDto> for InboundEvent {
    fn from(dto: MessageDto) -> Self {
        InboundEvent::Message {
            username: dto.username,
            text: dto.text,
            kind: dto.kind,
            timestamp: dto.timestamp,
        }
    }
}

/// `system` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemDto {
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
}

impl From<SystemDto> for InboundEvent {
    fn from(dto: SystemDto) -> Self {
        InboundEvent::System {
            message: dto.message,
            timestamp: dto.timestamp,
        }
    }
}

/// `members` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembersDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    pub members: Vec<String>,
}

impl From<MembersDto> for InboundEvent {
    fn from(dto: MembersDto) -> Self {
        InboundEvent::Members(dto.members)
    }
}

/// `typing` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingDto {
    pub username: String,
}

impl From<TypingDto> for InboundEvent {
    fn from(dto: TypingDto) -> Self {
        InboundEvent::Typing {
            username: dto.username,
        }
    }
}

/// `join` payload sent by the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinDto {
    pub username: String,
    pub room: String,
}

/// `message` payload sent by the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendTextDto {
    pub text: String,
}

/// Build the Socket.IO packet (and attachments) for an outbound event.
///
/// Events without data still carry an empty object, as the server's handlers
/// expect one argument.
pub fn outbound_packet(event: OutboundEvent) -> (Packet, Vec<Vec<u8>>) {
    let name = event.name();
    match event {
        OutboundEvent::Join { username, room } => (
            Packet::event(name, vec![to_value(&JoinDto { username, room })]),
            Vec::new(),
        ),
        OutboundEvent::Message { text } => (
            Packet::event(name, vec![to_value(&SendTextDto { text })]),
            Vec::new(),
        ),
        OutboundEvent::Image { filename, data } => (
            Packet::binary_event(name, vec![json!([filename, placeholder(0)])], 1),
            vec![data],
        ),
        OutboundEvent::Leave | OutboundEvent::Typing | OutboundEvent::StopTyping => {
            (Packet::event(name, vec![json!({})]), Vec::new())
        }
    }
}

fn to_value<T: Serialize>(dto: &T) -> Value {
    serde_json::to_value(dto).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_dto_defaults_type_to_text() {
        // テスト項目: type が省略されたメッセージはテキスト扱い
        // given (前提条件):
        let payload = json!({"username": "bob", "text": "hi", "timestamp": "2025-01-01T10:00:00"});

        // when (操作):
        let dto: MessageDto = serde_json::from_value(payload).unwrap();

        // then (期待する結果):
        assert_eq!(dto.kind, MessageKind::Text);
        assert_eq!(
            InboundEvent::from(dto),
            InboundEvent::Message {
                username: "bob".into(),
                text: "hi".into(),
                kind: MessageKind::Text,
                timestamp: "2025-01-01T10:00:00".into(),
            }
        );
    }

    #[test]
    fn test_members_dto_ignores_room() {
        // テスト項目: members の room フィールドは無視される
        let dto: MembersDto =
            serde_json::from_value(json!({"room": "dev", "members": ["a", "b"]})).unwrap();

        assert_eq!(
            InboundEvent::from(dto),
            InboundEvent::Members(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_outbound_join_packet() {
        // テスト項目: join は username と room を持つオブジェクトで送られる
        let (packet, attachments) = outbound_packet(OutboundEvent::Join {
            username: "alice".into(),
            room: "public".into(),
        });

        assert!(attachments.is_empty());
        assert_eq!(
            packet.data,
            Some(json!(["join", {"username": "alice", "room": "public"}]))
        );
    }

    #[test]
    fn test_outbound_signal_events_carry_empty_object() {
        // テスト項目: leave / typing / stop_typing は空オブジェクトを伴う
        for (event, name) in [
            (OutboundEvent::Leave, "leave"),
            (OutboundEvent::Typing, "typing"),
            (OutboundEvent::StopTyping, "stop_typing"),
        ] {
            let (packet, _) = outbound_packet(event);
            assert_eq!(packet.data, Some(json!([name, {}])));
        }
    }

    #[test]
    fn test_outbound_image_packet() {
        // テスト項目: 画像は [ファイル名, placeholder] と 1 つの添付で送られる
        let (packet, attachments) = outbound_packet(OutboundEvent::Image {
            filename: "cat.png".into(),
            data: vec![1, 2, 3],
        });

        assert_eq!(packet.attachments, 1);
        assert_eq!(
            packet.encode(),
            r#"51-["image",["cat.png",{"_placeholder":true,"num":0}]]"#
        );
        assert_eq!(attachments, vec![vec![1, 2, 3]]);
    }
}
