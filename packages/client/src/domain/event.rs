//! Session events.
//!
//! [`InboundEvent`] is what the server pushes, [`OutboundEvent`] is what the
//! client emits, and [`TransportEvent`] wraps both the transport lifecycle and
//! raw named events as they arrive from a connection.

use serde_json::Value;

use super::value_object::MessageKind;

/// Events pushed by the server, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A chat message (history replay or live).
    Message {
        /// Author name.
        username: String,
        /// Text, or image URL.
        text: String,
        /// Content kind.
        kind: MessageKind,
        /// Server timestamp.
        timestamp: String,
    },

    /// A server notice (join/leave/disconnect).
    System {
        /// Notice text.
        message: String,
        /// Server timestamp.
        timestamp: String,
    },

    /// Full member snapshot of the room.
    Members(Vec<String>),

    /// Someone else started typing.
    Typing {
        /// Who is typing.
        username: String,
    },

    /// The typing label should be cleared.
    StopTyping,
}

/// Events emitted by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// Join a room.
    Join {
        /// Name to join with.
        username: String,
        /// Room to join.
        room: String,
    },

    /// Leave the current room.
    Leave,

    /// Send a text message.
    Message {
        /// Trimmed text.
        text: String,
    },

    /// Upload an image.
    Image {
        /// Original file name.
        filename: String,
        /// Raw file bytes.
        data: Vec<u8>,
    },

    /// The local user is typing.
    Typing,

    /// The local user stopped typing.
    StopTyping,
}

impl OutboundEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave => "leave",
            Self::Message { .. } => "message",
            Self::Image { .. } => "image",
            Self::Typing => "typing",
            Self::StopTyping => "stop_typing",
        }
    }
}

/// What a connection reports back to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The server accepted the connection.
    Connected,

    /// A named event with its first argument.
    Event {
        /// Event name.
        name: String,
        /// Event payload (`Null` if the event carried no arguments).
        payload: Value,
    },

    /// The connection is gone, for whatever reason.
    Disconnected,
}

/// A [`TransportEvent`] tagged with the connection it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportEnvelope {
    /// Generation of the connection that produced the event.
    pub generation: u64,
    /// The event itself.
    pub event: TransportEvent,
}

impl TransportEnvelope {
    /// Tag an event with its connection generation.
    pub fn new(generation: u64, event: TransportEvent) -> Self {
        Self { generation, event }
    }
}
