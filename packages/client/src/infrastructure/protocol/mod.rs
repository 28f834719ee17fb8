//! Socket.IO v5 over Engine.IO v4, WebSocket transport only.
//!
//! [`engine`] handles the outer Engine.IO framing, [`packet`] the Socket.IO
//! packets carried inside `message` frames. [`FrameDecoder`] combines both
//! and reassembles binary events from the frames that follow them.

pub mod engine;
pub mod packet;

use std::num::ParseIntError;

use thiserror::Error;

pub use engine::{EnginePacket, Handshake};
pub use packet::{BinaryAssembler, MAX_ATTACHMENTS, Packet, PacketType, placeholder};

/// Path of the Socket.IO endpoint, with the query selecting the transport.
pub const SOCKET_PATH: &str = "/socket.io/?EIO=4&transport=websocket";

/// Errors raised while decoding frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame with no content
    #[error("empty packet")]
    Empty,

    /// First character is not an Engine.IO type
    #[error("unknown Engine.IO packet type '{0}'")]
    UnknownEngineType(char),

    /// First character is not a Socket.IO type
    #[error("unknown Socket.IO packet type '{0}'")]
    UnknownPacketType(char),

    /// Binary packet without `<n>-` prefix
    #[error("binary packet without attachment count")]
    MissingAttachmentCount,

    /// Binary packet announcing more frames than accepted
    #[error("binary packet announces {0} attachments")]
    TooManyAttachments(usize),

    /// Attachment count or ack id out of range
    #[error("invalid number in packet: {0}")]
    InvalidNumber(#[from] ParseIntError),

    /// Payload is not valid JSON
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Event payload is not `["name", ...]`
    #[error("event packet without a name")]
    MissingEventName,

    /// Placeholder pointing at a missing attachment
    #[error("placeholder does not match any attachment")]
    BadPlaceholder,

    /// Binary frame with no binary packet waiting for it
    #[error("binary frame received without a pending binary packet")]
    UnexpectedBinary,
}

/// One WebSocket frame, independent of the WebSocket library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text frame
    Text(String),
    /// Binary frame
    Binary(Vec<u8>),
}

/// Encode a Socket.IO packet and its attachments as WebSocket frames.
pub fn encode_packet(packet: &Packet, attachments: Vec<Vec<u8>>) -> Vec<Frame> {
    let mut frames = Vec::with_capacity(attachments.len() + 1);
    frames.push(Frame::Text(
        EnginePacket::Message(packet.encode()).encode(),
    ));
    frames.extend(attachments.into_iter().map(Frame::Binary));
    frames
}

/// What a decoded frame means to the connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Engine.IO handshake; the client must now connect the namespace.
    Open(Handshake),
    /// Heartbeat; answer with a pong carrying the same data.
    Ping(String),
    /// Engine.IO close.
    Close,
    /// A complete Socket.IO packet.
    Packet(Packet),
    /// Nothing to act on yet (pong, noop, waiting for attachments).
    Nothing,
}

/// Stateful decoder for the frames of one connection.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Option<BinaryAssembler>,
}

impl FrameDecoder {
    /// Create a decoder with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a text frame.
    pub fn text(&mut self, text: &str) -> Result<Incoming, ProtocolError> {
        let incoming = match EnginePacket::decode(text)? {
            EnginePacket::Open(handshake) => Incoming::Open(handshake),
            EnginePacket::Ping(data) => Incoming::Ping(data),
            EnginePacket::Close => Incoming::Close,
            EnginePacket::Message(payload) => {
                let packet = Packet::decode(&payload)?;
                if packet.attachments > 0 {
                    self.pending = Some(BinaryAssembler::new(packet));
                    Incoming::Nothing
                } else {
                    Incoming::Packet(packet)
                }
            }
            EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {
                Incoming::Nothing
            }
        };
        Ok(incoming)
    }

    /// Decode a binary frame (an attachment of the pending binary packet).
    pub fn binary(&mut self, data: Vec<u8>) -> Result<Incoming, ProtocolError> {
        let assembler = self
            .pending
            .as_mut()
            .ok_or(ProtocolError::UnexpectedBinary)?;
        assembler.push(data);
        if !assembler.is_complete() {
            return Ok(Incoming::Nothing);
        }
        match self.pending.take() {
            Some(assembler) => Ok(Incoming::Packet(assembler.finish()?)),
            None => Ok(Incoming::Nothing),
        }
    }
}

/// Build the WebSocket endpoint for a server base URL.
///
/// `http` becomes `ws`, `https` becomes `wss`; a bare `host:port` is taken as
/// plain `ws`.
pub fn socket_endpoint(server: &str) -> String {
    let server = server.trim().trim_end_matches('/');
    let base = if let Some(rest) = server.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = server.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if server.starts_with("ws://") || server.starts_with("wss://") {
        server.to_string()
    } else {
        format!("ws://{server}")
    };
    format!("{base}{SOCKET_PATH}")
}
