//! Engine.IO v4 packets.
//!
//! Over the WebSocket transport every text frame is exactly one packet: a
//! single type digit followed by the payload.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ProtocolError;

/// Handshake data carried by the `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Engine.IO session id.
    pub sid: String,
    /// Transports the server offers to upgrade to.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Server ping interval in milliseconds.
    pub ping_interval: u64,
    /// How long the server waits for a pong, in milliseconds.
    pub ping_timeout: u64,
    /// Maximum payload size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

impl Handshake {
    /// How long the client may go without a ping before the server counts
    /// as gone: one ping interval plus the ping timeout.
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

/// One Engine.IO packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    /// `0`: connection opened.
    Open(Handshake),
    /// `1`: transport closing.
    Close,
    /// `2`: heartbeat from the server, with optional data to echo.
    Ping(String),
    /// `3`: heartbeat reply.
    Pong(String),
    /// `4`: a Socket.IO packet.
    Message(String),
    /// `5`: transport upgrade.
    Upgrade,
    /// `6`: no-op.
    Noop,
}

impl EnginePacket {
    /// Decode a text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        let payload = chars.as_str();

        let packet = match kind {
            '0' => Self::Open(serde_json::from_str(payload)?),
            '1' => Self::Close,
            '2' => Self::Ping(payload.to_string()),
            '3' => Self::Pong(payload.to_string()),
            '4' => Self::Message(payload.to_string()),
            '5' => Self::Upgrade,
            '6' => Self::Noop,
            other => return Err(ProtocolError::UnknownEngineType(other)),
        };
        Ok(packet)
    }

    /// Encode as a text frame.
    pub fn encode(&self) -> String {
        match self {
            Self::Open(handshake) => {
                // Serializing a plain struct of strings and integers cannot fail.
                let json = serde_json::to_string(handshake).unwrap_or_else(|_| "{}".into());
                format!("0{json}")
            }
            Self::Close => "1".to_string(),
            Self::Ping(data) => format!("2{data}"),
            Self::Pong(data) => format!("3{data}"),
            Self::Message(data) => format!("4{data}"),
            Self::Upgrade => "5".to_string(),
            Self::Noop => "6".to_string(),
        }
    }
}
