//! Error types shared across the client layers.

use thiserror::Error;

use crate::{domain::ValueObjectError, infrastructure::protocol::ProtocolError};

/// Top-level client error.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Username or room field rejected
    #[error("invalid field: {0}")]
    InvalidField(#[from] ValueObjectError),

    /// Line editor failure
    #[error("line editor error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),

    /// The input task panicked or was cancelled
    #[error("input task failed: {0}")]
    Input(#[from] tokio::task::JoinError),
}

/// Errors that end a connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// WebSocket level failure (handshake, I/O, close)
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The server sent something that is not Engine.IO / Socket.IO
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// No ping from the server within ping interval + ping timeout
    #[error("no heartbeat from server within {0:?}")]
    HeartbeatTimeout(std::time::Duration),

    /// The server refused the namespace connection
    #[error("connection refused by server: {0}")]
    Refused(String),
}

/// Errors raised while decoding an inbound named event.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No route for this event name
    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    /// The payload does not have the expected shape
    #[error("malformed '{event}' payload: {source}")]
    Malformed {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Host capability failures. Always degraded silently by the session.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The host cannot do this at all
    #[error("{0} is not supported on this host")]
    Unsupported(&'static str),

    /// Writing to the terminal failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

