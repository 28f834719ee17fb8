//! Transport implementations of the [`crate::domain::Connector`] port.

pub mod websocket;

pub use websocket::{WebSocketConnector, WebSocketTransport};
