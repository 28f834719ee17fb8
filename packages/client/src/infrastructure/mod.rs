//! Infrastructure layer: wire payloads, Socket.IO codec and the WebSocket
//! transport.

pub mod dto;
pub mod protocol;
pub mod transport;
