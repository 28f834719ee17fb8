//! Domain layer for the chat client.
//!
//! This module contains the client-side model of a chat session and the
//! ports (traits) through which the session reaches the host: view,
//! notifications, sound and transport. It is independent of the wire format
//! and of any concrete terminal or socket implementation.

pub mod entity;
pub mod error;
pub mod event;
pub mod port;
pub mod value_object;

pub use entity::{ChatMessage, MemberList, MessageLog, Session, TypingIndicator};
pub use error::ValueObjectError;
pub use event::{InboundEvent, OutboundEvent, TransportEnvelope, TransportEvent};
pub use port::{
    Connector, DesktopNotification, IconState, NotificationPermission, Notifier, Platform,
    SoundPlayer, Transport, View,
};
pub use value_object::{Attachment, MessageKind, MessageText, RoomName, Timestamp, Username};
