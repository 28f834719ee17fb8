//! Core domain models for the chat client.

use super::value_object::{MessageKind, RoomName, Timestamp, Username};

/// Represents one connect attempt and, once established, the live session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Name the user joined with
    pub username: Username,
    /// Room the user joined
    pub room: RoomName,
    /// Transport generation this session belongs to
    pub generation: u64,
    /// Whether the transport reported `connect`
    pub connected: bool,
}

impl Session {
    /// Create a session for a connect attempt that is not yet established
    pub fn new(username: Username, room: RoomName, generation: u64) -> Self {
        Self {
            username,
            room,
            generation,
            connected: false,
        }
    }
}

/// Represents a rendered chat line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Author name (empty for system lines)
    pub author: String,
    /// Text, or image URL for image messages
    pub body: String,
    /// Content kind
    pub kind: MessageKind,
    /// Server timestamp
    pub sent_at: Timestamp,
    /// Sent by the local user
    pub is_self: bool,
    /// Server notice rather than a user message
    pub is_system: bool,
}

impl ChatMessage {
    /// Create a user message, tagging it as self when `author` is `me`
    pub fn from_author(
        me: &Username,
        author: String,
        body: String,
        kind: MessageKind,
        sent_at: Timestamp,
    ) -> Self {
        let is_self = me.is_author(&author);
        Self {
            author,
            body,
            kind,
            sent_at,
            is_self,
            is_system: false,
        }
    }

    /// Create a system notice
    pub fn system(body: String, sent_at: Timestamp) -> Self {
        Self {
            author: String::new(),
            body,
            kind: MessageKind::Text,
            sent_at,
            is_self: false,
            is_system: true,
        }
    }

    /// Whether this message should raise an alert while the window is inactive
    pub fn wants_attention(&self) -> bool {
        !self.is_self && !self.is_system
    }
}

/// Append-only display log, in arrival order
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<ChatMessage>,
}

impl MessageLog {
    /// Append a message and return a reference to it
    pub fn push(&mut self, message: ChatMessage) -> &ChatMessage {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// Drop every message (new session established)
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Messages in arrival order
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Room members as last pushed by the server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberList {
    members: Vec<String>,
}

impl MemberList {
    /// Replace the whole list with a new snapshot
    pub fn replace(&mut self, members: Vec<String>) {
        self.members = members;
    }

    /// Members in server order
    pub fn members(&self) -> &[String] {
        &self.members
    }
}

/// The single "who is typing" label
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypingIndicator {
    label: Option<String>,
}

impl TypingIndicator {
    /// Show `username` as typing, replacing any previous label
    pub fn set(&mut self, username: &str) {
        self.label = Some(format!("{username} is typing..."));
    }

    /// Clear the label
    pub fn clear(&mut self) {
        self.label = None;
    }

    /// Current label, if any
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}
