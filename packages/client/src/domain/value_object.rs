//! Value Objects for domain models.
//!
//! Value Objects are immutable objects that represent values in the domain.
//! They are compared by their value, not by identity.

use serde::{Deserialize, Serialize};
use std::{fmt, path::Path};

use lanchat_shared::time::format_for_display;

use super::error::ValueObjectError;

/// Username used when the username field is left blank
pub const DEFAULT_USERNAME: &str = "Guest";

/// Room joined when the room field is left blank
pub const DEFAULT_ROOM: &str = "public";

/// Maximum username length accepted by the server
pub const MAX_USERNAME_CHARS: usize = 50;

/// Maximum room name length accepted by the server
pub const MAX_ROOM_CHARS: usize = 100;

/// Username value object.
///
/// Represents the name the local user joins a room with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Username(String);

impl Username {
    /// Resolve a Username from the raw username field value.
    ///
    /// # Arguments
    ///
    /// * `raw` - The field value as typed by the user
    ///
    /// # Returns
    ///
    /// The trimmed username, `"Guest"` if the field is blank, or an error if
    /// the name is longer than the server accepts
    pub fn resolve(raw: &str) -> Result<Self, ValueObjectError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self(DEFAULT_USERNAME.to_string()));
        }
        let len = trimmed.chars().count();
        if len > MAX_USERNAME_CHARS {
            return Err(ValueObjectError::UsernameTooLong {
                max: MAX_USERNAME_CHARS,
                actual: len,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the given author name refers to this user.
    ///
    /// Comparison is exact: no case folding, no trimming.
    pub fn is_author(&self, author: &str) -> bool {
        self.0 == author
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room name value object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomName(String);

impl RoomName {
    /// Resolve a RoomName from the raw room field value.
    ///
    /// Blank input resolves to `"public"`.
    pub fn resolve(raw: &str) -> Result<Self, ValueObjectError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self(DEFAULT_ROOM.to_string()));
        }
        let len = trimmed.chars().count();
        if len > MAX_ROOM_CHARS {
            return Err(ValueObjectError::RoomNameTooLong {
                max: MAX_ROOM_CHARS,
                actual: len,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outgoing message text.
///
/// Always trimmed and never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageText(String);

impl MessageText {
    /// Create a new MessageText from the draft contents.
    ///
    /// # Returns
    ///
    /// The trimmed text, or `MessageTextEmpty` for blank drafts
    pub fn new(raw: &str) -> Result<Self, ValueObjectError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::MessageTextEmpty);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

/// Content kind of a chat message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Plain text body
    #[default]
    Text,
    /// Body is an image URL
    Image,
}

/// Timestamp value object.
///
/// Keeps the server's string as received; parsing only happens for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp(String);

impl Timestamp {
    /// Create a new Timestamp from the server's raw value.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Get the raw value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human readable form (`YYYY-MM-DD HH:MM:SS`), or the raw value.
    pub fn display(&self) -> String {
        format_for_display(&self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file offered for upload by paste or drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    filename: String,
    media_type: &'static str,
    data: Vec<u8>,
}

impl Attachment {
    /// Create a new Attachment, guessing the media type from the filename.
    ///
    /// # Arguments
    ///
    /// * `filename` - File name (a path is reduced to its last component)
    /// * `data` - Raw file contents
    pub fn new(filename: &str, data: Vec<u8>) -> Result<Self, ValueObjectError> {
        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string();
        if name.is_empty() {
            return Err(ValueObjectError::AttachmentNameEmpty);
        }
        let media_type = media_type_for(&name);
        Ok(Self {
            filename: name,
            media_type,
            data,
        })
    }

    /// File name without directories.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Guessed MIME type.
    pub fn media_type(&self) -> &'static str {
        self.media_type
    }

    /// Raw file contents.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether this attachment may be sent as an image.
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// Split into filename and contents.
    pub fn into_parts(self) -> (String, Vec<u8>) {
        (self.filename, self.data)
    }
}

fn media_type_for(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("avif") => "image/avif",
        Some("tif" | "tiff") => "image/tiff",
        Some("txt") => "text/plain",
        Some("pdf") => "application/pdf",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}
