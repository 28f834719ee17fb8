//! Domain layer error definitions.

use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// Username too long error
    #[error("Username cannot exceed {max} characters (got {actual})")]
    UsernameTooLong { max: usize, actual: usize },

    /// RoomName too long error
    #[error("Room name cannot exceed {max} characters (got {actual})")]
    RoomNameTooLong { max: usize, actual: usize },

    /// MessageText validation error
    #[error("Message text cannot be empty")]
    MessageTextEmpty,

    /// Attachment filename validation error
    #[error("Attachment filename cannot be empty")]
    AttachmentNameEmpty,
}
