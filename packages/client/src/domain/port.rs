//! Ports through which the session reaches the outside world.
//!
//! The session controller only talks to these traits. The terminal host
//! implements them in [`crate::ui::terminal`], the WebSocket transport in
//! [`crate::infrastructure::transport`].

use crate::error::PlatformError;

use super::{entity::ChatMessage, event::OutboundEvent, value_object::MessageKind};

/// Renders session state.
pub trait View: Send {
    /// Append one message to the display log.
    fn append_message(&mut self, message: &ChatMessage);

    /// Remove every rendered message.
    fn clear_messages(&mut self);

    /// Show the member list (full replacement).
    fn show_members(&mut self, members: &[String]);

    /// Show or clear the typing label.
    fn show_typing(&mut self, label: Option<&str>);

    /// Enable or disable input controls.
    fn show_connection(&mut self, connected: bool);

    /// Set the window title.
    fn set_title(&mut self, title: &str);

    /// Set the window icon.
    fn set_icon(&mut self, icon: IconState);
}

/// Window icon state while flashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IconState {
    /// The regular icon.
    #[default]
    Original,
    /// The blank icon.
    Blank,
}

impl IconState {
    /// The other state.
    pub fn toggled(self) -> Self {
        match self {
            Self::Original => Self::Blank,
            Self::Blank => Self::Original,
        }
    }
}

/// Desktop notification permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    /// Never asked.
    Default,
    /// Notifications may be shown.
    Granted,
    /// The user refused.
    Denied,
    /// The host has no notification facility.
    Unsupported,
}

/// A desktop notification to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopNotification {
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
}

impl DesktopNotification {
    /// Notification for an incoming chat message.
    pub fn for_message(message: &ChatMessage) -> Self {
        let body = match message.kind {
            MessageKind::Image => "[Image]".to_string(),
            MessageKind::Text => message.body.clone(),
        };
        Self {
            title: format!("New message from {}", message.author),
            body,
        }
    }
}

/// Desktop notification facility.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send {
    /// Current permission state.
    fn permission(&self) -> NotificationPermission;

    /// Ask for permission. Fire-and-forget: the outcome is not reported.
    fn request_permission(&mut self);

    /// Show a notification. Implementations drop it silently on failure.
    fn show(&mut self, notification: &DesktopNotification);
}

/// Notification sound.
#[cfg_attr(test, mockall::automock)]
pub trait SoundPlayer: Send {
    /// Play the notification sound once.
    fn play(&mut self) -> Result<(), PlatformError>;
}

/// Opens connections.
pub trait Connector: Send {
    /// Start a new connection tagged with `generation`.
    ///
    /// Returns immediately. The connection reports `Connected`, named events
    /// and finally `Disconnected` through whatever channel the connector was
    /// built with, each tagged with `generation`.
    fn open(&mut self, generation: u64) -> Box<dyn Transport>;
}

/// Handle to one open connection.
pub trait Transport: Send {
    /// Queue an event for the server.
    fn emit(&mut self, event: OutboundEvent);

    /// Close the connection. Queued events are flushed first.
    fn close(&mut self);
}

/// The host capabilities a session needs, bundled.
pub struct Platform {
    /// Where session state is rendered.
    pub view: Box<dyn View>,
    /// Desktop notifications.
    pub notifier: Box<dyn Notifier>,
    /// Notification sound.
    pub sound: Box<dyn SoundPlayer>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Timestamp, Username};

    #[test]
    fn test_notification_for_text_and_image() {
        // テスト項目: 画像メッセージの通知本文は "[Image]" になる
        let me = Username::resolve("alice").unwrap();
        let text = ChatMessage::from_author(
            &me,
            "bob".into(),
            "hello".into(),
            MessageKind::Text,
            Timestamp::new(""),
        );
        let image = ChatMessage::from_author(
            &me,
            "bob".into(),
            "/static/uploads/x.png".into(),
            MessageKind::Image,
            Timestamp::new(""),
        );

        assert_eq!(
            DesktopNotification::for_message(&text),
            DesktopNotification {
                title: "New message from bob".into(),
                body: "hello".into()
            }
        );
        assert_eq!(DesktopNotification::for_message(&image).body, "[Image]");
    }

    #[test]
    fn test_icon_toggle() {
        // テスト項目: アイコン状態が交互に切り替わる
        assert_eq!(IconState::Original.toggled(), IconState::Blank);
        assert_eq!(IconState::Blank.toggled(), IconState::Original);
    }
}
