//! Command-line configuration.

use clap::{Parser, ValueEnum};

use crate::{domain::NotificationPermission, usecase::SessionSettings};

/// Terminal client for LAN Chat.
#[derive(Debug, Clone, Parser)]
#[command(name = "lanchat-client", version, about)]
pub struct Args {
    /// Chat server base URL
    #[arg(long, default_value = "http://127.0.0.1:2333")]
    pub server: String,

    /// Username to join with (blank means "Guest")
    #[arg(short, long, default_value = "")]
    pub username: String,

    /// Room to join (blank means "public")
    #[arg(short, long, default_value = "")]
    pub room: String,

    /// Connect immediately instead of waiting for /connect
    #[arg(long)]
    pub connect: bool,

    /// Initial desktop notification permission
    #[arg(long, value_enum, default_value_t = NotificationMode::Ask)]
    pub notifications: NotificationMode,

    /// Do not write title, icon or notification escape sequences
    #[arg(long)]
    pub no_escapes: bool,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// How desktop notifications start out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NotificationMode {
    /// Ask on the first connect
    Ask,
    /// Already allowed
    Enabled,
    /// Refused
    Disabled,
}

impl NotificationMode {
    /// Permission the notifier starts with.
    pub fn initial_permission(self) -> NotificationPermission {
        match self {
            Self::Ask => NotificationPermission::Default,
            Self::Enabled => NotificationPermission::Granted,
            Self::Disabled => NotificationPermission::Denied,
        }
    }
}

/// Resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Chat server base URL
    pub server: String,
    /// Initial username field value
    pub username: String,
    /// Initial room field value
    pub room: String,
    /// Connect at startup
    pub connect_on_start: bool,
    /// Initial notification permission
    pub notifications: NotificationMode,
    /// Whether terminal escape sequences may be written
    pub escapes: bool,
    /// Session timers and title
    pub session: SessionSettings,
}

impl From<Args> for ClientConfig {
    fn from(args: Args) -> Self {
        Self {
            server: args.server,
            username: args.username,
            room: args.room,
            connect_on_start: args.connect,
            notifications: args.notifications,
            escapes: !args.no_escapes,
            session: SessionSettings::default(),
        }
    }
}
