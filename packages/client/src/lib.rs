//! LAN Chat terminal client.
//!
//! A Socket.IO client for the LAN Chat server: it joins a room, renders the
//! room's messages, member list and typing label, sends text and images, and
//! raises sound, title, icon and desktop notifications while the user is away.

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// Re-export entry point
pub use ui::run_client;
