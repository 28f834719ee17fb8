//! Shared utilities for LAN Chat.
//!
//! Logging setup and timestamp helpers used by the client binary and library.

pub mod logger;
pub mod time;
