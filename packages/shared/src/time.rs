//! Timestamp helpers.
//!
//! The server stamps events with local ISO 8601 time at second precision
//! (`2025-01-01T12:34:56`), without an offset.

use chrono::{DateTime, Local, NaiveDateTime};

const SERVER_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a server timestamp.
///
/// Accepts the server's offset-less format and full RFC 3339.
pub fn parse_server_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, SERVER_FORMAT)
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

/// Format a server timestamp for display, falling back to the raw string.
pub fn format_for_display(raw: &str) -> String {
    match parse_server_timestamp(raw) {
        Some(dt) => dt.format(DISPLAY_FORMAT).to_string(),
        None => raw.to_string(),
    }
}

/// Current local time in the server's format.
pub fn now_server_timestamp() -> String {
    Local::now().naive_local().format(SERVER_FORMAT).to_string()
}
