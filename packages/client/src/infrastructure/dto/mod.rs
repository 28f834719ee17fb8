//! Data transfer objects for the named events exchanged with the server.

pub mod event;
