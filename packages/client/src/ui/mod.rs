//! Terminal host: line input, terminal rendering and the runtime loop.

pub mod input;
mod runner;
pub mod terminal;

pub use runner::run_client;
