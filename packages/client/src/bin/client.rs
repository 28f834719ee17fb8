//! LAN Chat terminal client.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin lanchat-client -- --server http://192.168.1.2:2333 -u alice --connect
//! ```

use clap::Parser;
use lanchat_client::config::{Args, ClientConfig};
use lanchat_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    // Run the client
    if let Err(e) = lanchat_client::run_client(ClientConfig::from(args)).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
