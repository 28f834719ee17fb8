//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, fmt};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence. Otherwise the binary and the LAN Chat crates
/// log at `default_level`. Output goes to stderr so that stdout stays
/// reserved for the chat view.
///
/// # Arguments
///
/// * `bin_name` - Binary name (`env!("CARGO_BIN_NAME")`)
/// * `default_level` - Level used when `RUST_LOG` is not set (e.g. "info")
pub fn setup_logger(bin_name: &str, default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(bin_name, default_level)));

    let result = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();

    if let Err(e) = result {
        // Already installed (e.g. in tests); keep the existing subscriber.
        tracing::debug!("Logger already initialized: {}", e);
    }
}

fn default_directives(bin_name: &str, level: &str) -> String {
    let bin_target = bin_name.replace('-', "_");
    let mut targets = vec![bin_target.as_str(), "lanchat_client", "lanchat_shared"];
    targets.dedup();

    let mut directives = String::from("warn");
    for target in targets {
        directives.push_str(&format!(",{target}={level}"));
    }
    directives
}
