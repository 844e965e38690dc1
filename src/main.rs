//! burrow: a Gopher protocol file server
//!
//! Exposes a filesystem subtree to anonymous clients over the Gopher
//! protocol: one selector line per TCP connection, answered with either a
//! directory listing, the named file's contents, or a single Gopher error
//! item, then the connection is drained and closed.
//!
//! Features:
//! - Readiness-based event loop (mio: epoll/kqueue), no thread per connection
//! - Bounded request-line framing against peers that never terminate
//! - Operator-maintained root listing file for empty selectors
//! - Configuration via CLI arguments or TOML file

mod config;
mod hexdump;
mod protocol;
mod runtime;

use config::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        host = %config.host,
        port = config.port,
        root = %config.root.display(),
        listing_file = %config.listing_file,
        workers = config.workers,
        "Starting burrow server"
    );

    runtime::run(config)?;

    Ok(())
}
