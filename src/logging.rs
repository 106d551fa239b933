// src/logging.rs
//! Logging setup for the command-line front end
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the binary. `RUST_LOG` overrides the default filter.

use tracing_subscriber::EnvFilter;

/// Default filter directive for the given verbosity
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "geometa=debug"
    } else {
        "geometa=info"
    }
}

/// Install a global subscriber writing to stderr.
///
/// Stdout stays free for command output. Calling this twice is harmless;
/// the second subscriber is ignored.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
