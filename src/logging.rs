//! Logging setup for the CLI.
//!
//! The library only emits `tracing` events; the binary decides where they go.
//! Filter resolution: `COMMENTS_LOG`, then `RUST_LOG`, then the default level
//! (`warn`, or `debug` with `--verbose`). Output goes to stderr so piped
//! command output stays clean.

use std::io::IsTerminal;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Name of the log filter environment variable.
pub const LOG_ENV: &str = "COMMENTS_LOG";

/// Build the log filter from the environment, falling back to a default level.
pub fn build_env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "debug" } else { "warn" };
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber. Safe to call once; later calls are ignored.
pub fn init_logging(verbose: bool) {
    let _ = tracing_subscriber::registry()
        .with(build_env_filter(verbose))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(verbose),
        )
        .try_init();
}
