//! Logging setup for the `diagtree` binary.
//!
//! The library only emits `tracing` events; this module installs the
//! subscriber that prints them. Output goes to stderr so that stdout stays
//! machine-readable for `--json`.
//!
//! # Log Levels
//!
//! - `warn`: rejected transitions, ignored configuration values
//! - `info`: subgroup entry and verdicts, exports
//! - `debug`: every transition, rule loading counts
//! - `trace`: everything else

use std::io;

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Map a `-v` count to a level.
///
/// - 0: warn
/// - 1 (`-v`): info
/// - 2 (`-vv`): debug
/// - 3+ (`-vvv`): trace
pub fn level_for_verbosity(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Build an `EnvFilter` for `level`, letting `RUST_LOG` override it.
fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Other crates stay at warn
        EnvFilter::new(format!(
            "warn,diagtree={level}",
            level = level.as_str().to_lowercase()
        ))
    })
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed.
pub fn init_logging(verbosity: u8) -> bool {
    let filter = build_env_filter(level_for_verbosity(verbosity));
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time();

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .is_ok()
}
