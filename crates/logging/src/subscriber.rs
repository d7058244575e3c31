//! crates/logging/src/subscriber.rs
//! Subscriber installation.
//!
//! Events are formatted by `tracing-subscriber`'s `fmt` layer on stderr and
//! filtered by an [`EnvFilter`]. The filter comes from [`LOG_ENV`] when that
//! variable is set and otherwise from the verbosity level:
//!
//! | `-v` count | directive |
//! |---|---|
//! | 0 | `warn` |
//! | 1 | `info` |
//! | 2 | `debug` |
//! | 3+ | `trace` |

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use super::config::VerbosityConfig;

/// Environment variable that overrides the verbosity-derived filter.
pub const LOG_ENV: &str = "SINK_LOG";

/// Maps a `-v` count onto an `EnvFilter` directive.
pub const fn filter_directive(level: u8) -> &'static str {
    match level {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn build_filter(config: &VerbosityConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(filter_directive(config.level)))
}

/// Installs the global subscriber.
///
/// Returns `false` if a subscriber was already installed.
///
/// ```rust,ignore
/// use logging::{VerbosityConfig, try_init_tracing};
///
/// let config = VerbosityConfig::from_verbose_level(1).with_program("sink");
/// try_init_tracing(&config);
/// tracing::info!(target: "sink::cli", "running");
/// ```
pub fn try_init_tracing(config: &VerbosityConfig) -> bool {
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.level >= 2);

    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(fmt)
        .try_init()
        .is_ok()
}

/// Installs the global subscriber, ignoring an already-installed one.
pub fn init_tracing(config: &VerbosityConfig) {
    let _ = try_init_tracing(config);
}
