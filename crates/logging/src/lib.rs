#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` wires the workspace's diagnostics into the [`tracing`]
//! ecosystem. It owns three things:
//!
//! - [`VerbosityConfig`], the counted `-v` level plus the program name used to
//!   label diagnostics;
//! - [`init_tracing`] / [`try_init_tracing`], which install a
//!   `tracing-subscriber` `fmt` layer on stderr filtered by the verbosity
//!   level or the `SINK_LOG` environment variable;
//! - target-scoped macros ([`trace_bridge!`], [`trace_exec!`]) so each
//!   subsystem logs under a stable target.
//!
//! # Invariants
//!
//! - Nothing here is process-global except the subscriber itself; the
//!   program name travels inside [`VerbosityConfig`].
//! - Installing a subscriber twice is reported, never a panic.
//!
//! # Examples
//!
//! ```
//! use logging::{VerbosityConfig, filter_directive};
//!
//! let config = VerbosityConfig::from_verbose_level(2).with_program("sink");
//! assert_eq!(filter_directive(config.level), "debug");
//! assert_eq!(config.program, "sink");
//! ```

mod config;
mod subscriber;
mod tracing_macros;

pub use config::VerbosityConfig;
pub use subscriber::{LOG_ENV, filter_directive, init_tracing, try_init_tracing};

/// Tracing targets used across the workspace.
pub mod targets {
    /// Bridge lifecycle: open and close.
    pub const BRIDGE: &str = "sink::bridge";
    /// Consumer executors: thread and process management.
    pub const EXEC: &str = "sink::exec";
    /// Command-line front end.
    pub const CLI: &str = "sink::cli";
}
