//! Asynchronous output bridge.
//!
//! This crate decouples a producer's output stream from the file it is
//! ultimately written to. The producer writes into the write end of an
//! anonymous pipe (the *intake*) as if it were an ordinary output handle,
//! while a consumer drains the read end into a destination file opened in
//! append mode.
//!
//! # Architecture
//!
//! - [`pipe`] creates the close-on-exec endpoint pair.
//! - [`pump`] drains the read end into the destination using one of four
//!   [`PumpStrategy`] variants (binary or text, streaming or buffered).
//! - [`executor`] hosts the pump either on a background thread or inside a
//!   forked child process.
//! - [`OutputBridge`] orchestrates the above and owns the intake for its
//!   open lifetime.
//!
//! # Ordering guarantee
//!
//! Every byte written to the intake before [`OutputBridge::close`] is called
//! is persisted to the destination before `close` returns. `close` first
//! drops the intake (the only end-of-stream signal) and then blocks until
//! the consumer has exited, whichever executor is in use.
//!
//! # Errors
//!
//! Failures to open the destination or to create the pipe, thread, or child
//! process surface synchronously from [`OutputBridge::open`] as
//! [`BridgeError`]. Failures while draining are reported out-of-band as
//! [`PumpError`] and must be retrieved with [`OutputBridge::finish`] or
//! [`OutputBridge::outcome`]; a caller that never inspects the outcome
//! silently loses data on a mid-stream I/O failure.
//!
//! # Example
//!
//! ```no_run
//! use std::io::Write;
//! use bridge::{BridgeConfig, OutputBridge};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BridgeConfig::new("/tmp/build.log");
//! let mut bridge = OutputBridge::open(&config)?;
//! bridge.write_all(b"April is the cruellest month\n")?;
//! let report = bridge.finish()?;
//! assert_eq!(report.bytes, 29);
//! # Ok(())
//! # }
//! ```

#![cfg(unix)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

mod bridge;
pub mod config;
pub mod error;
pub mod executor;
pub mod pipe;
pub mod pump;

pub use bridge::{BridgeState, Intake, OutputBridge, run_bridged};
pub use config::{BridgeConfig, DEFAULT_BLOCK_SIZE, buffer_size_from_signed};
pub use error::{BridgeError, BridgeResult, PumpError, PumpResult};
pub use executor::ExecutorKind;
pub use pump::{PumpReport, PumpStrategy};
