//! Error types for bridge construction and pump execution.
//!
//! Errors split along the point at which the caller learns about them:
//!
//! - [`BridgeError`] is returned synchronously from
//!   [`OutputBridge::open`](crate::OutputBridge::open). When it is returned,
//!   no consumer is running and every partially created resource has been
//!   released.
//! - [`PumpError`] is produced inside the consumer and only becomes visible
//!   after the bridge is closed.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for bridge construction.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Result type for pump execution.
pub type PumpResult<T> = Result<T, PumpError>;

/// Errors raised while opening a bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The destination could not be opened for appending.
    #[error("cannot open {} for appending: {source}", path.display())]
    DestinationUnavailable {
        /// Destination that failed to open.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The operating system refused to allocate a pipe, thread, or process.
    #[error("cannot create {resource}: {source}")]
    ResourceExhausted {
        /// Which resource could not be created.
        resource: &'static str,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A signed buffer size other than `-1` or a positive value.
    #[error("invalid buffer size {0}: expected a positive size or -1 for the block size")]
    InvalidBufferSize(i64),
}

impl BridgeError {
    pub(crate) fn resource(resource: &'static str, source: impl Into<io::Error>) -> Self {
        Self::ResourceExhausted {
            resource,
            source: source.into(),
        }
    }
}

/// Errors raised by the consumer while draining the pipe.
///
/// [`Read`](Self::Read) and [`Write`](Self::Write) are the I/O failures of
/// the pump itself; the remaining variants describe a consumer that failed
/// to report at all.
#[derive(Debug, Error)]
pub enum PumpError {
    /// Reading from the pipe failed.
    #[error("reading from the intake pipe failed after {bytes} bytes: {source}")]
    Read {
        /// Bytes persisted to the destination before the failure.
        bytes: u64,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Writing or flushing the destination failed.
    #[error("writing to the destination failed after {bytes} bytes: {source}")]
    Write {
        /// Bytes persisted to the destination before the failure.
        bytes: u64,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The consumer thread panicked.
    #[error("pump thread panicked")]
    ConsumerPanicked,

    /// The consumer process exited without a usable report.
    #[error("consumer process {pid} terminated abnormally ({status})")]
    ConsumerTerminated {
        /// Process id of the consumer.
        pid: i32,
        /// Human-readable exit status.
        status: String,
    },

    /// Waiting for the consumer process failed.
    #[error("cannot wait for consumer process {pid}: {source}")]
    ConsumerLost {
        /// Process id of the consumer.
        pid: i32,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The consumer process wrote a report that could not be decoded.
    #[error("consumer process {pid} sent a malformed report: {reason}")]
    MalformedReport {
        /// Process id of the consumer.
        pid: i32,
        /// Decoder diagnostic.
        reason: String,
    },
}

impl PumpError {
    /// Returns `true` for read and write failures of the pump loop.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Write { .. })
    }

    /// Bytes persisted before a read or write failure.
    #[must_use]
    pub const fn bytes_persisted(&self) -> Option<u64> {
        match self {
            Self::Read { bytes, .. } | Self::Write { bytes, .. } => Some(*bytes),
            _ => None,
        }
    }
}
