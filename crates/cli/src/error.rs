//! crates/cli/src/error.rs
//! Failures of `sink` itself, as opposed to failures of the command it runs.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

use bridge::{BridgeError, PumpError};
use thiserror::Error;

use crate::exit_code;

/// Error raised while bridging a command's output.
#[derive(Debug, Error)]
pub enum CliError {
    /// The bridge could not be opened.
    #[error(transparent)]
    Open(#[from] BridgeError),

    /// The command could not be started.
    #[error("failed to run {}: {source}", program.to_string_lossy())]
    Launch {
        /// Program that failed to start.
        program: OsString,
        /// Underlying error from the spawn.
        #[source]
        source: io::Error,
    },

    /// The consumer did not persist all of the command's output.
    #[error("output to {} is incomplete: {source}", path.display())]
    Pump {
        /// Destination being written.
        path: PathBuf,
        /// Failure reported by the consumer.
        #[source]
        source: PumpError,
    },
}

impl CliError {
    /// Exit code reported for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Open(BridgeError::DestinationUnavailable { .. }) => exit_code::CANT_CREATE,
            Self::Open(BridgeError::InvalidBufferSize(_)) => exit_code::USAGE,
            Self::Open(BridgeError::ResourceExhausted { .. }) => exit_code::OS_ERROR,
            Self::Launch { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                exit_code::NOT_FOUND
            }
            Self::Launch { .. } => exit_code::NOT_EXECUTABLE,
            Self::Pump { .. } => exit_code::IO_ERROR,
        }
    }
}
