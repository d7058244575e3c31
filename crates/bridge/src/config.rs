//! Bridge construction parameters.

use std::fs::File;
use std::num::NonZeroUsize;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};
use crate::executor::ExecutorKind;
use crate::pump::PumpStrategy;

/// Block size used when the destination does not report a preferred one.
pub const DEFAULT_BLOCK_SIZE: usize = 8 * 1024;

/// Configuration for an [`OutputBridge`](crate::OutputBridge).
///
/// ```
/// use bridge::{BridgeConfig, ExecutorKind, PumpStrategy};
///
/// let config = BridgeConfig::new("out.dat")
///     .binary(true)
///     .single_write(true)
///     .executor(ExecutorKind::Process);
///
/// assert_eq!(config.strategy(), PumpStrategy::BinaryBuffered);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// File the consumer appends to. Created if missing.
    pub destination: PathBuf,
    /// Treat the stream as raw bytes instead of lines.
    #[serde(default)]
    pub binary: bool,
    /// Transfer buffer size; `None` uses the destination's block size.
    #[serde(default)]
    pub buffer_size: Option<NonZeroUsize>,
    /// Accumulate the whole stream and write it with a single call.
    #[serde(default)]
    pub single_write: bool,
    /// Where the pump runs.
    #[serde(default)]
    pub executor: ExecutorKind,
}

impl BridgeConfig {
    /// Creates a text-mode, streaming, thread-backed configuration.
    #[must_use]
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            binary: false,
            buffer_size: None,
            single_write: false,
            executor: ExecutorKind::Thread,
        }
    }

    /// Selects binary (`true`) or text (`false`) mode.
    pub fn binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }

    /// Overrides the transfer buffer size.
    pub fn buffer_size(mut self, size: Option<NonZeroUsize>) -> Self {
        self.buffer_size = size;
        self
    }

    /// Selects whole-buffer (`true`) or streaming (`false`) pumping.
    pub fn single_write(mut self, single_write: bool) -> Self {
        self.single_write = single_write;
        self
    }

    /// Selects the consumer executor.
    pub fn executor(mut self, executor: ExecutorKind) -> Self {
        self.executor = executor;
        self
    }

    /// Returns the destination path.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Resolves the pump strategy selected by the mode flags.
    pub const fn strategy(&self) -> PumpStrategy {
        PumpStrategy::from_flags(self.binary, self.single_write)
    }

    /// Resolves the buffer size against an opened destination.
    pub(crate) fn resolve_buffer_size(&self, destination: &File) -> usize {
        if let Some(size) = self.buffer_size {
            return size.get();
        }
        destination
            .metadata()
            .ok()
            .and_then(|meta| usize::try_from(meta.blksize()).ok())
            .filter(|&size| size > 0)
            .unwrap_or(DEFAULT_BLOCK_SIZE)
    }
}

/// Converts a signed buffer size where `-1` selects the block size.
///
/// ```
/// use bridge::buffer_size_from_signed;
///
/// assert_eq!(buffer_size_from_signed(-1).unwrap(), None);
/// assert_eq!(buffer_size_from_signed(1).unwrap().map(|n| n.get()), Some(1));
/// assert!(buffer_size_from_signed(0).is_err());
/// ```
pub fn buffer_size_from_signed(value: i64) -> BridgeResult<Option<NonZeroUsize>> {
    if value == -1 {
        return Ok(None);
    }
    usize::try_from(value)
        .ok()
        .and_then(NonZeroUsize::new)
        .map(Some)
        .ok_or(BridgeError::InvalidBufferSize(value))
}
