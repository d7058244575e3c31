//! Shared test utilities for the sink workspace.
//!
//! Helpers for scratch destinations and for observing process-wide resources
//! (open descriptors, live threads) around bridge lifecycles. The resource
//! counters read `/proc/self` and return `None` where it is unavailable, so
//! callers should skip their assertions rather than fail.

use std::fs;
use std::io;
use std::path::PathBuf;

use tempfile::TempDir;

/// A scratch directory with a destination path inside it.
///
/// The directory, and the destination with it, is removed on drop.
#[derive(Debug)]
pub struct ScratchDestination {
    dir: TempDir,
    path: PathBuf,
}

impl ScratchDestination {
    /// Creates a fresh directory and names `file_name` inside it. The file
    /// itself is not created.
    pub fn new(file_name: &str) -> io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(file_name);
        Ok(Self { dir, path })
    }

    /// Destination path.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// A path whose parent directory does not exist.
    pub fn unreachable(&self) -> PathBuf {
        self.dir.path().join("missing").join("nested").join("out.log")
    }

    /// Reads the destination as bytes.
    pub fn read(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }

    /// Reads the destination as UTF-8 text.
    pub fn read_to_string(&self) -> io::Result<String> {
        fs::read_to_string(&self.path)
    }
}

/// Number of descriptors open in this process.
pub fn open_descriptor_count() -> Option<usize> {
    count_entries("/proc/self/fd")
}

/// Number of threads in this process.
pub fn thread_count() -> Option<usize> {
    count_entries("/proc/self/task")
}

fn count_entries(dir: &str) -> Option<usize> {
    fs::read_dir(dir).ok().map(Iterator::count)
}

/// Deterministic byte pattern of `len` bytes.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31 + 7) % 251) as u8).collect()
}
