//! Anonymous pipe endpoint pair.
//!
//! Both ends are created close-on-exec so that commands spawned while a
//! bridge is open do not inherit the intake by accident. A stray copy of the
//! write end held by an unrelated process would keep the pipe open and the
//! consumer would never observe end-of-stream.

use std::fs::File;
use std::os::fd::OwnedFd;

use crate::error::{BridgeError, BridgeResult};

/// Read and write ends of an anonymous pipe.
///
/// Each end is an independently owned descriptor and is closed when dropped.
/// Dropping the write end is the only end-of-stream signal a blocking reader
/// on the read end can observe.
#[derive(Debug)]
pub struct PipePair {
    /// End drained by the consumer.
    pub read: File,
    /// End handed to the producer.
    pub write: File,
}

impl PipePair {
    /// Creates a close-on-exec pipe.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ResourceExhausted`] when the descriptor table
    /// or the kernel's pipe accounting is exhausted.
    pub fn create() -> BridgeResult<Self> {
        let (read, write) = pipe_cloexec().map_err(|errno| BridgeError::resource("pipe", errno))?;
        Ok(Self {
            read: File::from(read),
            write: File::from(write),
        })
    }

    /// Splits the pair into `(read, write)`.
    pub fn into_parts(self) -> (File, File) {
        (self.read, self.write)
    }
}

#[cfg(not(any(target_os = "macos", target_os = "ios")))]
fn pipe_cloexec() -> Result<(OwnedFd, OwnedFd), nix::Error> {
    nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC)
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
fn pipe_cloexec() -> Result<(OwnedFd, OwnedFd), nix::Error> {
    use nix::fcntl::{FcntlArg, FdFlag, fcntl};
    use std::os::fd::AsRawFd;

    let (read, write) = nix::unistd::pipe()?;
    for fd in [&read, &write] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    Ok((read, write))
}
