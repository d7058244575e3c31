//! crates/cli/src/exit_code.rs
//! Exit codes reported by `sink` itself.
//!
//! When the command runs to completion its own status wins; these codes
//! describe failures of the bridge or of the launch. Values follow
//! `sysexits.h` where one fits and the shell's conventions for launch
//! failures.

use std::process::{ExitCode, ExitStatus};

/// Success.
pub const OK: i32 = 0;
/// Command-line usage error.
pub const USAGE: i32 = 2;
/// Pipe, thread, or consumer process could not be created (`EX_OSERR`).
pub const OS_ERROR: i32 = 71;
/// Destination could not be opened (`EX_CANTCREAT`).
pub const CANT_CREATE: i32 = 73;
/// Output was not fully persisted (`EX_IOERR`).
pub const IO_ERROR: i32 = 74;
/// Command was found but could not be executed.
pub const NOT_EXECUTABLE: i32 = 126;
/// Command was not found.
pub const NOT_FOUND: i32 = 127;

/// Offset added to a signal number when the command was killed.
const SIGNAL_BASE: i32 = 128;

/// Maximum exit code representable by a Unix process.
const MAX_EXIT_CODE: i32 = u8::MAX as i32;

/// Maps a finished command's status onto a shell-style exit code.
pub fn from_status(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => SIGNAL_BASE + signal,
        (None, None) => NOT_EXECUTABLE,
    }
}

/// Converts a numeric exit code into an [`ExitCode`].
#[must_use]
pub fn exit_code_from(status: i32) -> ExitCode {
    ExitCode::from(clamp(status))
}

fn clamp(status: i32) -> u8 {
    u8::try_from(status.clamp(0, MAX_EXIT_CODE)).unwrap_or(u8::MAX)
}
