//! Forked-process consumer.
//!
//! The child runs only the pump loop, writes a JSON report describing the
//! outcome to a dedicated pipe, and leaves with `_exit`. The parent keeps the
//! child's pid and the read end of the report pipe; everything the child owns
//! (the pipe's read end, the destination, the report write end) is closed in
//! the parent right after the fork.
//!
//! Waiting is mandatory. [`ProcessConsumer::wait`] blocks in `waitpid` until
//! the child is gone, so a closed bridge never has writes still in flight.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::panic::{self, AssertUnwindSafe};

use logging::trace_exec;
use nix::errno::Errno;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult, PumpError, PumpResult};
use crate::pipe::PipePair;
use crate::pump::{Pump, PumpReport};

/// Exit status of a child whose pump failed with an I/O error.
const EXIT_PUMP_FAILED: i32 = 1;
/// Exit status of a child whose pump panicked.
const EXIT_PANICKED: i32 = 101;
/// Upper bound for the descriptor sweep when `close_range` is unavailable.
const SWEEP_LIMIT: RawFd = 65_536;

#[derive(Debug)]
pub(crate) struct ProcessConsumer {
    pid: Pid,
    report: File,
}

impl ProcessConsumer {
    pub(crate) fn spawn(pump: Pump) -> BridgeResult<Self> {
        let (report_read, report_write) = PipePair::create()?.into_parts();

        // SAFETY: the child only runs the pump loop, serializes its report and
        // calls `_exit`. It never returns into the caller's code, never runs
        // destructors for state it inherited, and never touches the tracing
        // subscriber, whose locks may have been held by another thread at the
        // time of the fork.
        match unsafe { fork() } {
            Err(errno) => Err(BridgeError::resource("consumer process", errno)),
            Ok(ForkResult::Child) => consumer_main(pump, report_write),
            Ok(ForkResult::Parent { child }) => {
                drop(pump);
                drop(report_write);
                trace_exec!(pid = child.as_raw(), "consumer process started");
                Ok(Self {
                    pid: child,
                    report: report_read,
                })
            }
        }
    }

    pub(crate) fn wait(mut self) -> PumpResult<PumpReport> {
        let pid = self.pid.as_raw();
        let status = wait_for_exit(self.pid).map_err(|errno| PumpError::ConsumerLost {
            pid,
            source: errno.into(),
        })?;
        trace_exec!(pid, status = %describe(status), "consumer process exited");

        // The child has exited, so this read sees end-of-stream immediately.
        let mut raw = Vec::new();
        self.report
            .read_to_end(&mut raw)
            .map_err(|err| PumpError::MalformedReport {
                pid,
                reason: err.to_string(),
            })?;
        if raw.is_empty() {
            return Err(PumpError::ConsumerTerminated {
                pid,
                status: describe(status),
            });
        }
        let report: Report =
            serde_json::from_slice(&raw).map_err(|err| PumpError::MalformedReport {
                pid,
                reason: err.to_string(),
            })?;
        report.into_result(pid)
    }
}

/// Body of the forked child. Never returns.
fn consumer_main(pump: Pump, mut report_channel: File) -> ! {
    let [source, destination] = pump.descriptors();
    let mut keep = [
        source.as_raw_fd(),
        destination.as_raw_fd(),
        report_channel.as_raw_fd(),
    ];
    close_inherited_descriptors(&mut keep);

    let (report, code) = match panic::catch_unwind(AssertUnwindSafe(|| pump.run())) {
        Ok(Ok(summary)) => (Report::Completed(summary), 0),
        Ok(Err(err)) => (Report::from_error(&err), EXIT_PUMP_FAILED),
        Err(_) => (Report::Panicked, EXIT_PANICKED),
    };
    if let Ok(encoded) = serde_json::to_vec(&report) {
        // A failed write leaves the report empty; the parent then reports the
        // exit status instead.
        let _ = report_channel.write_all(&encoded);
    }
    // SAFETY: `_exit` skips atexit handlers and destructors, which belong to
    // the parent's state and must not run in the child.
    unsafe { libc::_exit(code) }
}

/// Closes every descriptor above stdio except those in `keep`.
///
/// Without this, the child would hold copies of the intakes of every other
/// bridge open in the parent, and those bridges could not reach end-of-stream
/// until this child exits.
fn close_inherited_descriptors(keep: &mut [RawFd]) {
    keep.sort_unstable();
    let mut next: RawFd = 3;
    for &fd in keep.iter() {
        if fd >= next {
            close_range(next, fd - 1);
            next = fd + 1;
        }
    }
    close_range(next, RawFd::MAX);
}

#[cfg(target_os = "linux")]
fn close_range(first: RawFd, last: RawFd) {
    if first > last {
        return;
    }
    // SAFETY: close_range only affects this process's descriptor table; none
    // of the descriptors in the range are used again by the child.
    let rc = unsafe {
        libc::syscall(
            libc::SYS_close_range,
            first as libc::c_uint,
            last as libc::c_uint,
            0 as libc::c_uint,
        )
    };
    if rc != 0 {
        close_each(first, last);
    }
}

#[cfg(not(target_os = "linux"))]
fn close_range(first: RawFd, last: RawFd) {
    close_each(first, last);
}

fn close_each(first: RawFd, last: RawFd) {
    // SAFETY: sysconf has no preconditions.
    let open_max = unsafe { libc::sysconf(libc::_SC_OPEN_MAX) };
    let limit = if open_max > 0 {
        RawFd::try_from(open_max).unwrap_or(SWEEP_LIMIT).min(SWEEP_LIMIT)
    } else {
        SWEEP_LIMIT
    };
    for fd in first..=last.min(limit - 1) {
        // SAFETY: closing an unused or already-closed descriptor is harmless;
        // EBADF is expected for most of the range.
        unsafe {
            libc::close(fd);
        }
    }
}

fn wait_for_exit(pid: Pid) -> Result<WaitStatus, Errno> {
    loop {
        match waitpid(pid, None) {
            Err(Errno::EINTR) => {}
            Ok(status @ (WaitStatus::Exited(..) | WaitStatus::Signaled(..))) => return Ok(status),
            Ok(_) => {}
            Err(errno) => return Err(errno),
        }
    }
}

fn describe(status: WaitStatus) -> String {
    match status {
        WaitStatus::Exited(_, code) => format!("exit status {code}"),
        WaitStatus::Signaled(_, signal, core) => {
            if core {
                format!("killed by {signal} (core dumped)")
            } else {
                format!("killed by {signal}")
            }
        }
        other => format!("{other:?}"),
    }
}

/// Which side of the pump failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Stage {
    Read,
    Write,
}

/// Outcome sent from the child to the parent over the report pipe.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
enum Report {
    Completed(PumpReport),
    Failed {
        stage: Stage,
        bytes: u64,
        errno: Option<i32>,
        message: String,
    },
    Aborted {
        message: String,
    },
    Panicked,
}

impl Report {
    fn from_error(err: &PumpError) -> Self {
        match err {
            PumpError::Read { bytes, source } => Self::failed(Stage::Read, *bytes, source),
            PumpError::Write { bytes, source } => Self::failed(Stage::Write, *bytes, source),
            other => Self::Aborted {
                message: other.to_string(),
            },
        }
    }

    fn failed(stage: Stage, bytes: u64, source: &io::Error) -> Self {
        Self::Failed {
            stage,
            bytes,
            errno: source.raw_os_error(),
            message: source.to_string(),
        }
    }

    fn into_result(self, pid: i32) -> PumpResult<PumpReport> {
        match self {
            Self::Completed(summary) => Ok(summary),
            Self::Failed {
                stage,
                bytes,
                errno,
                message,
            } => {
                let source = errno.map_or_else(|| io::Error::other(message), io::Error::from_raw_os_error);
                Err(match stage {
                    Stage::Read => PumpError::Read { bytes, source },
                    Stage::Write => PumpError::Write { bytes, source },
                })
            }
            Self::Aborted { message } => Err(PumpError::ConsumerTerminated {
                pid,
                status: message,
            }),
            Self::Panicked => Err(PumpError::ConsumerPanicked),
        }
    }
}
