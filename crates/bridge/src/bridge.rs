//! The scoped bridge resource.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use logging::{targets, trace_bridge};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult, PumpResult};
use crate::executor::{Consumer, ExecutorKind};
use crate::pipe::PipePair;
use crate::pump::{Pump, PumpReport, PumpStrategy};

/// Lifecycle state visible to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BridgeState {
    /// The intake accepts writes and the consumer is running.
    Open,
    /// The consumer has exited and the destination is complete and closed.
    Closed,
}

/// Write end of the bridge's pipe, handed to the producer.
///
/// Writes block once the pipe's kernel buffer is full and resume as the
/// consumer drains it.
#[derive(Debug)]
pub struct Intake {
    file: File,
}

impl Intake {
    /// Duplicates the intake for use as a spawned command's output.
    ///
    /// The clone keeps the pipe open. Every clone, including the one held by
    /// a [`Command`](std::process::Command) until it is dropped, must be
    /// released before the bridge is closed, otherwise closing never sees
    /// end-of-stream.
    pub fn try_clone_stdio(&self) -> io::Result<Stdio> {
        Ok(Stdio::from(self.try_clone_fd()?))
    }

    /// Duplicates the underlying descriptor. The same release rule as for
    /// [`try_clone_stdio`](Self::try_clone_stdio) applies.
    pub fn try_clone_fd(&self) -> io::Result<OwnedFd> {
        self.file.as_fd().try_clone_to_owned()
    }
}

impl Write for Intake {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn write_vectored(&mut self, bufs: &[io::IoSlice<'_>]) -> io::Result<usize> {
        self.file.write_vectored(bufs)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl AsFd for Intake {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl AsRawFd for Intake {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

/// Pipe-backed bridge from a producer to an appended destination file.
///
/// Opening starts the consumer; closing (explicitly, through
/// [`finish`](Self::finish), or on drop) drops the intake and waits for the
/// consumer to exit. After `close` returns, the destination holds every byte
/// written to the intake and has been closed by the consumer.
///
/// Pump failures do not make `close` fail. They are stored and must be read
/// back with [`outcome`](Self::outcome) or [`finish`](Self::finish); data
/// lost to a mid-stream I/O failure is only visible there.
#[derive(Debug)]
pub struct OutputBridge {
    destination: PathBuf,
    strategy: PumpStrategy,
    executor: ExecutorKind,
    intake: Option<Intake>,
    consumer: Option<Consumer>,
    outcome: Option<PumpResult<PumpReport>>,
}

impl OutputBridge {
    /// Opens the destination, creates the pipe, and starts the consumer.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::DestinationUnavailable`] if the destination cannot
    ///   be opened for appending. Nothing else has been created yet.
    /// - [`BridgeError::ResourceExhausted`] if the pipe, thread, or process
    ///   cannot be created. The destination and any pipe ends are closed
    ///   before this returns.
    pub fn open(config: &BridgeConfig) -> BridgeResult<Self> {
        let path = config.destination();
        let destination = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|source| BridgeError::DestinationUnavailable {
                path: path.to_path_buf(),
                source,
            })?;
        let buffer_size = config.resolve_buffer_size(&destination);
        let (read, write) = PipePair::create()?.into_parts();

        let strategy = config.strategy();
        let pump = Pump::new(strategy, read, destination, buffer_size);
        let consumer = Consumer::start(config.executor, pump)?;

        trace_bridge!(
            destination = %path.display(),
            strategy = %strategy,
            executor = %config.executor,
            buffer_size,
            "bridge open"
        );
        Ok(Self {
            destination: path.to_path_buf(),
            strategy,
            executor: config.executor,
            intake: Some(Intake { file: write }),
            consumer: Some(consumer),
            outcome: None,
        })
    }

    /// Destination file path.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Strategy the pump runs.
    pub const fn strategy(&self) -> PumpStrategy {
        self.strategy
    }

    /// Executor hosting the pump.
    pub const fn executor(&self) -> ExecutorKind {
        self.executor
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> BridgeState {
        if self.intake.is_some() {
            BridgeState::Open
        } else {
            BridgeState::Closed
        }
    }

    /// The intake while the bridge is open.
    pub fn intake(&mut self) -> Option<&mut Intake> {
        self.intake.as_mut()
    }

    /// Signals end-of-stream and waits for the consumer to exit.
    ///
    /// Idempotent and infallible; the consumer's outcome is stored for
    /// [`outcome`](Self::outcome).
    pub fn close(&mut self) {
        let Some(intake) = self.intake.take() else {
            return;
        };
        // Dropping the intake is the end-of-stream signal and must precede the
        // wait, or the consumer never leaves its read loop.
        drop(intake);
        trace_bridge!(destination = %self.destination.display(), "intake closed, waiting for consumer");

        if let Some(consumer) = self.consumer.take() {
            let outcome = consumer.wait();
            match &outcome {
                Ok(report) => {
                    trace_bridge!(
                        destination = %self.destination.display(),
                        bytes = report.bytes,
                        writes = report.writes,
                        "bridge closed"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        target: targets::BRIDGE,
                        destination = %self.destination.display(),
                        error = %err,
                        "bridge closed after pump failure"
                    );
                }
            }
            self.outcome = Some(outcome);
        }
    }

    /// The consumer's outcome once the bridge is closed.
    pub const fn outcome(&self) -> Option<&PumpResult<PumpReport>> {
        self.outcome.as_ref()
    }

    /// Closes the bridge and returns the consumer's outcome.
    #[must_use = "pump failures are only reported through the returned result"]
    pub fn finish(mut self) -> PumpResult<PumpReport> {
        self.close();
        self.outcome.take().unwrap_or_else(|| Ok(PumpReport::default()))
    }

    fn open_intake(&mut self) -> io::Result<&mut Intake> {
        self.intake
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "bridge is closed"))
    }
}

impl Write for OutputBridge {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.open_intake()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.open_intake()?.flush()
    }
}

impl Drop for OutputBridge {
    fn drop(&mut self) {
        self.close();
    }
}

/// Runs `body` against an open bridge and closes it afterwards.
///
/// The bridge is closed even if `body` panics. Returns the body's value
/// together with the consumer's outcome.
///
/// ```no_run
/// use std::io::Write;
/// use bridge::{BridgeConfig, run_bridged};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = BridgeConfig::new("/tmp/out.txt");
/// let (written, outcome) = run_bridged(&config, |bridge| bridge.write_all(b"hello\n"))?;
/// written?;
/// outcome?;
/// # Ok(())
/// # }
/// ```
pub fn run_bridged<T, F>(config: &BridgeConfig, body: F) -> BridgeResult<(T, PumpResult<PumpReport>)>
where
    F: FnOnce(&mut OutputBridge) -> T,
{
    let mut bridge = OutputBridge::open(config)?;
    let value = body(&mut bridge);
    Ok((value, bridge.finish()))
}
