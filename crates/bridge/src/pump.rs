//! Pipe-draining loop and its four strategies.
//!
//! A pump owns both the read end of the pipe and the destination for its
//! entire run and releases both when it returns, on every exit path. It never
//! retries: the first read or write failure ends the run and is returned as a
//! [`PumpError`].
//!
//! The pump does not log. It may run inside a forked child where the
//! subscriber's locks are in an undefined state; the executor reports on its
//! behalf.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{PumpError, PumpResult};

/// How the pump moves data from the pipe into the destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PumpStrategy {
    /// Read up to a buffer's worth at a time and write it immediately.
    BinaryStreaming,
    /// Read to end-of-stream, then write everything with a single call.
    BinaryBuffered,
    /// Write and flush each line as soon as it is complete.
    TextStreaming,
    /// Collect every line, then write the joined text once and flush once.
    TextBuffered,
}

impl PumpStrategy {
    /// Maps the `binary` and `single_write` flags onto a strategy.
    pub const fn from_flags(binary: bool, single_write: bool) -> Self {
        match (binary, single_write) {
            (true, false) => Self::BinaryStreaming,
            (true, true) => Self::BinaryBuffered,
            (false, false) => Self::TextStreaming,
            (false, true) => Self::TextBuffered,
        }
    }

    /// Returns `true` for the binary strategies.
    pub const fn is_binary(self) -> bool {
        matches!(self, Self::BinaryStreaming | Self::BinaryBuffered)
    }

    /// Returns `true` for the single-write strategies.
    pub const fn is_buffered(self) -> bool {
        matches!(self, Self::BinaryBuffered | Self::TextBuffered)
    }

    /// Short name used in diagnostics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BinaryStreaming => "binary-streaming",
            Self::BinaryBuffered => "binary-buffered",
            Self::TextStreaming => "text-streaming",
            Self::TextBuffered => "text-buffered",
        }
    }
}

impl std::fmt::Display for PumpStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a completed pump run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PumpReport {
    /// Bytes persisted to the destination.
    pub bytes: u64,
    /// Write calls issued against the destination.
    pub writes: u64,
    /// Lines seen by a text strategy; always zero in binary mode.
    pub lines: u64,
}

/// A pump bound to a pipe read end and a destination file.
#[derive(Debug)]
pub struct Pump {
    strategy: PumpStrategy,
    source: File,
    destination: File,
    buffer_size: usize,
}

impl Pump {
    /// Binds a strategy to its input and output handles.
    pub fn new(strategy: PumpStrategy, source: File, destination: File, buffer_size: usize) -> Self {
        Self {
            strategy,
            source,
            destination,
            buffer_size: buffer_size.max(1),
        }
    }

    /// Strategy this pump runs.
    pub const fn strategy(&self) -> PumpStrategy {
        self.strategy
    }

    /// Handles that must survive in a forked consumer.
    pub(crate) fn descriptors(&self) -> [&File; 2] {
        [&self.source, &self.destination]
    }

    /// Drains the pipe to end-of-stream, consuming the pump.
    ///
    /// Both handles are closed before this returns.
    pub fn run(self) -> PumpResult<PumpReport> {
        let Self {
            strategy,
            source,
            destination,
            buffer_size,
        } = self;
        drain(strategy, source, destination, buffer_size)
    }
}

/// Drains `source` into `destination` with the given strategy.
///
/// Takes both handles by value so they are dropped when the run ends.
pub fn drain<R: Read, W: Write>(
    strategy: PumpStrategy,
    source: R,
    destination: W,
    buffer_size: usize,
) -> PumpResult<PumpReport> {
    let buffer_size = buffer_size.max(1);
    let mut sink = CountingSink::new(destination);
    match strategy {
        PumpStrategy::BinaryStreaming => binary_streaming(source, &mut sink, buffer_size)?,
        PumpStrategy::BinaryBuffered => binary_buffered(source, &mut sink, buffer_size)?,
        PumpStrategy::TextStreaming => text_streaming(source, &mut sink, buffer_size)?,
        PumpStrategy::TextBuffered => text_buffered(source, &mut sink, buffer_size)?,
    }
    // Text strategies flush on their own schedule.
    if strategy.is_binary() {
        sink.flush()?;
    }
    Ok(sink.report)
}

fn binary_streaming<R: Read, W: Write>(
    mut source: R,
    sink: &mut CountingSink<W>,
    buffer_size: usize,
) -> PumpResult<()> {
    let mut buf = vec![0u8; buffer_size];
    while let Some(n) = read_chunk(&mut source, &mut buf, sink.report.bytes)? {
        sink.write(&buf[..n])?;
    }
    Ok(())
}

fn binary_buffered<R: Read, W: Write>(
    mut source: R,
    sink: &mut CountingSink<W>,
    buffer_size: usize,
) -> PumpResult<()> {
    let mut buf = vec![0u8; buffer_size];
    let mut collected = Vec::new();
    while let Some(n) = read_chunk(&mut source, &mut buf, 0)? {
        collected.extend_from_slice(&buf[..n]);
    }
    if !collected.is_empty() {
        sink.write(&collected)?;
    }
    Ok(())
}

fn text_streaming<R: Read, W: Write>(
    source: R,
    sink: &mut CountingSink<W>,
    buffer_size: usize,
) -> PumpResult<()> {
    let mut reader = BufReader::with_capacity(buffer_size, source);
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .map_err(|source| sink.read_error(source))?;
        if n == 0 {
            return Ok(());
        }
        sink.report.lines += 1;
        sink.write(&line)?;
        sink.flush()?;
    }
}

fn text_buffered<R: Read, W: Write>(
    source: R,
    sink: &mut CountingSink<W>,
    buffer_size: usize,
) -> PumpResult<()> {
    let mut reader = BufReader::with_capacity(buffer_size, source);
    let mut lines: Vec<Vec<u8>> = Vec::new();
    loop {
        let mut line = Vec::new();
        let n = reader.read_until(b'\n', &mut line).map_err(|source| PumpError::Read {
            bytes: 0,
            source,
        })?;
        if n == 0 {
            break;
        }
        lines.push(line);
    }
    sink.report.lines = lines.len() as u64;
    if !lines.is_empty() {
        sink.write(&lines.concat())?;
    }
    sink.flush()
}

/// Reads one chunk, retrying on `EINTR`. `Ok(None)` is end-of-stream.
fn read_chunk<R: Read>(source: &mut R, buf: &mut [u8], persisted: u64) -> PumpResult<Option<usize>> {
    loop {
        match source.read(buf) {
            Ok(0) => return Ok(None),
            Ok(n) => return Ok(Some(n)),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(source) => {
                return Err(PumpError::Read {
                    bytes: persisted,
                    source,
                });
            }
        }
    }
}

/// Destination wrapper that tallies the report and tags write failures.
struct CountingSink<W> {
    inner: W,
    report: PumpReport,
}

impl<W: Write> CountingSink<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            report: PumpReport::default(),
        }
    }

    fn write(&mut self, chunk: &[u8]) -> PumpResult<()> {
        self.inner
            .write_all(chunk)
            .map_err(|source| self.write_error(source))?;
        self.report.bytes += chunk.len() as u64;
        self.report.writes += 1;
        Ok(())
    }

    fn flush(&mut self) -> PumpResult<()> {
        self.inner.flush().map_err(|source| self.write_error(source))
    }

    fn read_error(&self, source: io::Error) -> PumpError {
        PumpError::Read {
            bytes: self.report.bytes,
            source,
        }
    }

    fn write_error(&self, source: io::Error) -> PumpError {
        PumpError::Write {
            bytes: self.report.bytes,
            source,
        }
    }
}
