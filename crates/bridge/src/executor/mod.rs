//! Consumer executors hosting the pump.
//!
//! Two back-ends run the same [`Pump`]:
//!
//! - [`ExecutorKind::Thread`] runs it on a named background thread. This is
//!   the default: it has no process-creation failure modes and the outcome
//!   travels back through the join handle.
//! - [`ExecutorKind::Process`] forks a child that runs only the pump loop and
//!   then exits. The outcome travels back over a dedicated report pipe.
//!
//! Both are waited for unconditionally when the bridge closes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{BridgeResult, PumpResult};
use crate::pump::{Pump, PumpReport};

mod process;
mod thread;

use process::ProcessConsumer;
use thread::ThreadConsumer;

/// Execution context for the pump.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    /// Background thread in the caller's process.
    #[default]
    Thread,
    /// Forked child process.
    Process,
}

impl ExecutorKind {
    /// Name accepted by [`FromStr`].
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Thread => "thread",
            Self::Process => "process",
        }
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised executor name.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown executor '{0}' (expected 'thread' or 'process')")]
pub struct ParseExecutorError(String);

impl FromStr for ExecutorKind {
    type Err = ParseExecutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "thread" => Ok(Self::Thread),
            "process" => Ok(Self::Process),
            _ => Err(ParseExecutorError(s.to_owned())),
        }
    }
}

/// A running consumer. Exactly one exists per open bridge.
#[derive(Debug)]
pub(crate) enum Consumer {
    Thread(ThreadConsumer),
    Process(ProcessConsumer),
}

impl Consumer {
    /// Starts `pump` on the requested executor.
    ///
    /// On failure the pump, and with it both of its handles, has already
    /// been dropped.
    pub(crate) fn start(kind: ExecutorKind, pump: Pump) -> BridgeResult<Self> {
        match kind {
            ExecutorKind::Thread => ThreadConsumer::spawn(pump).map(Self::Thread),
            ExecutorKind::Process => ProcessConsumer::spawn(pump).map(Self::Process),
        }
    }

    /// Blocks until the consumer has exited and returns its outcome.
    pub(crate) fn wait(self) -> PumpResult<PumpReport> {
        match self {
            Self::Thread(consumer) => consumer.join(),
            Self::Process(consumer) => consumer.wait(),
        }
    }
}
