//! Background-thread consumer.

use std::thread::{self, JoinHandle};

use logging::trace_exec;

use crate::error::{BridgeError, BridgeResult, PumpError, PumpResult};
use crate::pump::{Pump, PumpReport};

const THREAD_NAME: &str = "sink-pump";

#[derive(Debug)]
pub(crate) struct ThreadConsumer {
    handle: JoinHandle<PumpResult<PumpReport>>,
}

impl ThreadConsumer {
    pub(crate) fn spawn(pump: Pump) -> BridgeResult<Self> {
        let strategy = pump.strategy();
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_owned())
            .spawn(move || pump.run())
            .map_err(|source| BridgeError::resource("pump thread", source))?;
        trace_exec!(strategy = %strategy, "pump thread started");
        Ok(Self { handle })
    }

    pub(crate) fn join(self) -> PumpResult<PumpReport> {
        let outcome = self
            .handle
            .join()
            .unwrap_or(Err(PumpError::ConsumerPanicked));
        trace_exec!(ok = outcome.is_ok(), "pump thread joined");
        outcome
    }
}
