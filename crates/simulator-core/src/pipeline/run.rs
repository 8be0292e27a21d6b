use std::iter::FusedIterator;

use crate::api::{NoTrace, SimulationResult, SimulatorState, StepOutcome};
use crate::fault::{SimError, WatchdogTimeout};
use crate::pipeline::{Advance, Simulator};

/// Lazy cycle-by-cycle run returned by [`Simulator::run`].
///
/// Each `next` executes exactly one cycle and yields the committed state.
/// The iterator ends at `HALT`, at the watchdog bound, or after yielding an
/// error; [`Run::finish`] then reports which. Dropping a `Run` early runs
/// nothing further.
#[derive(Debug)]
pub struct Run<'a> {
    simulator: &'a mut Simulator,
    limit: Option<u64>,
    finished: Option<Result<SimulationResult, SimError>>,
}

impl<'a> Run<'a> {
    pub(crate) fn new(simulator: &'a mut Simulator, cycle_bound: Option<u64>) -> Self {
        let limit = cycle_bound.map(|bound| simulator.cycle_count().saturating_add(bound));
        Self {
            simulator,
            limit,
            finished: None,
        }
    }

    /// Absolute cycle count at which the watchdog fires.
    #[must_use]
    pub const fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Drives the remaining cycles and returns the terminal result.
    ///
    /// Intermediate states are not materialized; only the final state is.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Watchdog`] when the bound is reached first, or the
    /// fault that stopped the run.
    pub fn finish(mut self) -> Result<SimulationResult, SimError> {
        if let Some(outcome) = self.finished.take() {
            return outcome;
        }
        loop {
            match self.simulator.advance(self.limit, &mut NoTrace)? {
                Advance::Continuing => {}
                Advance::Halted => return Ok(self.simulator.result()),
                Advance::TimedOut => {
                    return Err(WatchdogTimeout {
                        cycle_count: self.simulator.cycle_count(),
                    }
                    .into())
                }
            }
        }
    }
}

impl Iterator for Run<'_> {
    type Item = Result<SimulatorState, SimError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished.is_some() {
            return None;
        }
        match self.simulator.step(self.limit) {
            Ok(StepOutcome::Continuing(state)) => Some(Ok(state)),
            Ok(StepOutcome::Halted(result)) => {
                self.finished = Some(Ok(result));
                None
            }
            Ok(StepOutcome::TimedOut(timeout)) => {
                self.finished = Some(Err(timeout.into()));
                None
            }
            Err(error) => {
                self.finished = Some(Err(error.clone()));
                Some(Err(error))
            }
        }
    }
}

impl FusedIterator for Run<'_> {}
