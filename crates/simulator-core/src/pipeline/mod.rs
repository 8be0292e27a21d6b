//! Per-cycle pipeline controller and run loop.
//!
//! Each cycle runs the stages in order and then commits:
//! 1. **Fetch** requests the word at the PC and stalls until it is ready.
//! 2. **Decode** classifies the word; `HALT` ends the run without a commit.
//! 3. **Execute** stages ALU results and register transfers.
//! 4. **Memory access** performs `LOAD`/`STORE` and stalls until ready.
//! 5. **PC update** stages the next address.
//! 6. **Commit** promotes staged values, or after a stall only advances
//!    memory latency counters.
//!
//! Nothing about a stall is carried between cycles except the PC latch and
//! the memories' pending requests, so a stalled instruction is simply
//! recomputed on the next cycle.

mod run;
mod stages;

use log::{debug, info};

pub use run::Run;

use crate::api::{
    NoTrace, ProgramAssembler, SimConfig, SimulationResult, SimulatorState, StepOutcome,
    TraceSink,
};
use crate::fault::{SimError, WatchdogTimeout};
use crate::memory::{DataMemory, InstructionMemory};
use crate::state::{ProgramCounter, RegisterFile};
use stages::{CycleOutcome, Datapath};

/// Where one call to [`Simulator::advance`] left the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Advance {
    Continuing,
    Halted,
    TimedOut,
}

/// A simulator instance: modules plus run bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Simulator {
    config: SimConfig,
    datapath: Datapath,
    cycle_count: u64,
    halted: bool,
    stalled: bool,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Simulator {
    /// Creates a simulator in reset state with an empty instruction memory.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        Self {
            datapath: Datapath::new(&config),
            config,
            cycle_count: 0,
            halted: false,
            stalled: false,
        }
    }

    /// Memory timing in use.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Restores reset state: fresh modules, zero cycles, not halted.
    ///
    /// The loaded program is discarded along with every other module.
    pub fn reset(&mut self) {
        self.datapath = Datapath::new(&self.config);
        self.cycle_count = 0;
        self.halted = false;
        self.stalled = false;
        info!("simulator reset");
    }

    /// Installs `binary` into instruction memory.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Memory`] when the image does not fit.
    pub fn load_binary(&mut self, binary: &[u8]) -> Result<(), SimError> {
        self.datapath.instruction_memory.side_load(binary)?;
        info!(
            "loaded {} bytes ({} instructions)",
            binary.len(),
            self.datapath.instruction_memory.len()
        );
        Ok(())
    }

    /// Assembles `source` with `assembler` and installs the result.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Load`] with the assembler's message, or
    /// [`SimError::Memory`] when the image does not fit.
    pub fn load_program<A>(&mut self, source: &str, assembler: &A) -> Result<(), SimError>
    where
        A: ProgramAssembler + ?Sized,
    {
        let binary = assembler
            .assemble(source)
            .map_err(|error| SimError::Load(error.to_string()))?;
        self.load_binary(&binary)
    }

    /// Runs one cycle unless the program has halted or the watchdog fired.
    ///
    /// `cycle_bound` is the absolute cycle count at which the watchdog fires;
    /// `None` never fires.
    ///
    /// # Errors
    ///
    /// Returns the fault raised by a stage or by the commit phase. The
    /// simulator should be reset before it is driven again.
    pub fn step(&mut self, cycle_bound: Option<u64>) -> Result<StepOutcome, SimError> {
        self.step_traced(cycle_bound, &mut NoTrace)
    }

    /// Like [`Simulator::step`], reporting pipeline events to `trace`.
    ///
    /// # Errors
    ///
    /// See [`Simulator::step`].
    pub fn step_traced(
        &mut self,
        cycle_bound: Option<u64>,
        trace: &mut dyn TraceSink,
    ) -> Result<StepOutcome, SimError> {
        Ok(match self.advance(cycle_bound, trace)? {
            Advance::Continuing => StepOutcome::Continuing(self.current_state()),
            Advance::Halted => StepOutcome::Halted(self.result()),
            Advance::TimedOut => StepOutcome::TimedOut(WatchdogTimeout {
                cycle_count: self.cycle_count,
            }),
        })
    }

    /// Runs one cycle and commits it without building a snapshot.
    pub(crate) fn advance(
        &mut self,
        cycle_bound: Option<u64>,
        trace: &mut dyn TraceSink,
    ) -> Result<Advance, SimError> {
        if self.halted {
            return Ok(Advance::Halted);
        }
        if cycle_bound.is_some_and(|bound| self.cycle_count >= bound) {
            info!("watchdog fired after {} cycles", self.cycle_count);
            return Ok(Advance::TimedOut);
        }

        debug!(
            "cycle {} at {}",
            self.cycle_count,
            self.datapath.program_counter.current_address()
        );
        let outcome = self.datapath.run_cycle(trace);
        self.cycle_count += 1;
        match outcome? {
            CycleOutcome::Halted => {
                self.halted = true;
                self.stalled = false;
                info!("halted after {} cycles", self.cycle_count);
                return Ok(Advance::Halted);
            }
            CycleOutcome::Completed => self.stalled = false,
            CycleOutcome::Stalled(_) => self.stalled = true,
        }
        self.datapath.commit(self.stalled, trace)?;
        Ok(Advance::Continuing)
    }

    /// Lazy iterator over per-cycle states, bounded by `cycle_bound` cycles
    /// from now.
    pub fn run(&mut self, cycle_bound: Option<u64>) -> Run<'_> {
        Run::new(self, cycle_bound)
    }

    /// Runs until `HALT`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Watchdog`] when `cycle_bound` cycles elapse first,
    /// or the fault that stopped the run.
    pub fn run_until_halt(
        &mut self,
        cycle_bound: Option<u64>,
    ) -> Result<SimulationResult, SimError> {
        self.run(cycle_bound).finish()
    }

    /// Snapshot of the committed state.
    #[must_use]
    pub fn current_state(&self) -> SimulatorState {
        SimulatorState {
            cycle_count: self.cycle_count,
            halted: self.halted,
            stalled: self.stalled,
            modules: self.datapath.snapshot(),
        }
    }

    pub(crate) fn result(&self) -> SimulationResult {
        SimulationResult {
            cycle_count: self.cycle_count,
            state: self.current_state(),
        }
    }

    /// Cycles executed since reset.
    #[must_use]
    pub const fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Returns true once `HALT` has been decoded.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    /// Register file.
    #[must_use]
    pub const fn register_file(&self) -> &RegisterFile {
        &self.datapath.register_file
    }

    /// Instruction memory.
    #[must_use]
    pub const fn instruction_memory(&self) -> &InstructionMemory {
        &self.datapath.instruction_memory
    }

    /// Data memory.
    #[must_use]
    pub const fn data_memory(&self) -> &DataMemory {
        &self.datapath.data_memory
    }

    /// Program counter.
    #[must_use]
    pub const fn program_counter(&self) -> &ProgramCounter {
        &self.datapath.program_counter
    }
}
