//! Host-facing types for configuring, driving and observing a simulator.

use std::fmt;

use crate::bus::{DataAddress, DataValue, InstructionAddress, InstructionWord};
use crate::decoder::DecodedInstruction;
use crate::encoding::Register;
use crate::fault::WatchdogTimeout;
use crate::memory::MemorySnapshot;
use crate::state::{ProgramCounterSnapshot, RegisterFileSnapshot};

/// Default latency, in cycles, of every memory operation.
pub const DEFAULT_LATENCY_CYCLES: u32 = 10;

/// Memory timing for a simulator instance.
///
/// A latency of `n` makes a request ready on the `n`-th commit after it was
/// issued; zero makes it ready in the requesting cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    /// Instruction fetch latency.
    pub fetch_latency: u32,
    /// Data load latency.
    pub load_latency: u32,
    /// Data store latency.
    pub store_latency: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fetch_latency: DEFAULT_LATENCY_CYCLES,
            load_latency: DEFAULT_LATENCY_CYCLES,
            store_latency: DEFAULT_LATENCY_CYCLES,
        }
    }
}

impl SimConfig {
    /// Every memory answers in the requesting cycle.
    #[must_use]
    pub const fn zero_latency() -> Self {
        Self {
            fetch_latency: 0,
            load_latency: 0,
            store_latency: 0,
        }
    }
}

/// Committed state of every stateful module.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ModuleSnapshots {
    /// Register file.
    pub register_file: RegisterFileSnapshot,
    /// Instruction memory.
    pub instruction_memory: MemorySnapshot<InstructionAddress, InstructionWord>,
    /// Data memory.
    pub data_memory: MemorySnapshot<DataAddress, DataValue>,
    /// Program counter.
    pub program_counter: ProgramCounterSnapshot,
}

/// Observable simulator state after a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SimulatorState {
    /// Cycles executed since reset.
    pub cycle_count: u64,
    /// Set once `HALT` is decoded; never cleared except by reset.
    pub halted: bool,
    /// True when some stage was not ready during the last cycle.
    pub stalled: bool,
    /// Per-module snapshots.
    pub modules: ModuleSnapshots,
}

impl SimulatorState {
    /// Committed value of `register`.
    #[must_use]
    pub const fn register(&self, register: Register) -> DataValue {
        self.modules.register_file.get(register)
    }

    /// Committed program counter.
    #[must_use]
    pub const fn pc(&self) -> InstructionAddress {
        self.modules.program_counter.address
    }
}

impl fmt::Display for SimulatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = self.modules.register_file.status();
        writeln!(
            f,
            "cycle {} pc {} halted {} stalled {}",
            self.cycle_count,
            self.pc(),
            self.halted,
            self.stalled
        )?;
        writeln!(
            f,
            "acc {} status z={} p={} c={} v={}",
            self.modules.register_file.acc(),
            u8::from(flags.zero),
            u8::from(flags.positive),
            u8::from(flags.carry),
            u8::from(flags.signed_overflow)
        )?;
        let mut first = true;
        for (register, value) in self.modules.register_file.iter() {
            if matches!(register, Register::Acc | Register::Status) {
                continue;
            }
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{register}={value}")?;
        }
        writeln!(f)?;
        write!(
            f,
            "data memory cells written: {}",
            self.modules.data_memory.cells.len()
        )
    }
}

/// Terminal result of a run that reached `HALT`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SimulationResult {
    /// Cycles executed, including the halting cycle.
    pub cycle_count: u64,
    /// State at halt.
    pub state: SimulatorState,
}

/// Result of one [`crate::Simulator::step`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// A cycle ran and committed; the program has not halted.
    Continuing(SimulatorState),
    /// The program has halted.
    Halted(SimulationResult),
    /// The cycle bound was reached before `HALT`.
    TimedOut(WatchdogTimeout),
}

/// Pipeline stage that can report not-ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Stage {
    /// Instruction fetch.
    Fetch,
    /// Load/store.
    MemoryAccess,
}

/// Kind of data memory request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MemoryRequestKind {
    /// Read into the accumulator.
    Load,
    /// Write of the accumulator.
    Store,
}

/// A value staged by the execute or memory stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StagedWrite {
    /// Next accumulator.
    Accumulator(DataValue),
    /// Next value of a named register.
    Register(Register, DataValue),
    /// Next ALU flags.
    Status {
        /// Signed overflow.
        signed_overflow: bool,
        /// Carry or borrow.
        carry: bool,
    },
    /// Next program counter.
    ProgramCounter(InstructionAddress),
}

/// Per-cycle events in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TraceEvent {
    /// Fetch requested from `address`.
    FetchIssued {
        /// Program counter used for the fetch.
        address: InstructionAddress,
    },
    /// A stage was not ready; the rest of the cycle was skipped.
    Stalled {
        /// Stage that stalled.
        stage: Stage,
    },
    /// A word was decoded.
    Decoded {
        /// Address the word was fetched from.
        address: InstructionAddress,
        /// Decoded instruction.
        instruction: DecodedInstruction,
    },
    /// A value was staged for commit.
    Staged(StagedWrite),
    /// A data memory request was issued.
    MemoryRequest {
        /// Load or store.
        kind: MemoryRequestKind,
        /// Target address.
        address: DataAddress,
        /// Stored value; `None` for loads.
        value: Option<DataValue>,
    },
    /// `HALT` was decoded.
    Halted,
    /// Commit phase finished.
    Committed {
        /// True when the commit followed a stalled cycle.
        stalled: bool,
    },
}

/// Sink for [`TraceEvent`]s emitted during a traced step.
pub trait TraceSink {
    /// Records an event in execution order.
    fn on_event(&mut self, event: TraceEvent);
}

impl TraceSink for Vec<TraceEvent> {
    fn on_event(&mut self, event: TraceEvent) {
        self.push(event);
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTrace;

impl TraceSink for NoTrace {
    fn on_event(&mut self, _event: TraceEvent) {}
}

/// Converts program text into an instruction memory image.
pub trait ProgramAssembler {
    /// Assembly failure.
    type Error: fmt::Display;

    /// Assembles `source` into little-endian instruction bytes.
    ///
    /// # Errors
    ///
    /// Returns the implementation's error when `source` is not a valid
    /// program.
    fn assemble(&self, source: &str) -> Result<Vec<u8>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::{NoTrace, SimConfig, TraceEvent, TraceSink, DEFAULT_LATENCY_CYCLES};

    #[test]
    fn default_config_uses_default_latency_everywhere() {
        let config = SimConfig::default();
        assert_eq!(config.fetch_latency, DEFAULT_LATENCY_CYCLES);
        assert_eq!(config.load_latency, DEFAULT_LATENCY_CYCLES);
        assert_eq!(config.store_latency, DEFAULT_LATENCY_CYCLES);
        assert_eq!(SimConfig::zero_latency().fetch_latency, 0);
    }

    #[test]
    fn vector_sink_records_in_order() {
        let mut events = Vec::new();
        events.on_event(TraceEvent::Halted);
        events.on_event(TraceEvent::Committed { stalled: false });
        assert_eq!(
            events,
            vec![TraceEvent::Halted, TraceEvent::Committed { stalled: false }]
        );
        NoTrace.on_event(TraceEvent::Halted);
    }
}
