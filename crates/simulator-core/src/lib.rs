//! Cycle-level simulator core for an 8-bit single-accumulator processor.

/// Bus widths and width-checked value types.
pub mod bus;
pub use bus::{
    AddressOutOfRange, DataAddress, DataValue, InstructionAddress, InstructionWord,
    DATA_ADDRESS_SPACE, DATA_ADDRESS_WIDTH, DATA_WIDTH, INSTRUCTION_ADDRESS_SPACE,
    INSTRUCTION_ADDRESS_WIDTH, INSTRUCTION_BYTES, INSTRUCTION_WIDTH,
};

/// Opcode, function, condition and register tables.
pub mod encoding;
pub use encoding::{
    AluFunction, BranchCondition, InstructionFields, JumpFunction, Opcode, RegMemoryFunction,
    Register, REGISTER_COUNT,
};

/// Instruction decode unit.
pub mod decoder;
pub use decoder::{
    decode, AluOperand, DecodedInstruction, JumpKind, MemoryOp, RegisterOp, HALT_WORD, NOP_WORD,
};

/// Arithmetic logic unit.
pub mod alu;
pub use alu::AluOutput;

/// Fault taxonomy.
pub mod fault;
pub use fault::{
    DecodeFault, FaultClass, MemoryFault, ProgramCounterFault, RegisterFault, SimError,
    WatchdogTimeout,
};

/// Register file, program counter and staged values.
pub mod state;
pub use state::{
    ProgramCounter, ProgramCounterSnapshot, RegisterFile, RegisterFileSnapshot, Staged,
    StatusFlags,
};

/// Instruction and data memories.
pub mod memory;
pub use memory::{DataMemory, InstructionMemory, MemorySnapshot};

/// Host-facing configuration, state and trace types.
pub mod api;
pub use api::{
    MemoryRequestKind, ModuleSnapshots, NoTrace, ProgramAssembler, SimConfig, SimulationResult,
    SimulatorState, Stage, StagedWrite, StepOutcome, TraceEvent, TraceSink,
    DEFAULT_LATENCY_CYCLES,
};

/// Pipeline controller and run loop.
pub mod pipeline;
pub use pipeline::{Run, Simulator};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
