use thiserror::Error;

use crate::bus::InstructionWord;
use crate::encoding::Register;

/// Fault classes used for reporting and recovery policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Decode unit rejected an instruction encoding.
    Decode,
    /// Instruction or data memory protocol violation.
    Memory,
    /// Register file write-protection violation.
    Register,
    /// Program counter commit without a staged value.
    ProgramCounter,
    /// Cycle bound reached before the program halted.
    Watchdog,
    /// Program could not be installed.
    Load,
}

/// Undefined instruction encodings rejected by the decode unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum DecodeFault {
    /// Opcode field holds an unassigned value.
    #[error("illegal opcode {opcode:#05b} in instruction {word}")]
    IllegalOpcode {
        /// Offending instruction word.
        word: InstructionWord,
        /// Raw 3-bit opcode field.
        opcode: u8,
    },
    /// Function field is unassigned for the instruction's category.
    #[error("illegal {category} function {function:#06b} in instruction {word}")]
    IllegalFunction {
        /// Offending instruction word.
        word: InstructionWord,
        /// Category whose function table was consulted.
        category: &'static str,
        /// Raw 4-bit function field.
        function: u8,
    },
    /// Register field names one of the unassigned indices.
    #[error("unassigned register index {index} in instruction {word}")]
    UnassignedRegister {
        /// Offending instruction word.
        word: InstructionWord,
        /// Raw 4-bit register field.
        index: u8,
    },
}

/// Violations of the two-phase memory request protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum MemoryFault {
    /// A request targeted a different address than the one still pending.
    #[error("{memory} request for address {requested:#05X} while a request for {pending:#05X} is pending")]
    ConflictingAddress {
        /// Memory that rejected the request.
        memory: &'static str,
        /// Address of the outstanding request.
        pending: u16,
        /// Address of the rejected request.
        requested: u16,
    },
    /// A store carried a different value than the one still pending.
    #[error("{memory} store of {requested:#04X} while a store of {pending:#04X} is pending")]
    ConflictingData {
        /// Memory that rejected the request.
        memory: &'static str,
        /// Value of the outstanding store.
        pending: u16,
        /// Value of the rejected store.
        requested: u16,
    },
    /// A result was collected without a pending read.
    #[error("{memory} has no read operation pending")]
    NoPendingRead {
        /// Memory that was read.
        memory: &'static str,
    },
    /// A read targeted a cell that was never written.
    #[error("segmentation fault: {memory} address {address:#05X} has not been written")]
    SegmentationFault {
        /// Memory that was read.
        memory: &'static str,
        /// Address of the unwritten cell.
        address: u16,
    },
    /// A program image does not fit the instruction address space.
    #[error("program of {len} bytes exceeds the {capacity}-byte instruction memory")]
    ProgramTooLarge {
        /// Program length in bytes.
        len: usize,
        /// Instruction memory size in bytes.
        capacity: usize,
    },
}

/// Register file write-protection violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum RegisterFault {
    /// `PUT` targeted a register that is only written implicitly.
    #[error("{0} can not be written directly")]
    WriteProtected(Register),
}

/// Program counter protocol violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ProgramCounterFault {
    /// Commit ran on a completed cycle that staged no next address.
    #[error("no next value staged for the program counter")]
    NoStagedValue,
}

/// The cycle bound was reached before the program halted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[error("simulation timed out after {cycle_count} cycles")]
pub struct WatchdogTimeout {
    /// Cycle count reached when the watchdog fired.
    pub cycle_count: u64,
}

/// Every failure surfaced by the simulator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// Decode unit rejected the fetched word.
    #[error(transparent)]
    Decode(#[from] DecodeFault),
    /// Memory protocol violation.
    #[error(transparent)]
    Memory(#[from] MemoryFault),
    /// Register write-protection violation.
    #[error(transparent)]
    Register(#[from] RegisterFault),
    /// Program counter protocol violation.
    #[error(transparent)]
    ProgramCounter(#[from] ProgramCounterFault),
    /// Run-to-halt exceeded its cycle bound.
    #[error(transparent)]
    Watchdog(#[from] WatchdogTimeout),
    /// Program text could not be turned into a binary.
    #[error("failed to load program: {0}")]
    Load(String),
}

impl SimError {
    /// Returns the reporting class for this error.
    #[must_use]
    pub const fn class(&self) -> FaultClass {
        match self {
            Self::Decode(_) => FaultClass::Decode,
            Self::Memory(_) => FaultClass::Memory,
            Self::Register(_) => FaultClass::Register,
            Self::ProgramCounter(_) => FaultClass::ProgramCounter,
            Self::Watchdog(_) => FaultClass::Watchdog,
            Self::Load(_) => FaultClass::Load,
        }
    }

    /// Only a watchdog timeout leaves the engine in a state the caller may
    /// keep driving; every other error is fatal to the current run.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Watchdog(_))
    }
}
