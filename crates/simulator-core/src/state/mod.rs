//! Architectural state with two-phase (stage, then commit) updates.

/// Program counter with stall latch.
pub mod program_counter;
/// Register file and status flags.
pub mod registers;
/// Committed/next value pair.
pub mod staged;

pub use program_counter::{ProgramCounter, ProgramCounterSnapshot, INSTRUCTION_STRIDE};
pub use registers::{
    RegisterFile, RegisterFileSnapshot, StatusFlags, STATUS_CARRY, STATUS_OVERFLOW,
    STATUS_POSITIVE, STATUS_RESET, STATUS_ZERO,
};
pub use staged::Staged;
