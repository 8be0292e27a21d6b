//! Assembler, text formats and state dumps for the accumulator CPU simulator.

use env_logger as _;

/// Top-level two-pass assembler pipeline.
pub mod assembler;
/// Repeated-run throughput measurement.
pub mod bench;
/// Comparison of binary-string dumps.
pub mod compare;
/// Layered run configuration.
pub mod config;
/// Text dumps of final simulator state.
pub mod dump;
/// Instruction encoding.
pub mod encoder;
/// Structured assembly error types.
pub mod errors;
/// Binary, binary-string and hex-string output.
pub mod formats;
/// Program image loading from text formats.
pub mod loader;
/// Mnemonic table.
pub mod mnemonic;
/// Source line parser.
pub mod parser;
/// Symbol table and pass-1 address assignment.
pub mod symbols;

pub use assembler::{assemble, AssembleResult, Assembler, ListingEntry};
pub use errors::{AssembleError, AssembleErrorKind};
