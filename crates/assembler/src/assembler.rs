//! Top-level assembler pipeline.
//!
//! 1. **Parse** every source line.
//! 2. **Pass 1** assigns addresses and builds the symbol table.
//! 3. **Pass 2** encodes each instruction, resolving labels.
//!
//! The main entry point is [`assemble`]; [`Assembler`] exposes the same
//! pipeline to the simulator through [`ProgramAssembler`].

use log::{debug, info};
use simulator_core::{InstructionAddress, InstructionWord, ProgramAssembler};

use crate::encoder::encode_instruction;
use crate::errors::AssembleError;
use crate::parser::parse_line;
use crate::symbols::{assign_addresses, SymbolTable};

/// One assembled instruction with the source it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Address of the instruction.
    pub address: InstructionAddress,
    /// Encoded word.
    pub word: InstructionWord,
    /// Source line text as written, comment included.
    pub source: String,
    /// 1-indexed source line.
    pub line: usize,
}

/// Result of assembly.
#[derive(Debug, Clone)]
pub struct AssembleResult {
    /// Little-endian program image.
    pub binary: Vec<u8>,
    /// One entry per instruction in program order.
    pub listing: Vec<ListingEntry>,
    /// Label definitions.
    pub symbols: SymbolTable,
}

/// Assembles `source` into a program image.
///
/// # Errors
///
/// Returns the first [`AssembleError`] found, in source order within each
/// phase: parse errors, then duplicate labels, then encoding errors.
pub fn assemble(source: &str) -> Result<AssembleResult, AssembleError> {
    let source_lines: Vec<&str> = source.lines().collect();

    let parsed = source_lines
        .iter()
        .enumerate()
        .map(|(index, text)| parse_line(text, index + 1).map(|parsed| (index + 1, parsed)))
        .filter(|result| !matches!(result, Ok((_, parsed)) if parsed.is_blank()))
        .collect::<Result<Vec<_>, _>>()?;

    let assignment = assign_addresses(&parsed)?;
    debug!(
        "pass 1: {} instructions, {} labels",
        assignment.instructions.len(),
        assignment.symbols.len()
    );

    let mut binary = Vec::with_capacity(assignment.instructions.len() * 2);
    let mut listing = Vec::with_capacity(assignment.instructions.len());
    for addressed in &assignment.instructions {
        let word = encode_instruction(addressed, &assignment.symbols)?;
        binary.extend_from_slice(&word.to_le_bytes());
        listing.push(ListingEntry {
            address: addressed.address,
            word,
            source: source_lines
                .get(addressed.source_line - 1)
                .map_or_else(String::new, |text| (*text).to_string()),
            line: addressed.source_line,
        });
    }

    info!(
        "assembled {} instructions ({} bytes)",
        listing.len(),
        binary.len()
    );
    Ok(AssembleResult {
        binary,
        listing,
        symbols: assignment.symbols,
    })
}

/// The assembler as a simulator program loader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Assembler;

impl ProgramAssembler for Assembler {
    type Error = AssembleError;

    fn assemble(&self, source: &str) -> Result<Vec<u8>, Self::Error> {
        assemble(source).map(|result| result.binary)
    }
}

#[cfg(test)]
mod tests {
    use simulator_core::{
        InstructionAddress, Register, SimConfig, SimError, Simulator, HALT_WORD,
    };

    use super::{assemble, Assembler};
    use crate::errors::AssembleErrorKind;

    #[test]
    fn assembles_little_endian_words() {
        let result = assemble("SET 5\nHALT\n").expect("valid program");
        assert_eq!(result.binary, vec![0x44, 0x05, 0x08, 0x00]);
    }

    #[test]
    fn empty_source_assembles_to_nothing() {
        let result = assemble("; nothing here\n\n").expect("valid program");
        assert!(result.binary.is_empty());
        assert!(result.listing.is_empty());
    }

    #[test]
    fn listing_tracks_addresses_and_source() {
        let source = "; header\nstart: SET 1 ; one\n\nHALT\n";
        let result = assemble(source).expect("valid program");
        assert_eq!(result.listing.len(), 2);
        assert_eq!(result.listing[0].line, 2);
        assert_eq!(result.listing[0].source, "start: SET 1 ; one");
        assert_eq!(result.listing[1].address, InstructionAddress::wrapping(2));
        assert_eq!(result.listing[1].word, HALT_WORD);
        assert_eq!(
            result.symbols["start"].address,
            InstructionAddress::ZERO
        );
    }

    #[test]
    fn forward_labels_resolve() {
        let result = assemble("BZ end\nSET 1\nend: HALT").expect("valid program");
        assert_eq!(result.binary[..2], [0x41, 0x00]);
    }

    #[test]
    fn first_error_wins() {
        let error = assemble("NOP\nSET 300\nFOO\n").expect_err("invalid program");
        assert_eq!(error.line, 3);
        assert_eq!(
            error.kind,
            AssembleErrorKind::UnknownMnemonic("FOO".to_string())
        );
    }

    #[test]
    fn loads_into_the_simulator() {
        let mut simulator = Simulator::new(SimConfig::zero_latency());
        simulator
            .load_program("SET 7\nPUT R2\nHALT", &Assembler)
            .expect("valid program");
        let result = simulator.run_until_halt(Some(100)).expect("halts");
        assert_eq!(result.state.register(Register::R2).unsigned(), 7);
    }

    #[test]
    fn load_errors_carry_the_assembler_message() {
        let mut simulator = Simulator::default();
        let error = simulator
            .load_program("HALT 1", &Assembler)
            .expect_err("invalid program");
        assert_eq!(
            error,
            SimError::Load("line 1: HALT does not take an operand".to_string())
        );
    }
}
