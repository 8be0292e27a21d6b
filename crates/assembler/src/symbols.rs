//! Symbol table and pass-1 address assignment.
//!
//! Walks parsed lines, gives each instruction the next instruction-memory
//! address and records label definitions. A label names the address of the
//! next instruction, so a label on its own line binds to what follows.

use std::collections::HashMap;

use simulator_core::{InstructionAddress, INSTRUCTION_ADDRESS_SPACE, INSTRUCTION_BYTES};

use crate::errors::{AssembleError, AssembleErrorKind};
use crate::parser::{ParsedInstruction, ParsedLine};

/// A label with its assigned address and definition line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    /// Address of the instruction the label names.
    pub address: InstructionAddress,
    /// Source line number where the label was defined.
    pub defined_at: usize,
}

/// Label name to definition.
pub type SymbolTable = HashMap<String, Symbol>;

/// An instruction with its assigned address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressedInstruction {
    /// Address of the instruction's first byte.
    pub address: InstructionAddress,
    /// The parsed instruction.
    pub instruction: ParsedInstruction,
    /// 1-based source line number.
    pub source_line: usize,
}

/// Result of pass-1 address assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Instructions in program order.
    pub instructions: Vec<AddressedInstruction>,
    /// Label definitions.
    pub symbols: SymbolTable,
}

/// Assigns addresses to `lines`, given as `(line_number, parsed)` pairs.
///
/// # Errors
///
/// Returns [`AssembleErrorKind::DuplicateLabel`] when a label is defined
/// twice and [`AssembleErrorKind::AddressOverflow`] when the program does
/// not fit instruction memory.
pub fn assign_addresses(lines: &[(usize, ParsedLine)]) -> Result<Assignment, AssembleError> {
    let mut symbols = SymbolTable::new();
    let mut instructions = Vec::new();
    let mut next_address = 0usize;

    for (line_number, parsed) in lines {
        let line_number = *line_number;
        if let Some(name) = &parsed.label {
            if let Some(existing) = symbols.get(name) {
                return Err(AssembleError::new(
                    line_number,
                    AssembleErrorKind::DuplicateLabel {
                        name: name.clone(),
                        first_definition: existing.defined_at,
                    },
                ));
            }
            symbols.insert(
                name.clone(),
                Symbol {
                    address: address_at(next_address),
                    defined_at: line_number,
                },
            );
        }

        if let Some(instruction) = &parsed.instruction {
            if next_address + INSTRUCTION_BYTES > INSTRUCTION_ADDRESS_SPACE {
                return Err(AssembleError::new(
                    line_number,
                    AssembleErrorKind::AddressOverflow {
                        address: next_address,
                    },
                ));
            }
            instructions.push(AddressedInstruction {
                address: address_at(next_address),
                instruction: instruction.clone(),
                source_line: line_number,
            });
            next_address += INSTRUCTION_BYTES;
        }
    }

    Ok(Assignment {
        instructions,
        symbols,
    })
}

#[allow(clippy::cast_possible_truncation)]
const fn address_at(offset: usize) -> InstructionAddress {
    InstructionAddress::wrapping(offset as u16)
}

#[cfg(test)]
mod tests {
    use simulator_core::InstructionAddress;

    use super::assign_addresses;
    use crate::errors::AssembleErrorKind;
    use crate::parser::{parse_line, ParsedLine};

    fn parse_all(source: &str) -> Vec<(usize, ParsedLine)> {
        source
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, parse_line(line, index + 1).expect("valid line")))
            .collect()
    }

    #[test]
    fn instructions_are_two_bytes_apart() {
        let assignment = assign_addresses(&parse_all("NOP\n\n; gap\nNOP\nHALT")).expect("valid");
        let addresses: Vec<_> = assignment
            .instructions
            .iter()
            .map(|addressed| (addressed.address.value(), addressed.source_line))
            .collect();
        assert_eq!(addresses, vec![(0, 1), (2, 4), (4, 5)]);
    }

    #[test]
    fn labels_bind_to_the_next_instruction() {
        let assignment =
            assign_addresses(&parse_all("NOP\nloop:\n  ADDI 1\nend: HALT")).expect("valid");
        let symbol = |name: &str| assignment.symbols[name].address;
        assert_eq!(symbol("loop"), InstructionAddress::wrapping(2));
        assert_eq!(symbol("end"), InstructionAddress::wrapping(4));
        assert_eq!(assignment.symbols["loop"].defined_at, 2);
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let error = assign_addresses(&parse_all("a: NOP\nb: NOP\na: HALT")).expect_err("duplicate");
        assert_eq!(error.line, 3);
        assert_eq!(
            error.kind,
            AssembleErrorKind::DuplicateLabel {
                name: "a".to_string(),
                first_definition: 1,
            }
        );
    }

    #[test]
    fn programs_must_fit_instruction_memory() {
        let source = "NOP\n".repeat(2048) + "HALT\n";
        let error = assign_addresses(&parse_all(&source)).expect_err("too large");
        assert_eq!(error.line, 2049);
        assert_eq!(error.kind, AssembleErrorKind::AddressOverflow { address: 4096 });
    }
}
