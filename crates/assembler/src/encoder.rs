//! Pass-2 instruction encoding.
//!
//! Each addressed instruction is lowered to a [`DecodedInstruction`] and
//! encoded by the core, so the assembler and decoder share one bit layout.

use simulator_core::{
    AluFunction, AluOperand, DataValue, DecodedInstruction, InstructionAddress, InstructionWord,
    JumpKind, MemoryOp, Register, RegisterOp,
};

use crate::errors::{AssembleError, AssembleErrorKind};
use crate::mnemonic::InstructionForm;
use crate::parser::Operand;
use crate::symbols::{AddressedInstruction, SymbolTable};

/// Accepted range of 8-bit data immediates (signed or unsigned spelling).
pub const DATA_IMMEDIATE_RANGE: (i64, i64) = (-128, 255);
/// Accepted range of 12-bit address immediates (signed or unsigned spelling).
pub const ADDRESS_IMMEDIATE_RANGE: (i64, i64) = (-2048, 4095);

/// Lowers one addressed instruction.
///
/// Branch label operands resolve to the label's absolute address; `JMPI`
/// label operands resolve to the offset from the instruction's own address.
///
/// # Errors
///
/// Returns an [`AssembleError`] for out-of-range immediates and undefined
/// labels.
pub fn lower_instruction(
    addressed: &AddressedInstruction,
    symbols: &SymbolTable,
) -> Result<DecodedInstruction, AssembleError> {
    let line = addressed.source_line;
    let operand = addressed.instruction.operand.as_ref();

    let decoded = match addressed.instruction.form {
        InstructionForm::Alu(AluFunction::Inv) => DecodedInstruction::Alu {
            function: AluFunction::Inv,
            operand: AluOperand::Register(Register::R0),
        },
        InstructionForm::Alu(function) => DecodedInstruction::Alu {
            function,
            operand: AluOperand::Register(register_operand(operand, line)?),
        },
        InstructionForm::AluImmediate(function) => DecodedInstruction::Alu {
            function,
            operand: AluOperand::Immediate(data_immediate(operand, line)?),
        },
        InstructionForm::Set => {
            DecodedInstruction::RegisterFile(RegisterOp::Set(data_immediate(operand, line)?))
        }
        InstructionForm::Get => {
            DecodedInstruction::RegisterFile(RegisterOp::Get(register_operand(operand, line)?))
        }
        InstructionForm::Put => {
            DecodedInstruction::RegisterFile(RegisterOp::Put(register_operand(operand, line)?))
        }
        InstructionForm::Load => DecodedInstruction::Memory(MemoryOp::Load),
        InstructionForm::Store => DecodedInstruction::Memory(MemoryOp::Store),
        InstructionForm::JumpImmediate => {
            let offset = match operand {
                Some(Operand::Label(name)) => {
                    let target = resolve_label(name, symbols, line)?;
                    let offset = target.value().wrapping_sub(addressed.address.value());
                    InstructionAddress::wrapping(offset)
                }
                _ => address_immediate(operand, line)?,
            };
            DecodedInstruction::Jump(JumpKind::ImmediateRelative(offset))
        }
        InstructionForm::JumpRelative => DecodedInstruction::Jump(JumpKind::RegisterRelative),
        InstructionForm::JumpAbsolute => DecodedInstruction::Jump(JumpKind::RegisterAbsolute),
        InstructionForm::Branch(condition) => {
            let target = match operand {
                Some(Operand::Label(name)) => resolve_label(name, symbols, line)?,
                _ => address_immediate(operand, line)?,
            };
            DecodedInstruction::Branch { condition, target }
        }
        InstructionForm::Nop => DecodedInstruction::Alu {
            function: AluFunction::Add,
            operand: AluOperand::Immediate(DataValue::ZERO),
        },
        InstructionForm::Halt => DecodedInstruction::Halt,
    };
    Ok(decoded)
}

/// Lowers and encodes one addressed instruction.
///
/// # Errors
///
/// See [`lower_instruction`].
pub fn encode_instruction(
    addressed: &AddressedInstruction,
    symbols: &SymbolTable,
) -> Result<InstructionWord, AssembleError> {
    lower_instruction(addressed, symbols).map(DecodedInstruction::encode)
}

fn resolve_label(
    name: &str,
    symbols: &SymbolTable,
    line: usize,
) -> Result<InstructionAddress, AssembleError> {
    symbols
        .get(name)
        .map(|symbol| symbol.address)
        .ok_or_else(|| {
            AssembleError::new(line, AssembleErrorKind::UndefinedLabel(name.to_string()))
        })
}

fn register_operand(
    operand: Option<&Operand>,
    line: usize,
) -> Result<Register, AssembleError> {
    match operand {
        Some(Operand::Register(register)) => Ok(*register),
        Some(Operand::Number(value)) => Err(AssembleError::new(
            line,
            AssembleErrorKind::InvalidRegister(value.to_string()),
        )),
        Some(Operand::Label(name)) => Err(AssembleError::new(
            line,
            AssembleErrorKind::InvalidRegister(name.clone()),
        )),
        None => Err(AssembleError::new(
            line,
            AssembleErrorKind::MissingOperand("register".to_string()),
        )),
    }
}

fn number_in_range(
    operand: Option<&Operand>,
    (min, max): (i64, i64),
    line: usize,
) -> Result<i64, AssembleError> {
    let value = match operand {
        Some(Operand::Number(value)) => *value,
        Some(Operand::Label(name)) => {
            return Err(AssembleError::new(
                line,
                AssembleErrorKind::InvalidImmediate(name.clone()),
            ))
        }
        Some(Operand::Register(register)) => {
            return Err(AssembleError::new(
                line,
                AssembleErrorKind::InvalidImmediate(register.name().to_string()),
            ))
        }
        None => {
            return Err(AssembleError::new(
                line,
                AssembleErrorKind::MissingOperand("immediate".to_string()),
            ))
        }
    };
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(AssembleError::new(
            line,
            AssembleErrorKind::ImmediateOutOfRange { value, min, max },
        ))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn data_immediate(operand: Option<&Operand>, line: usize) -> Result<DataValue, AssembleError> {
    let value = number_in_range(operand, DATA_IMMEDIATE_RANGE, line)?;
    Ok(DataValue::new(value as u8))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn address_immediate(
    operand: Option<&Operand>,
    line: usize,
) -> Result<InstructionAddress, AssembleError> {
    let value = number_in_range(operand, ADDRESS_IMMEDIATE_RANGE, line)?;
    Ok(InstructionAddress::wrapping(value as u16))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use simulator_core::{InstructionAddress, HALT_WORD, NOP_WORD};

    use super::encode_instruction;
    use crate::errors::AssembleErrorKind;
    use crate::parser::parse_line;
    use crate::symbols::{AddressedInstruction, Symbol, SymbolTable};

    fn addressed(line: &str, address: u16) -> AddressedInstruction {
        AddressedInstruction {
            address: InstructionAddress::wrapping(address),
            instruction: parse_line(line, 1)
                .expect("valid line")
                .instruction
                .expect("instruction"),
            source_line: 1,
        }
    }

    fn word(line: &str) -> u16 {
        encode_instruction(&addressed(line, 0), &SymbolTable::new())
            .expect("encodes")
            .value()
    }

    fn symbols(entries: &[(&str, u16)]) -> SymbolTable {
        entries
            .iter()
            .map(|&(name, address)| {
                (
                    name.to_string(),
                    Symbol {
                        address: InstructionAddress::wrapping(address),
                        defined_at: 1,
                    },
                )
            })
            .collect()
    }

    #[rstest]
    #[case("SET 5", 0x0544)]
    #[case("SET -1", 0xFF44)]
    #[case("ADDI 1", 0x0100)]
    #[case("SUBI 0x10", 0x1010)]
    #[case("ADD R3", 0x0302)]
    #[case("XOR r7", 0x0752)]
    #[case("INV", 0x0072)]
    #[case("GET ACC", 0x0824)]
    #[case("PUT R1", 0x0134)]
    #[case("LOAD", 0x0004)]
    #[case("STORE", 0x0014)]
    #[case("JMPR", 0x000E)]
    #[case("JMP", 0x001E)]
    #[case("JMPI 4", 0x0048)]
    #[case("JMPI -2", 0xFFE8)]
    #[case("BZ 0x008", 0x0081)]
    #[case("BOC 0xFFF", 0xFFFF)]
    fn encodes_instruction_words(#[case] line: &str, #[case] expected: u16) {
        assert_eq!(word(line), expected);
    }

    #[test]
    fn macros_encode_to_their_canonical_words() {
        assert_eq!(word("NOP"), NOP_WORD.value());
        assert_eq!(word("HALT"), HALT_WORD.value());
    }

    #[test]
    fn branch_labels_resolve_to_absolute_addresses() {
        let table = symbols(&[("done", 0x010)]);
        let encoded = encode_instruction(&addressed("BNZ done", 0x004), &table).expect("encodes");
        assert_eq!(encoded.value(), 0x0103);
    }

    #[test]
    fn jump_labels_resolve_to_relative_offsets() {
        let table = symbols(&[("back", 0x002), ("ahead", 0x00A)]);
        let forward = encode_instruction(&addressed("JMPI ahead", 0x004), &table).expect("encodes");
        assert_eq!(forward.value(), 0x0068);
        let backward = encode_instruction(&addressed("JMPI back", 0x004), &table).expect("encodes");
        assert_eq!(backward.value(), 0xFFE8);
    }

    #[test]
    fn undefined_labels_are_reported() {
        let error = encode_instruction(&addressed("BZ nowhere", 0), &SymbolTable::new())
            .expect_err("undefined");
        assert_eq!(
            error.kind,
            AssembleErrorKind::UndefinedLabel("nowhere".to_string())
        );
    }

    #[rstest]
    #[case("SET 256", 256, -128, 255)]
    #[case("ADDI -129", -129, -128, 255)]
    #[case("JMPI 4096", 4096, -2048, 4095)]
    #[case("BZ -2049", -2049, -2048, 4095)]
    fn immediates_must_fit_their_field(
        #[case] line: &str,
        #[case] value: i64,
        #[case] min: i64,
        #[case] max: i64,
    ) {
        let error = encode_instruction(&addressed(line, 0), &SymbolTable::new())
            .expect_err("out of range");
        assert_eq!(
            error.kind,
            AssembleErrorKind::ImmediateOutOfRange { value, min, max }
        );
    }
}
