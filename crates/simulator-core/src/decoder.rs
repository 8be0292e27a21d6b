//! Decode unit.
//!
//! Classifies a fetched word into exactly one instruction category. Every
//! sub-operation is a closed enum, so the pipeline's dispatch is checked for
//! exhaustiveness by the compiler and undefined encodings are rejected here.

use core::fmt;

use crate::bus::{DataValue, InstructionAddress, InstructionWord};
use crate::encoding::{
    AluFunction, BranchCondition, InstructionFields, JumpFunction, Opcode, RegMemoryFunction,
    Register, ADDRESS_IMMEDIATE_SHIFT, DATA_IMMEDIATE_SHIFT, FUNCTION_SHIFT, OPCODE_SHIFT,
    REGISTER_SHIFT,
};
use crate::fault::DecodeFault;

/// Second ALU operand source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AluOperand {
    /// 8-bit immediate carried in the instruction.
    Immediate(DataValue),
    /// Committed value of a register.
    Register(Register),
}

/// Register-file operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RegisterOp {
    /// `acc <- imm`.
    Set(DataValue),
    /// `acc <- reg`.
    Get(Register),
    /// `reg <- acc`.
    Put(Register),
}

/// Data-memory operations, both addressed through DMAR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MemoryOp {
    /// `acc <- mem[DMAR]`.
    Load,
    /// `mem[DMAR] <- acc`.
    Store,
}

/// Unconditional jump forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum JumpKind {
    /// `PC <- PC + imm`.
    ImmediateRelative(InstructionAddress),
    /// `PC <- PC + IMAR`.
    RegisterRelative,
    /// `PC <- IMAR`.
    RegisterAbsolute,
}

/// A classified instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DecodedInstruction {
    /// `acc <- acc (function) operand`, updating carry and overflow.
    Alu {
        /// ALU function to apply.
        function: AluFunction,
        /// Second operand source.
        operand: AluOperand,
    },
    /// Accumulator/register transfer.
    RegisterFile(RegisterOp),
    /// Data-memory access.
    Memory(MemoryOp),
    /// Conditional branch to an absolute instruction address.
    Branch {
        /// Condition tested against the committed status register.
        condition: BranchCondition,
        /// Target address when taken.
        target: InstructionAddress,
    },
    /// Unconditional jump.
    Jump(JumpKind),
    /// Stop the machine.
    Halt,
}

/// The canonical `HALT` encoding (`JMPI 0`).
pub const HALT_WORD: InstructionWord = InstructionWord::new((Opcode::JumpImm as u16) << 1);
/// The canonical `NOP` encoding (`ADDI 0`).
pub const NOP_WORD: InstructionWord = InstructionWord::new(0);

/// Decodes one instruction word.
///
/// A `JMPI` with a zero offset is classified as [`DecodedInstruction::Halt`].
///
/// # Errors
///
/// Returns a [`DecodeFault`] for unassigned opcodes, function codes, or
/// register indices.
pub fn decode(word: InstructionWord) -> Result<DecodedInstruction, DecodeFault> {
    let fields = InstructionFields::extract(word);

    if fields.branch {
        return Ok(DecodedInstruction::Branch {
            condition: BranchCondition::from_u3(fields.opcode),
            target: InstructionAddress::wrapping(fields.address_immediate),
        });
    }

    let opcode = Opcode::from_u3(fields.opcode).ok_or(DecodeFault::IllegalOpcode {
        word,
        opcode: fields.opcode,
    })?;

    let register = || {
        Register::from_u4(fields.register).ok_or(DecodeFault::UnassignedRegister {
            word,
            index: fields.register,
        })
    };

    let decoded = match opcode {
        Opcode::ArithLogicImm | Opcode::ArithLogic => {
            let function =
                AluFunction::from_u4(fields.function).ok_or(DecodeFault::IllegalFunction {
                    word,
                    category: "alu",
                    function: fields.function,
                })?;
            let operand = if opcode == Opcode::ArithLogicImm {
                AluOperand::Immediate(DataValue::new(fields.data_immediate))
            } else {
                AluOperand::Register(register()?)
            };
            DecodedInstruction::Alu { function, operand }
        }
        Opcode::RegMemory => {
            let function = RegMemoryFunction::from_u4(fields.function).ok_or(
                DecodeFault::IllegalFunction {
                    word,
                    category: "register/memory",
                    function: fields.function,
                },
            )?;
            match function {
                RegMemoryFunction::Load => DecodedInstruction::Memory(MemoryOp::Load),
                RegMemoryFunction::Store => DecodedInstruction::Memory(MemoryOp::Store),
                RegMemoryFunction::Get => {
                    DecodedInstruction::RegisterFile(RegisterOp::Get(register()?))
                }
                RegMemoryFunction::Put => {
                    DecodedInstruction::RegisterFile(RegisterOp::Put(register()?))
                }
                RegMemoryFunction::Set => DecodedInstruction::RegisterFile(RegisterOp::Set(
                    DataValue::new(fields.data_immediate),
                )),
            }
        }
        Opcode::JumpImm if fields.address_immediate == 0 => DecodedInstruction::Halt,
        Opcode::JumpImm => DecodedInstruction::Jump(JumpKind::ImmediateRelative(
            InstructionAddress::wrapping(fields.address_immediate),
        )),
        Opcode::JumpReg => {
            let function =
                JumpFunction::from_u4(fields.function).ok_or(DecodeFault::IllegalFunction {
                    word,
                    category: "jump",
                    function: fields.function,
                })?;
            match function {
                JumpFunction::Relative => DecodedInstruction::Jump(JumpKind::RegisterRelative),
                JumpFunction::Absolute => DecodedInstruction::Jump(JumpKind::RegisterAbsolute),
            }
        }
    };

    Ok(decoded)
}

const fn opcode_bits(opcode: Opcode) -> u16 {
    (opcode.bits() as u16) << OPCODE_SHIFT
}

const fn function_bits(function: u8) -> u16 {
    (function as u16) << FUNCTION_SHIFT
}

const fn register_bits(register: Register) -> u16 {
    (register.bits() as u16) << REGISTER_SHIFT
}

const fn data_bits(value: DataValue) -> u16 {
    (value.unsigned() as u16) << DATA_IMMEDIATE_SHIFT
}

impl DecodedInstruction {
    /// Re-encodes this instruction into its canonical word.
    ///
    /// Unused fields are zero, so `JMPR`/`JMP` carry register field 0 and
    /// `Jump(ImmediateRelative(0))` encodes to [`HALT_WORD`].
    #[must_use]
    pub const fn encode(self) -> InstructionWord {
        let raw = match self {
            Self::Alu {
                function,
                operand: AluOperand::Immediate(value),
            } => {
                opcode_bits(Opcode::ArithLogicImm)
                    | function_bits(function.bits())
                    | data_bits(value)
            }
            Self::Alu {
                function,
                operand: AluOperand::Register(register),
            } => {
                opcode_bits(Opcode::ArithLogic)
                    | function_bits(function.bits())
                    | register_bits(register)
            }
            Self::RegisterFile(op) => {
                let base = opcode_bits(Opcode::RegMemory);
                match op {
                    RegisterOp::Set(value) => {
                        base | function_bits(RegMemoryFunction::Set.bits()) | data_bits(value)
                    }
                    RegisterOp::Get(register) => {
                        base
                            | function_bits(RegMemoryFunction::Get.bits())
                            | register_bits(register)
                    }
                    RegisterOp::Put(register) => {
                        base
                            | function_bits(RegMemoryFunction::Put.bits())
                            | register_bits(register)
                    }
                }
            }
            Self::Memory(MemoryOp::Load) => {
                opcode_bits(Opcode::RegMemory) | function_bits(RegMemoryFunction::Load.bits())
            }
            Self::Memory(MemoryOp::Store) => {
                opcode_bits(Opcode::RegMemory) | function_bits(RegMemoryFunction::Store.bits())
            }
            Self::Branch { condition, target } => {
                1 | ((condition.bits() as u16) << OPCODE_SHIFT)
                    | (target.value() << ADDRESS_IMMEDIATE_SHIFT)
            }
            Self::Jump(JumpKind::ImmediateRelative(offset)) => {
                opcode_bits(Opcode::JumpImm) | (offset.value() << ADDRESS_IMMEDIATE_SHIFT)
            }
            Self::Jump(JumpKind::RegisterRelative) => {
                opcode_bits(Opcode::JumpReg) | function_bits(JumpFunction::Relative.bits())
            }
            Self::Jump(JumpKind::RegisterAbsolute) => {
                opcode_bits(Opcode::JumpReg) | function_bits(JumpFunction::Absolute.bits())
            }
            Self::Halt => HALT_WORD.value(),
        };
        InstructionWord::new(raw)
    }
}

impl fmt::Display for DecodedInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alu {
                function: AluFunction::Inv,
                ..
            } => f.write_str("INV"),
            Self::Alu {
                function,
                operand: AluOperand::Immediate(value),
            } => write!(f, "{}I {value}", function.mnemonic()),
            Self::Alu {
                function,
                operand: AluOperand::Register(register),
            } => write!(f, "{} {register}", function.mnemonic()),
            Self::RegisterFile(RegisterOp::Set(value)) => write!(f, "SET {value}"),
            Self::RegisterFile(RegisterOp::Get(register)) => write!(f, "GET {register}"),
            Self::RegisterFile(RegisterOp::Put(register)) => write!(f, "PUT {register}"),
            Self::Memory(MemoryOp::Load) => f.write_str("LOAD"),
            Self::Memory(MemoryOp::Store) => f.write_str("STORE"),
            Self::Branch { condition, target } => write!(f, "{} {target}", condition.mnemonic()),
            Self::Jump(JumpKind::ImmediateRelative(offset)) => write!(f, "JMPI {offset}"),
            Self::Jump(JumpKind::RegisterRelative) => f.write_str("JMPR"),
            Self::Jump(JumpKind::RegisterAbsolute) => f.write_str("JMP"),
            Self::Halt => f.write_str("HALT"),
        }
    }
}
