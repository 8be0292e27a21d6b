//! Instruction field layout and encoding tables.
//!
//! A 16-bit instruction word is laid out as:
//! 1. **bit 0**: conditional-branch flag.
//! 2. **bits 1..=3**: opcode, or branch condition when bit 0 is set.
//! 3. **bits 4..=15**: 12-bit address immediate (branches and `JMPI`).
//! 4. **bits 4..=7**: function code.
//! 5. **bits 8..=11**: register index.
//! 6. **bits 8..=15**: 8-bit data immediate.

use core::fmt;

use crate::bus::InstructionWord;

/// Primary opcode (bits 1..=3 when the branch flag is clear).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Opcode {
    /// ALU operation with an 8-bit immediate operand.
    ArithLogicImm = 0b000,
    /// ALU operation with a register operand.
    ArithLogic = 0b001,
    /// Register-file and data-memory operations.
    RegMemory = 0b010,
    /// PC-relative jump by the address immediate.
    JumpImm = 0b100,
    /// Jump through the instruction-memory address register.
    JumpReg = 0b111,
}

impl Opcode {
    /// Converts a 3-bit opcode field into an assigned opcode.
    #[must_use]
    pub const fn from_u3(bits: u8) -> Option<Self> {
        match bits {
            0b000 => Some(Self::ArithLogicImm),
            0b001 => Some(Self::ArithLogic),
            0b010 => Some(Self::RegMemory),
            0b100 => Some(Self::JumpImm),
            0b111 => Some(Self::JumpReg),
            _ => None,
        }
    }

    /// Stable 3-bit field value.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// ALU function codes (bits 4..=7 of ALU instructions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum AluFunction {
    Add = 0b0000,
    Sub = 0b0001,
    And = 0b0010,
    Or = 0b0100,
    Xor = 0b0101,
    Inv = 0b0111,
}

impl AluFunction {
    /// Every assigned ALU function in encoding order.
    pub const ALL: [Self; 6] = [
        Self::Add,
        Self::Sub,
        Self::And,
        Self::Or,
        Self::Xor,
        Self::Inv,
    ];

    /// Converts a 4-bit function field into an ALU function.
    #[must_use]
    pub const fn from_u4(bits: u8) -> Option<Self> {
        match bits {
            0b0000 => Some(Self::Add),
            0b0001 => Some(Self::Sub),
            0b0010 => Some(Self::And),
            0b0100 => Some(Self::Or),
            0b0101 => Some(Self::Xor),
            0b0111 => Some(Self::Inv),
            _ => None,
        }
    }

    /// Stable 4-bit field value.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Assembly mnemonic of the register-operand form.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Inv => "INV",
        }
    }
}

/// Register/memory function codes (bits 4..=7 of `REG_MEMORY` instructions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum RegMemoryFunction {
    Load = 0b0000,
    Store = 0b0001,
    Get = 0b0010,
    Put = 0b0011,
    Set = 0b0100,
}

impl RegMemoryFunction {
    /// Converts a 4-bit function field into a register/memory function.
    #[must_use]
    pub const fn from_u4(bits: u8) -> Option<Self> {
        match bits {
            0b0000 => Some(Self::Load),
            0b0001 => Some(Self::Store),
            0b0010 => Some(Self::Get),
            0b0011 => Some(Self::Put),
            0b0100 => Some(Self::Set),
            _ => None,
        }
    }

    /// Stable 4-bit field value.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// Jump function codes (bits 4..=7 of `JUMP_REG` instructions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum JumpFunction {
    /// `PC = PC + IMAR`.
    Relative = 0b0000,
    /// `PC = IMAR`.
    Absolute = 0b0001,
}

impl JumpFunction {
    /// Converts a 4-bit function field into a jump function.
    #[must_use]
    pub const fn from_u4(bits: u8) -> Option<Self> {
        match bits {
            0b0000 => Some(Self::Relative),
            0b0001 => Some(Self::Absolute),
            _ => None,
        }
    }

    /// Stable 4-bit field value.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// Branch conditions evaluated against the committed status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum BranchCondition {
    Zero = 0b000,
    NotZero = 0b001,
    Positive = 0b010,
    Negative = 0b011,
    CarrySet = 0b100,
    CarryCleared = 0b101,
    OverflowSet = 0b110,
    OverflowCleared = 0b111,
}

impl BranchCondition {
    /// Every condition in encoding order.
    pub const ALL: [Self; 8] = [
        Self::Zero,
        Self::NotZero,
        Self::Positive,
        Self::Negative,
        Self::CarrySet,
        Self::CarryCleared,
        Self::OverflowSet,
        Self::OverflowCleared,
    ];

    /// Converts a 3-bit condition field. Every 3-bit value is assigned.
    #[must_use]
    pub const fn from_u3(bits: u8) -> Self {
        match bits & 0b111 {
            0b000 => Self::Zero,
            0b001 => Self::NotZero,
            0b010 => Self::Positive,
            0b011 => Self::Negative,
            0b100 => Self::CarrySet,
            0b101 => Self::CarryCleared,
            0b110 => Self::OverflowSet,
            _ => Self::OverflowCleared,
        }
    }

    /// Stable 3-bit field value.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Assembly mnemonic for a branch on this condition.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Zero => "BZ",
            Self::NotZero => "BNZ",
            Self::Positive => "BP",
            Self::Negative => "BN",
            Self::CarrySet => "BCS",
            Self::CarryCleared => "BCC",
            Self::OverflowSet => "BOS",
            Self::OverflowCleared => "BOC",
        }
    }
}

/// Architecturally visible registers addressed by the 4-bit register field.
///
/// Indices 11 and 12 are unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Register {
    /// General register 0.
    R0 = 0,
    /// General register 1.
    R1 = 1,
    /// General register 2.
    R2 = 2,
    /// General register 3.
    R3 = 3,
    /// General register 4.
    R4 = 4,
    /// General register 5.
    R5 = 5,
    /// General register 6.
    R6 = 6,
    /// General register 7.
    R7 = 7,
    /// Accumulator.
    Acc = 8,
    /// Data-memory base address register (high bits of DMAR).
    Dbar = 9,
    /// Data-memory offset register (low byte of DMAR).
    Doff = 10,
    /// Instruction-memory base address register (high bits of IMAR).
    Ibar = 13,
    /// Instruction-memory offset register (low byte of IMAR).
    Ioff = 14,
    /// Status flags.
    Status = 15,
}

/// Number of assigned registers.
pub const REGISTER_COUNT: usize = 14;

impl Register {
    /// Every assigned register in index order.
    pub const ALL: [Self; REGISTER_COUNT] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
        Self::Acc,
        Self::Dbar,
        Self::Doff,
        Self::Ibar,
        Self::Ioff,
        Self::Status,
    ];

    /// Converts a 4-bit register field.
    #[must_use]
    pub const fn from_u4(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::R0),
            1 => Some(Self::R1),
            2 => Some(Self::R2),
            3 => Some(Self::R3),
            4 => Some(Self::R4),
            5 => Some(Self::R5),
            6 => Some(Self::R6),
            7 => Some(Self::R7),
            8 => Some(Self::Acc),
            9 => Some(Self::Dbar),
            10 => Some(Self::Doff),
            13 => Some(Self::Ibar),
            14 => Some(Self::Ioff),
            15 => Some(Self::Status),
            _ => None,
        }
    }

    /// Stable 4-bit field value.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Dense storage slot (`0..REGISTER_COUNT`).
    #[must_use]
    pub const fn slot(self) -> usize {
        match self {
            Self::Ibar => 11,
            Self::Ioff => 12,
            Self::Status => 13,
            other => other as usize,
        }
    }

    /// Assembly name of this register.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::R0 => "R0",
            Self::R1 => "R1",
            Self::R2 => "R2",
            Self::R3 => "R3",
            Self::R4 => "R4",
            Self::R5 => "R5",
            Self::R6 => "R6",
            Self::R7 => "R7",
            Self::Acc => "ACC",
            Self::Dbar => "DBAR",
            Self::Doff => "DOFF",
            Self::Ibar => "IBAR",
            Self::Ioff => "IOFF",
            Self::Status => "STATUS",
        }
    }

    /// Case-insensitive lookup by assembly name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|register| register.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bit position of the conditional-branch flag.
pub const BRANCH_FLAG_SHIFT: u16 = 0;
/// Bit position of the opcode / branch-condition field.
pub const OPCODE_SHIFT: u16 = 1;
/// Bit position of the 12-bit address immediate.
pub const ADDRESS_IMMEDIATE_SHIFT: u16 = 4;
/// Bit position of the function-code field.
pub const FUNCTION_SHIFT: u16 = 4;
/// Bit position of the register-index field.
pub const REGISTER_SHIFT: u16 = 8;
/// Bit position of the 8-bit data immediate.
pub const DATA_IMMEDIATE_SHIFT: u16 = 8;

/// Raw fields sliced out of an instruction word. Fields overlap by design of
/// the ISA; which ones are meaningful depends on the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionFields {
    /// Bit 0.
    pub branch: bool,
    /// Bits 1..=3.
    pub opcode: u8,
    /// Bits 4..=15.
    pub address_immediate: u16,
    /// Bits 4..=7.
    pub function: u8,
    /// Bits 8..=11.
    pub register: u8,
    /// Bits 8..=15.
    pub data_immediate: u8,
}

impl InstructionFields {
    /// Slices every field out of `word`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn extract(word: InstructionWord) -> Self {
        let raw = word.value();
        Self {
            branch: (raw >> BRANCH_FLAG_SHIFT) & 0x1 == 1,
            opcode: ((raw >> OPCODE_SHIFT) & 0b111) as u8,
            address_immediate: (raw >> ADDRESS_IMMEDIATE_SHIFT) & 0x0FFF,
            function: ((raw >> FUNCTION_SHIFT) & 0xF) as u8,
            register: ((raw >> REGISTER_SHIFT) & 0xF) as u8,
            data_immediate: ((raw >> DATA_IMMEDIATE_SHIFT) & 0xFF) as u8,
        }
    }
}
