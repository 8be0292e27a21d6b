//! Mnemonic table mapping assembly names to instruction forms.

use simulator_core::{AluFunction, BranchCondition};

/// Instruction shape selected by a mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionForm {
    /// `ADD`..`XOR` with a register operand, or `INV` with none.
    Alu(AluFunction),
    /// `ADDI`..`XORI` with a data immediate.
    AluImmediate(AluFunction),
    /// `SET imm`.
    Set,
    /// `GET reg`.
    Get,
    /// `PUT reg`.
    Put,
    /// `LOAD`.
    Load,
    /// `STORE`.
    Store,
    /// `JMPI offset`.
    JumpImmediate,
    /// `JMPR`.
    JumpRelative,
    /// `JMP`.
    JumpAbsolute,
    /// `Bcc target`.
    Branch(BranchCondition),
    /// `NOP` macro for `ADDI 0`.
    Nop,
    /// `HALT` macro for `JMPI 0`.
    Halt,
}

/// Operand accepted by an instruction form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// No operand.
    None,
    /// Register name.
    Register,
    /// 8-bit data immediate.
    DataImmediate,
    /// 12-bit address immediate or label.
    AddressImmediate,
}

impl InstructionForm {
    /// Operand this form expects.
    #[must_use]
    pub const fn operand(self) -> OperandKind {
        match self {
            Self::Alu(AluFunction::Inv)
            | Self::Load
            | Self::Store
            | Self::JumpRelative
            | Self::JumpAbsolute
            | Self::Nop
            | Self::Halt => OperandKind::None,
            Self::Alu(_) | Self::Get | Self::Put => OperandKind::Register,
            Self::AluImmediate(_) | Self::Set => OperandKind::DataImmediate,
            Self::JumpImmediate | Self::Branch(_) => OperandKind::AddressImmediate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MnemonicEntry {
    name: &'static str,
    form: InstructionForm,
}

const fn entry(name: &'static str, form: InstructionForm) -> MnemonicEntry {
    MnemonicEntry { name, form }
}

const MNEMONIC_ENTRIES: &[MnemonicEntry] = &[
    entry("ADD", InstructionForm::Alu(AluFunction::Add)),
    entry("SUB", InstructionForm::Alu(AluFunction::Sub)),
    entry("AND", InstructionForm::Alu(AluFunction::And)),
    entry("OR", InstructionForm::Alu(AluFunction::Or)),
    entry("XOR", InstructionForm::Alu(AluFunction::Xor)),
    entry("INV", InstructionForm::Alu(AluFunction::Inv)),
    entry("ADDI", InstructionForm::AluImmediate(AluFunction::Add)),
    entry("SUBI", InstructionForm::AluImmediate(AluFunction::Sub)),
    entry("ANDI", InstructionForm::AluImmediate(AluFunction::And)),
    entry("ORI", InstructionForm::AluImmediate(AluFunction::Or)),
    entry("XORI", InstructionForm::AluImmediate(AluFunction::Xor)),
    entry("SET", InstructionForm::Set),
    entry("GET", InstructionForm::Get),
    entry("PUT", InstructionForm::Put),
    entry("LOAD", InstructionForm::Load),
    entry("STORE", InstructionForm::Store),
    entry("JMPI", InstructionForm::JumpImmediate),
    entry("JMPR", InstructionForm::JumpRelative),
    entry("JMP", InstructionForm::JumpAbsolute),
    entry("BZ", InstructionForm::Branch(BranchCondition::Zero)),
    entry("BNZ", InstructionForm::Branch(BranchCondition::NotZero)),
    entry("BP", InstructionForm::Branch(BranchCondition::Positive)),
    entry("BN", InstructionForm::Branch(BranchCondition::Negative)),
    entry("BCS", InstructionForm::Branch(BranchCondition::CarrySet)),
    entry("BCC", InstructionForm::Branch(BranchCondition::CarryCleared)),
    entry("BOS", InstructionForm::Branch(BranchCondition::OverflowSet)),
    entry("BOC", InstructionForm::Branch(BranchCondition::OverflowCleared)),
    entry("NOP", InstructionForm::Nop),
    entry("HALT", InstructionForm::Halt),
];

/// Resolves a mnemonic to its instruction form.
///
/// Matching is ASCII case-insensitive.
#[must_use]
pub fn resolve_mnemonic(name: &str) -> Option<InstructionForm> {
    MNEMONIC_ENTRIES
        .iter()
        .find(|entry| entry.name.eq_ignore_ascii_case(name))
        .map(|entry| entry.form)
}
