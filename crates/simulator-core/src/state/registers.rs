use crate::bus::{
    DataAddress, DataValue, InstructionAddress, DATA_ADDRESS_WIDTH, DATA_WIDTH,
    INSTRUCTION_ADDRESS_WIDTH,
};
use crate::encoding::{BranchCondition, Register, REGISTER_COUNT};
use crate::fault::RegisterFault;
use crate::state::Staged;

/// `STATUS` bit set when the accumulator is zero.
pub const STATUS_ZERO: u8 = 1 << 0;
/// `STATUS` bit set when the accumulator is non-negative.
pub const STATUS_POSITIVE: u8 = 1 << 1;
/// `STATUS` bit holding the last ALU carry/borrow.
pub const STATUS_CARRY: u8 = 1 << 2;
/// `STATUS` bit holding the last ALU signed overflow.
pub const STATUS_OVERFLOW: u8 = 1 << 3;
/// `STATUS` after reset: a zero accumulator is both zero and positive.
pub const STATUS_RESET: u8 = STATUS_ZERO | STATUS_POSITIVE;

/// Decoded view of the `STATUS` register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct StatusFlags {
    /// Accumulator is zero.
    pub zero: bool,
    /// Accumulator is non-negative.
    pub positive: bool,
    /// Last ALU carry (borrow for `SUB`).
    pub carry: bool,
    /// Last ALU signed overflow.
    pub signed_overflow: bool,
}

impl StatusFlags {
    /// Decodes the flag bits of a `STATUS` value.
    #[must_use]
    pub const fn from_value(value: DataValue) -> Self {
        let bits = value.unsigned();
        Self {
            zero: bits & STATUS_ZERO != 0,
            positive: bits & STATUS_POSITIVE != 0,
            carry: bits & STATUS_CARRY != 0,
            signed_overflow: bits & STATUS_OVERFLOW != 0,
        }
    }

    /// Encodes the flags back into a `STATUS` value.
    #[must_use]
    pub const fn to_value(self) -> DataValue {
        let mut bits = 0;
        if self.zero {
            bits |= STATUS_ZERO;
        }
        if self.positive {
            bits |= STATUS_POSITIVE;
        }
        if self.carry {
            bits |= STATUS_CARRY;
        }
        if self.signed_overflow {
            bits |= STATUS_OVERFLOW;
        }
        DataValue::new(bits)
    }

    /// Evaluates a branch condition against these flags.
    #[must_use]
    pub const fn satisfies(self, condition: BranchCondition) -> bool {
        match condition {
            BranchCondition::Zero => self.zero,
            BranchCondition::NotZero => !self.zero,
            BranchCondition::Positive => self.positive,
            BranchCondition::Negative => !self.positive,
            BranchCondition::CarrySet => self.carry,
            BranchCondition::CarryCleared => !self.carry,
            BranchCondition::OverflowSet => self.signed_overflow,
            BranchCondition::OverflowCleared => !self.signed_overflow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingAluFlags {
    signed_overflow: bool,
    carry: bool,
}

/// Register file: accumulator, general registers, address registers and
/// `STATUS`, each as a committed value plus a staged next value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    cells: [Staged<DataValue>; REGISTER_COUNT],
    pending_flags: Option<PendingAluFlags>,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    /// Reset state: every register zero, `STATUS` = zero | positive.
    #[must_use]
    pub fn new() -> Self {
        let mut cells = [Staged::new(DataValue::ZERO); REGISTER_COUNT];
        cells[Register::Status.slot()] = Staged::new(DataValue::new(STATUS_RESET));
        Self {
            cells,
            pending_flags: None,
        }
    }

    /// Committed accumulator.
    #[must_use]
    pub const fn acc(&self) -> DataValue {
        self.cells[Register::Acc.slot()].current()
    }

    /// Stages the next accumulator value.
    pub fn set_next_acc(&mut self, value: DataValue) {
        self.cells[Register::Acc.slot()].stage(value);
    }

    /// Committed value of `register`.
    #[must_use]
    pub const fn register(&self, register: Register) -> DataValue {
        self.cells[register.slot()].current()
    }

    /// Stages the next value of `register`.
    ///
    /// # Errors
    ///
    /// Returns [`RegisterFault::WriteProtected`] for `ACC` and `STATUS`, which
    /// change only through the accumulator path and the ALU flags.
    pub fn set_next_register(
        &mut self,
        register: Register,
        value: DataValue,
    ) -> Result<(), RegisterFault> {
        if matches!(register, Register::Acc | Register::Status) {
            return Err(RegisterFault::WriteProtected(register));
        }
        self.cells[register.slot()].stage(value);
        Ok(())
    }

    /// Committed `STATUS` flags.
    #[must_use]
    pub const fn status(&self) -> StatusFlags {
        StatusFlags::from_value(self.register(Register::Status))
    }

    /// Stages the ALU-owned `STATUS` bits.
    pub fn set_next_status(&mut self, signed_overflow: bool, carry: bool) {
        self.pending_flags = Some(PendingAluFlags {
            signed_overflow,
            carry,
        });
    }

    /// DMAR: low bits of `DBAR` above the full `DOFF` byte.
    #[must_use]
    pub const fn data_address_register(&self) -> DataAddress {
        let base = self.register(Register::Dbar).unsigned() as u16;
        let offset = self.register(Register::Doff).unsigned() as u16;
        let base_mask = (1 << (DATA_ADDRESS_WIDTH - DATA_WIDTH)) - 1;
        DataAddress::wrapping(((base & base_mask) << DATA_WIDTH) | offset)
    }

    /// IMAR: low bits of `IBAR` above the full `IOFF` byte.
    #[must_use]
    pub const fn instr_address_register(&self) -> InstructionAddress {
        let base = self.register(Register::Ibar).unsigned() as u16;
        let offset = self.register(Register::Ioff).unsigned() as u16;
        let base_mask = (1 << (INSTRUCTION_ADDRESS_WIDTH - DATA_WIDTH)) - 1;
        InstructionAddress::wrapping(((base & base_mask) << DATA_WIDTH) | offset)
    }

    /// Staged accumulator, if any.
    #[must_use]
    pub const fn staged_acc(&self) -> Option<DataValue> {
        self.cells[Register::Acc.slot()].staged()
    }

    /// Returns true when nothing is staged.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending_flags.is_none() && self.cells.iter().all(|cell| cell.staged().is_none())
    }

    /// Promotes every staged value and recomputes `STATUS`.
    ///
    /// Zero and positive follow a newly committed accumulator; carry and
    /// overflow follow staged ALU flags. Bits without a new source keep
    /// their committed value.
    pub fn commit(&mut self) {
        let mut flags = self.status();
        let new_acc = self.cells[Register::Acc.slot()].commit();
        for cell in &mut self.cells {
            cell.commit();
        }
        if let Some(acc) = new_acc {
            flags.zero = acc.is_zero();
            flags.positive = !acc.is_negative();
        }
        if let Some(pending) = self.pending_flags.take() {
            flags.carry = pending.carry;
            flags.signed_overflow = pending.signed_overflow;
        }
        self.cells[Register::Status.slot()] = Staged::new(flags.to_value());
    }

    /// Drops every staged value.
    pub fn discard(&mut self) {
        for cell in &mut self.cells {
            cell.discard();
        }
        self.pending_flags = None;
    }

    /// Committed register values.
    #[must_use]
    pub fn snapshot(&self) -> RegisterFileSnapshot {
        RegisterFileSnapshot {
            values: self.cells.map(|cell| cell.current()),
        }
    }
}

/// Immutable copy of the committed register values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFileSnapshot {
    values: [DataValue; REGISTER_COUNT],
}

impl RegisterFileSnapshot {
    /// Value of `register` at snapshot time.
    #[must_use]
    pub const fn get(&self, register: Register) -> DataValue {
        self.values[register.slot()]
    }

    /// Accumulator at snapshot time.
    #[must_use]
    pub const fn acc(&self) -> DataValue {
        self.get(Register::Acc)
    }

    /// Decoded `STATUS` at snapshot time.
    #[must_use]
    pub const fn status(&self) -> StatusFlags {
        StatusFlags::from_value(self.get(Register::Status))
    }

    /// Registers in index order with their values.
    pub fn iter(&self) -> impl Iterator<Item = (Register, DataValue)> + '_ {
        Register::ALL
            .into_iter()
            .map(|register| (register, self.get(register)))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{RegisterFile, StatusFlags, STATUS_RESET};
    use crate::bus::DataValue;
    use crate::encoding::{BranchCondition, Register};
    use crate::fault::RegisterFault;

    #[test]
    fn reset_state_has_zero_registers_and_zero_positive_status() {
        let file = RegisterFile::new();
        for register in Register::ALL {
            if register != Register::Status {
                assert_eq!(file.register(register), DataValue::ZERO);
            }
        }
        assert_eq!(file.register(Register::Status).unsigned(), STATUS_RESET);
        assert!(file.status().zero);
        assert!(file.status().positive);
    }

    #[test]
    fn staged_writes_become_visible_only_after_commit() {
        let mut file = RegisterFile::new();
        file.set_next_acc(DataValue::new(42));
        file.set_next_register(Register::R3, DataValue::new(7))
            .expect("R3 is writable");

        assert_eq!(file.acc(), DataValue::ZERO);
        assert_eq!(file.register(Register::R3), DataValue::ZERO);

        file.commit();
        assert_eq!(file.acc(), DataValue::new(42));
        assert_eq!(file.register(Register::R3), DataValue::new(7));
        assert!(file.is_idle());
    }

    #[rstest]
    #[case(Register::Acc)]
    #[case(Register::Status)]
    fn implicit_registers_reject_direct_writes(#[case] register: Register) {
        let mut file = RegisterFile::new();
        assert_eq!(
            file.set_next_register(register, DataValue::new(1)),
            Err(RegisterFault::WriteProtected(register))
        );
    }

    #[test]
    fn committed_accumulator_drives_zero_and_positive_flags() {
        let mut file = RegisterFile::new();
        file.set_next_acc(DataValue::new(0x80));
        file.commit();
        let flags = file.status();
        assert!(!flags.zero);
        assert!(!flags.positive);

        file.set_next_acc(DataValue::ZERO);
        file.commit();
        assert!(file.status().zero);
        assert!(file.status().positive);
    }

    #[test]
    fn alu_flags_persist_until_the_next_alu_result() {
        let mut file = RegisterFile::new();
        file.set_next_acc(DataValue::new(1));
        file.set_next_status(true, true);
        file.commit();
        assert!(file.status().carry);
        assert!(file.status().signed_overflow);

        file.set_next_acc(DataValue::new(2));
        file.commit();
        assert!(file.status().carry);

        file.set_next_status(false, false);
        file.commit();
        assert!(!file.status().carry);
        assert!(!file.status().signed_overflow);
    }

    #[test]
    fn discard_drops_staged_values_and_flags() {
        let mut file = RegisterFile::new();
        file.set_next_acc(DataValue::new(9));
        file.set_next_status(false, true);
        file.discard();
        file.commit();
        assert_eq!(file.acc(), DataValue::ZERO);
        assert!(!file.status().carry);
    }

    #[test]
    fn address_registers_concatenate_base_and_offset() {
        let mut file = RegisterFile::new();
        for (register, value) in [
            (Register::Dbar, 0xF1),
            (Register::Doff, 0x23),
            (Register::Ibar, 0x02),
            (Register::Ioff, 0x10),
        ] {
            file.set_next_register(register, DataValue::new(value))
                .expect("address registers are writable");
        }
        file.commit();
        assert_eq!(file.data_address_register().value(), 0x123);
        assert_eq!(file.instr_address_register().value(), 0x210);
    }

    #[rstest]
    #[case(BranchCondition::Zero, false)]
    #[case(BranchCondition::NotZero, true)]
    #[case(BranchCondition::Positive, true)]
    #[case(BranchCondition::Negative, false)]
    #[case(BranchCondition::CarrySet, true)]
    #[case(BranchCondition::CarryCleared, false)]
    #[case(BranchCondition::OverflowSet, false)]
    #[case(BranchCondition::OverflowCleared, true)]
    fn branch_conditions_read_the_matching_flag(
        #[case] condition: BranchCondition,
        #[case] taken: bool,
    ) {
        let flags = StatusFlags {
            zero: false,
            positive: true,
            carry: true,
            signed_overflow: false,
        };
        assert_eq!(flags.satisfies(condition), taken);
    }

    #[test]
    fn snapshot_lists_every_register() {
        let mut file = RegisterFile::new();
        file.set_next_acc(DataValue::new(5));
        file.commit();
        let snapshot = file.snapshot();
        assert_eq!(snapshot.acc(), DataValue::new(5));
        assert_eq!(snapshot.iter().count(), Register::ALL.len());
        assert_eq!(snapshot.status(), file.status());
    }
}
