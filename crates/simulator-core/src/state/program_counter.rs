use crate::bus::{InstructionAddress, INSTRUCTION_BYTES};
use crate::encoding::BranchCondition;
use crate::fault::ProgramCounterFault;
use crate::state::{Staged, StatusFlags};

/// Distance between consecutive instructions in the byte-addressed
/// instruction memory.
#[allow(clippy::cast_possible_truncation)]
pub const INSTRUCTION_STRIDE: InstructionAddress =
    InstructionAddress::wrapping(INSTRUCTION_BYTES as u16);

/// Program counter with a staged next address and a stall latch.
///
/// While the latch is set, commit keeps the current address so a stalled
/// instruction is fetched again on the next cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgramCounter {
    address: Staged<InstructionAddress>,
    stalled: bool,
}

impl ProgramCounter {
    /// Program counter at address zero with the latch clear.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            address: Staged::new(InstructionAddress::ZERO),
            stalled: false,
        }
    }

    /// Committed address of the instruction being executed.
    #[must_use]
    pub const fn current_address(&self) -> InstructionAddress {
        self.address.current()
    }

    /// Address staged for the next commit.
    #[must_use]
    pub const fn staged_address(&self) -> Option<InstructionAddress> {
        self.address.staged()
    }

    /// Sets or clears the stall latch.
    pub fn set_stall(&mut self, stalled: bool) {
        self.stalled = stalled;
    }

    /// Returns true while the stall latch is set.
    #[must_use]
    pub const fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// Stages the address of the next sequential instruction.
    pub fn increment(&mut self) {
        self.address.stage(self.current_address().wrapping_add(INSTRUCTION_STRIDE));
    }

    /// Stages `target` when `condition` holds for `status`, otherwise the
    /// next sequential instruction.
    pub fn conditionally_branch(
        &mut self,
        status: StatusFlags,
        target: InstructionAddress,
        condition: BranchCondition,
    ) {
        if status.satisfies(condition) {
            self.address.stage(target);
        } else {
            self.increment();
        }
    }

    /// Stages the current address plus `offset`, wrapping at the address width.
    pub fn jump_relative(&mut self, offset: InstructionAddress) {
        self.address.stage(self.current_address().wrapping_add(offset));
    }

    /// Stages `target` unchanged.
    pub fn jump_absolute(&mut self, target: InstructionAddress) {
        self.address.stage(target);
    }

    /// Promotes the staged address unless the stall latch is set.
    ///
    /// # Errors
    ///
    /// Returns [`ProgramCounterFault::NoStagedValue`] when a non-stalled
    /// cycle never staged a next address.
    pub fn commit(&mut self) -> Result<(), ProgramCounterFault> {
        if self.stalled {
            self.address.discard();
            return Ok(());
        }
        self.address
            .commit()
            .map(|_| ())
            .ok_or(ProgramCounterFault::NoStagedValue)
    }

    /// Committed address and latch state.
    #[must_use]
    pub const fn snapshot(&self) -> ProgramCounterSnapshot {
        ProgramCounterSnapshot {
            address: self.current_address(),
            stalled: self.stalled,
        }
    }
}

/// Immutable copy of the program counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ProgramCounterSnapshot {
    /// Committed instruction address.
    pub address: InstructionAddress,
    /// Stall latch at snapshot time.
    pub stalled: bool,
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::ProgramCounter;
    use crate::bus::InstructionAddress;
    use crate::encoding::BranchCondition;
    use crate::fault::ProgramCounterFault;
    use crate::state::StatusFlags;

    fn at(address: u16) -> ProgramCounter {
        let mut pc = ProgramCounter::new();
        pc.jump_absolute(InstructionAddress::wrapping(address));
        pc.commit().expect("address was staged");
        pc
    }

    #[test]
    fn increment_advances_by_one_instruction() {
        let mut pc = at(0x010);
        pc.increment();
        assert_eq!(pc.current_address().value(), 0x010);
        pc.commit().expect("address was staged");
        assert_eq!(pc.current_address().value(), 0x012);
    }

    #[test]
    fn increment_wraps_at_end_of_address_space() {
        let mut pc = at(0xFFE);
        pc.increment();
        pc.commit().expect("address was staged");
        assert_eq!(pc.current_address().value(), 0x000);
    }

    #[test]
    fn taken_branch_goes_to_target_and_untaken_falls_through() {
        let carry = StatusFlags {
            carry: true,
            ..StatusFlags::default()
        };
        let target = InstructionAddress::wrapping(0x100);

        let mut pc = at(0x020);
        pc.conditionally_branch(carry, target, BranchCondition::CarrySet);
        pc.commit().expect("address was staged");
        assert_eq!(pc.current_address(), target);

        let mut pc = at(0x020);
        pc.conditionally_branch(carry, target, BranchCondition::CarryCleared);
        pc.commit().expect("address was staged");
        assert_eq!(pc.current_address().value(), 0x022);
    }

    #[test]
    fn stall_latch_holds_current_address() {
        let mut pc = at(0x040);
        pc.increment();
        pc.set_stall(true);
        pc.commit().expect("stalled commit never faults");
        assert_eq!(pc.current_address().value(), 0x040);
        assert!(pc.snapshot().stalled);

        pc.set_stall(false);
        pc.increment();
        pc.commit().expect("address was staged");
        assert_eq!(pc.current_address().value(), 0x042);
    }

    #[test]
    fn commit_without_staged_address_faults() {
        let mut pc = ProgramCounter::new();
        assert_eq!(pc.commit(), Err(ProgramCounterFault::NoStagedValue));
    }

    proptest! {
        #[test]
        fn relative_jump_wraps_at_twelve_bits(start in 0u16..0x1000, offset in 0u16..0x1000) {
            let mut pc = at(start);
            pc.jump_relative(InstructionAddress::wrapping(offset));
            pc.commit().expect("address was staged");
            prop_assert_eq!(pc.current_address().value(), (start + offset) % 0x1000);
        }
    }
}
