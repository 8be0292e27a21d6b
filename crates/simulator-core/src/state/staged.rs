/// A committed value paired with an optional value staged for the next cycle.
///
/// Reads always return the committed value. [`Staged::commit`] promotes the
/// staged value, [`Staged::discard`] drops it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Staged<T> {
    current: T,
    next: Option<T>,
}

impl<T: Copy> Staged<T> {
    /// Creates a slot holding `value` with nothing staged.
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self {
            current: value,
            next: None,
        }
    }

    /// Committed value.
    #[must_use]
    pub const fn current(&self) -> T {
        self.current
    }

    /// Value staged for the next commit, if any.
    #[must_use]
    pub const fn staged(&self) -> Option<T> {
        self.next
    }

    /// Stages `value`, replacing anything staged earlier in the cycle.
    pub fn stage(&mut self, value: T) {
        self.next = Some(value);
    }

    /// Promotes the staged value. Returns the new value when one was staged.
    pub fn commit(&mut self) -> Option<T> {
        match self.next.take() {
            Some(value) => {
                self.current = value;
                Some(value)
            }
            None => None,
        }
    }

    /// Drops the staged value without touching the committed one.
    pub fn discard(&mut self) {
        self.next = None;
    }
}

#[cfg(test)]
mod tests {
    use super::Staged;

    #[test]
    fn staged_value_is_invisible_until_commit() {
        let mut slot = Staged::new(1u8);
        slot.stage(2);
        assert_eq!(slot.current(), 1);
        assert_eq!(slot.staged(), Some(2));

        assert_eq!(slot.commit(), Some(2));
        assert_eq!(slot.current(), 2);
        assert_eq!(slot.staged(), None);
    }

    #[test]
    fn commit_without_staged_value_keeps_current() {
        let mut slot = Staged::new(7u8);
        assert_eq!(slot.commit(), None);
        assert_eq!(slot.current(), 7);
    }

    #[test]
    fn discard_drops_pending_write() {
        let mut slot = Staged::new(7u8);
        slot.stage(9);
        slot.discard();
        assert_eq!(slot.commit(), None);
        assert_eq!(slot.current(), 7);
    }
}
