use std::collections::BTreeMap;
use std::sync::Arc;

use crate::bus::{
    InstructionAddress, InstructionWord, INSTRUCTION_ADDRESS_SPACE, INSTRUCTION_BYTES,
};
use crate::fault::MemoryFault;
use crate::memory::{MemorySnapshot, RequestPort};

/// Byte-addressed program store with a fixed fetch latency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionMemory {
    words: Arc<BTreeMap<InstructionAddress, InstructionWord>>,
    port: RequestPort<InstructionAddress, InstructionWord>,
    fetch_latency: u32,
}

impl InstructionMemory {
    /// Empty memory whose fetches take `fetch_latency` commits to complete.
    #[must_use]
    pub fn new(fetch_latency: u32) -> Self {
        Self {
            words: Arc::default(),
            port: RequestPort::new("instruction memory"),
            fetch_latency,
        }
    }

    /// Replaces the memory contents with `binary`.
    ///
    /// Each complete two-byte chunk is stored at its byte offset; a trailing
    /// odd byte is ignored. Any outstanding fetch is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::ProgramTooLarge`] when `binary` does not fit
    /// the address space; the memory is left unchanged.
    pub fn side_load(&mut self, binary: &[u8]) -> Result<(), MemoryFault> {
        if binary.len() > INSTRUCTION_ADDRESS_SPACE {
            return Err(MemoryFault::ProgramTooLarge {
                len: binary.len(),
                capacity: INSTRUCTION_ADDRESS_SPACE,
            });
        }
        self.port.clear();
        let words = binary
            .chunks_exact(INSTRUCTION_BYTES)
            .enumerate()
            .map(|(index, chunk)| {
                #[allow(clippy::cast_possible_truncation)]
                let address = InstructionAddress::wrapping((index * INSTRUCTION_BYTES) as u16);
                (address, InstructionWord::from_le_bytes([chunk[0], chunk[1]]))
            })
            .collect();
        self.words = Arc::new(words);
        Ok(())
    }

    /// Starts (or repeats) a fetch of the word at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::ConflictingAddress`] when a fetch of another
    /// address is still pending.
    pub fn request_fetch(&mut self, address: InstructionAddress) -> Result<(), MemoryFault> {
        self.port.start(address, None, self.fetch_latency)
    }

    /// Returns true once the pending fetch has waited out its latency.
    pub fn fetch_ready(&mut self) -> bool {
        self.port.poll()
    }

    /// Collects the fetched word and clears the request.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::NoPendingRead`] without a pending fetch and
    /// [`MemoryFault::SegmentationFault`] when the address holds no
    /// instruction.
    pub fn fetch_result(&mut self) -> Result<InstructionWord, MemoryFault> {
        let address = self.port.take_read()?;
        self.words
            .get(&address)
            .copied()
            .ok_or(MemoryFault::SegmentationFault {
                memory: self.port.name(),
                address: address.value(),
            })
    }

    /// Word stored at `address`, bypassing the request protocol.
    #[must_use]
    pub fn peek(&self, address: InstructionAddress) -> Option<InstructionWord> {
        self.words.get(&address).copied()
    }

    /// Number of loaded instruction words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns true when no program is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Advances the fetch latency counter.
    pub fn commit(&mut self) {
        self.port.tick();
    }

    /// Loaded words and the outstanding request.
    #[must_use]
    pub fn snapshot(&self) -> MemorySnapshot<InstructionAddress, InstructionWord> {
        MemorySnapshot::capture(&self.words, &self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::InstructionMemory;
    use crate::bus::{InstructionAddress, InstructionWord, INSTRUCTION_ADDRESS_SPACE};
    use crate::fault::MemoryFault;

    fn address(value: u16) -> InstructionAddress {
        InstructionAddress::wrapping(value)
    }

    #[test]
    fn side_load_places_words_at_byte_offsets() {
        let mut memory = InstructionMemory::new(0);
        memory
            .side_load(&[0x44, 0x05, 0x08, 0x00, 0xFF])
            .expect("program fits");
        assert_eq!(memory.len(), 2);
        assert_eq!(memory.peek(address(0)), Some(InstructionWord::new(0x0544)));
        assert_eq!(memory.peek(address(2)), Some(InstructionWord::new(0x0008)));
        assert_eq!(memory.peek(address(4)), None);
    }

    #[test]
    fn side_load_replaces_previous_program() {
        let mut memory = InstructionMemory::new(0);
        memory.side_load(&[1, 0, 2, 0]).expect("program fits");
        memory.side_load(&[3, 0]).expect("program fits");
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.peek(address(2)), None);
    }

    #[test]
    fn oversized_program_is_rejected() {
        let mut memory = InstructionMemory::new(0);
        let image = vec![0; INSTRUCTION_ADDRESS_SPACE + 2];
        assert_eq!(
            memory.side_load(&image),
            Err(MemoryFault::ProgramTooLarge {
                len: INSTRUCTION_ADDRESS_SPACE + 2,
                capacity: INSTRUCTION_ADDRESS_SPACE,
            })
        );
    }

    #[test]
    fn fetch_waits_for_latency() {
        let mut memory = InstructionMemory::new(2);
        memory.side_load(&[0x08, 0x00]).expect("program fits");

        memory.request_fetch(address(0)).expect("idle memory");
        assert!(!memory.fetch_ready());
        memory.commit();
        memory.request_fetch(address(0)).expect("same fetch repeats");
        assert!(!memory.fetch_ready());
        memory.commit();
        memory.request_fetch(address(0)).expect("same fetch repeats");
        assert!(memory.fetch_ready());
        assert_eq!(
            memory.fetch_result().expect("word is loaded"),
            InstructionWord::new(0x0008)
        );
    }

    #[test]
    fn fetching_past_the_program_is_a_segmentation_fault() {
        let mut memory = InstructionMemory::new(0);
        memory.side_load(&[0x08, 0x00]).expect("program fits");
        memory.request_fetch(address(2)).expect("idle memory");
        assert!(memory.fetch_ready());
        let fault = memory.fetch_result().expect_err("address 2 is empty");
        assert!(matches!(
            fault,
            MemoryFault::SegmentationFault { address: 2, .. }
        ));
    }

    #[test]
    fn conflicting_fetch_is_rejected() {
        let mut memory = InstructionMemory::new(5);
        memory.request_fetch(address(0)).expect("idle memory");
        assert!(memory.request_fetch(address(2)).is_err());
    }
}
