//! Instruction and data memories behind a latency-modelled request port.

/// Data memory.
pub mod data;
/// Instruction memory and program loading.
pub mod instruction;
/// Shared request/poll handshake.
pub mod port;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use data::DataMemory;
pub use instruction::InstructionMemory;
pub use port::RequestPort;

/// Immutable view of a memory's cells and its outstanding request.
///
/// The cell map is shared with the memory until its next write, so taking a
/// snapshot does not copy the contents.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemorySnapshot<A: Ord, V> {
    /// Written cells keyed by address.
    pub cells: Arc<BTreeMap<A, V>>,
    /// Address of the outstanding request.
    pub pending_address: Option<A>,
    /// Value of the outstanding store.
    pub pending_data: Option<V>,
    /// Cycles until the outstanding request completes.
    pub remaining_cycles: Option<u32>,
}

impl<A, V> MemorySnapshot<A, V>
where
    A: Copy + Ord + Into<u16>,
    V: Copy + Eq + Into<u16>,
{
    fn capture(cells: &Arc<BTreeMap<A, V>>, port: &RequestPort<A, V>) -> Self {
        Self {
            cells: Arc::clone(cells),
            pending_address: port.pending_address(),
            pending_data: port.pending_data(),
            remaining_cycles: port.remaining_cycles(),
        }
    }

    /// Value at `address`, if written.
    #[must_use]
    pub fn get(&self, address: A) -> Option<V> {
        self.cells.get(&address).copied()
    }
}
