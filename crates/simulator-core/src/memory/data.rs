use std::collections::BTreeMap;
use std::sync::Arc;

use crate::bus::{DataAddress, DataValue};
use crate::fault::MemoryFault;
use crate::memory::{MemorySnapshot, RequestPort};

/// Sparse data store with separate load and store latencies.
///
/// Loads and stores share one outstanding request. Cells that were never
/// stored read as a segmentation fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMemory {
    cells: Arc<BTreeMap<DataAddress, DataValue>>,
    port: RequestPort<DataAddress, DataValue>,
    load_latency: u32,
    store_latency: u32,
}

impl DataMemory {
    /// Empty memory with the given latencies.
    #[must_use]
    pub fn new(load_latency: u32, store_latency: u32) -> Self {
        Self {
            cells: Arc::default(),
            port: RequestPort::new("data memory"),
            load_latency,
            store_latency,
        }
    }

    /// Starts (or repeats) a load from `address`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::ConflictingAddress`] when a request for another
    /// address is pending.
    pub fn request_load(&mut self, address: DataAddress) -> Result<(), MemoryFault> {
        self.port.start(address, None, self.load_latency)
    }

    /// Returns true once the pending load has waited out its latency.
    pub fn load_ready(&mut self) -> bool {
        self.port.poll()
    }

    /// Collects the loaded value and clears the request.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::NoPendingRead`] without a pending load and
    /// [`MemoryFault::SegmentationFault`] for a never-written cell.
    pub fn load_result(&mut self) -> Result<DataValue, MemoryFault> {
        let address = self.port.take_read()?;
        self.cells
            .get(&address)
            .copied()
            .ok_or(MemoryFault::SegmentationFault {
                memory: self.port.name(),
                address: address.value(),
            })
    }

    /// Starts (or repeats) a store of `value` to `address`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::ConflictingAddress`] or
    /// [`MemoryFault::ConflictingData`] when a different request is pending.
    pub fn request_store(
        &mut self,
        address: DataAddress,
        value: DataValue,
    ) -> Result<(), MemoryFault> {
        self.port.start(address, Some(value), self.store_latency)
    }

    /// Returns true once the pending store has waited out its latency; the
    /// value is written to its cell at that point.
    pub fn store_complete(&mut self) -> bool {
        let complete = self.port.poll();
        if complete {
            if let Some((address, Some(value))) = self.port.take() {
                Arc::make_mut(&mut self.cells).insert(address, value);
            }
        }
        complete
    }

    /// Value stored at `address`, bypassing the request protocol.
    #[must_use]
    pub fn peek(&self, address: DataAddress) -> Option<DataValue> {
        self.cells.get(&address).copied()
    }

    /// Written cells in address order.
    pub fn written_cells(&self) -> impl Iterator<Item = (DataAddress, DataValue)> + '_ {
        self.cells.iter().map(|(address, value)| (*address, *value))
    }

    /// Advances the latency counter.
    pub fn commit(&mut self) {
        self.port.tick();
    }

    /// Written cells and the outstanding request.
    #[must_use]
    pub fn snapshot(&self) -> MemorySnapshot<DataAddress, DataValue> {
        MemorySnapshot::capture(&self.cells, &self.port)
    }
}
