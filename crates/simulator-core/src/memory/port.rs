use crate::fault::MemoryFault;

/// Request/poll handshake shared by the instruction and data memories.
///
/// A request latches an address (and, for stores, a value) and starts a
/// latency counter. Re-issuing the same request while it is pending is a
/// no-op; a request for anything else fails. The counter advances only in
/// [`RequestPort::tick`], so the result becomes visible on a later cycle
/// unless the latency is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPort<A, V> {
    name: &'static str,
    pending_address: Option<A>,
    pending_data: Option<V>,
    remaining_cycles: Option<u32>,
}

impl<A, V> RequestPort<A, V>
where
    A: Copy + Eq + Into<u16>,
    V: Copy + Eq + Into<u16>,
{
    /// Idle port reporting faults under `name`.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            pending_address: None,
            pending_data: None,
            remaining_cycles: None,
        }
    }

    /// Memory name used in fault messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Latches a request. The counter starts at `latency` only when no
    /// counter is already running.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::ConflictingAddress`] or
    /// [`MemoryFault::ConflictingData`] when a different request is pending.
    pub fn start(&mut self, address: A, data: Option<V>, latency: u32) -> Result<(), MemoryFault> {
        if let Some(pending) = self.pending_address {
            if pending != address {
                return Err(MemoryFault::ConflictingAddress {
                    memory: self.name,
                    pending: pending.into(),
                    requested: address.into(),
                });
            }
        }
        if let (Some(pending), Some(requested)) = (self.pending_data, data) {
            if pending != requested {
                return Err(MemoryFault::ConflictingData {
                    memory: self.name,
                    pending: pending.into(),
                    requested: requested.into(),
                });
            }
        }
        self.pending_address = Some(address);
        self.pending_data = data;
        if self.remaining_cycles.is_none() {
            self.remaining_cycles = Some(latency);
        }
        Ok(())
    }

    /// Returns true once the latency has elapsed, and stops the counter.
    pub fn poll(&mut self) -> bool {
        let complete = self.remaining_cycles == Some(0);
        if complete {
            self.remaining_cycles = None;
        }
        complete
    }

    /// Address of the outstanding request.
    #[must_use]
    pub const fn pending_address(&self) -> Option<A> {
        self.pending_address
    }

    /// Value carried by the outstanding store.
    #[must_use]
    pub const fn pending_data(&self) -> Option<V> {
        self.pending_data
    }

    /// Cycles left before the outstanding request completes.
    #[must_use]
    pub const fn remaining_cycles(&self) -> Option<u32> {
        self.remaining_cycles
    }

    /// Takes the outstanding request, leaving the port idle.
    pub fn take(&mut self) -> Option<(A, Option<V>)> {
        let address = self.pending_address.take()?;
        Some((address, self.pending_data.take()))
    }

    /// Takes the outstanding address for a read.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::NoPendingRead`] when nothing was requested.
    pub fn take_read(&mut self) -> Result<A, MemoryFault> {
        self.take()
            .map(|(address, _)| address)
            .ok_or(MemoryFault::NoPendingRead { memory: self.name })
    }

    /// Advances the latency counter by one cycle.
    pub fn tick(&mut self) {
        if let Some(remaining) = self.remaining_cycles.as_mut() {
            *remaining = remaining.saturating_sub(1);
        }
    }

    /// Drops any outstanding request.
    pub fn clear(&mut self) {
        self.pending_address = None;
        self.pending_data = None;
        self.remaining_cycles = None;
    }
}

#[cfg(test)]
mod tests {
    use super::RequestPort;
    use crate::fault::MemoryFault;

    fn port() -> RequestPort<u16, u16> {
        RequestPort::new("test memory")
    }

    #[test]
    fn request_completes_after_latency_ticks() {
        let mut port = port();
        port.start(4, None, 2).expect("idle port accepts request");
        assert!(!port.poll());
        port.tick();
        assert!(!port.poll());
        port.tick();
        assert!(port.poll());
        assert_eq!(port.remaining_cycles(), None);
    }

    #[test]
    fn zero_latency_is_ready_immediately() {
        let mut port = port();
        port.start(4, None, 0).expect("idle port accepts request");
        assert!(port.poll());
    }

    #[test]
    fn repeated_request_keeps_running_counter() {
        let mut port = port();
        port.start(4, Some(9), 3).expect("idle port accepts request");
        port.tick();
        port.start(4, Some(9), 3).expect("identical request is idempotent");
        assert_eq!(port.remaining_cycles(), Some(2));
    }

    #[test]
    fn conflicting_requests_are_rejected() {
        let mut port = port();
        port.start(4, Some(9), 3).expect("idle port accepts request");
        assert!(matches!(
            port.start(5, Some(9), 3),
            Err(MemoryFault::ConflictingAddress {
                pending: 4,
                requested: 5,
                ..
            })
        ));
        assert!(matches!(
            port.start(4, Some(8), 3),
            Err(MemoryFault::ConflictingData {
                pending: 9,
                requested: 8,
                ..
            })
        ));
    }

    #[test]
    fn read_without_request_faults() {
        let mut port = port();
        assert_eq!(
            port.take_read(),
            Err(MemoryFault::NoPendingRead {
                memory: "test memory"
            })
        );
    }

    #[test]
    fn tick_never_underflows() {
        let mut port = port();
        port.start(1, None, 0).expect("idle port accepts request");
        port.tick();
        assert_eq!(port.remaining_cycles(), Some(0));
    }
}
