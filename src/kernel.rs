//! The virtual-time discrete-event kernel (§4.1 of `SPEC_FULL.md`).

use log::trace;

use crate::event::{KernelEvent, TimeQueue};
use crate::types::{vtime, VirtualTime};

/// Virtual-time scheduler. Owns the event queue and the simulation clock;
/// knows nothing about routers, links, or the protocol — dispatch is
/// performed by [`crate::simulation::Simulation`], which owns the router and
/// link registries this kernel's events refer to.
#[derive(Debug)]
pub struct Kernel {
    now: VirtualTime,
    queue: TimeQueue<KernelEvent>,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel {
    /// Create a kernel with the clock at zero and an empty queue.
    pub fn new() -> Self {
        Self {
            now: vtime(0.0),
            queue: TimeQueue::new(),
        }
    }

    /// The current simulation clock. Monotonically non-decreasing.
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Schedule `event` to be dispatched at an absolute virtual time.
    /// Panics (via [`crate::types::vtime`]) if `at` is in the past relative
    /// to `now()` minus floating point slop is not checked here: callers
    /// exclusively schedule relative to `now()` via [`Self::schedule_after`],
    /// which cannot go backwards.
    pub fn schedule_at(&mut self, at: VirtualTime, event: KernelEvent) {
        self.queue.push(at, event);
    }

    /// Schedule `event` to be dispatched after `delay` virtual time units
    /// from now. `delay` of `0.0` still runs strictly after any
    /// already-pending event at the current timestamp (§5).
    pub fn schedule_after(&mut self, delay: f64, event: KernelEvent) {
        debug_assert!(delay >= 0.0, "delay must not be negative");
        self.schedule_at(vtime(self.now.into_inner() + delay), event);
    }

    /// Pop and return the next event to process, advancing `now` to its
    /// timestamp, provided that timestamp does not exceed `until`. Returns
    /// `None` once the queue is empty or the next event is beyond `until`,
    /// which is exactly the stopping condition of `run(until)` in §4.1.
    pub fn pop_due(&mut self, until: VirtualTime) -> Option<KernelEvent> {
        let next_time = self.queue.peek_time()?;
        if next_time > until {
            return None;
        }
        let (time, event) = self.queue.pop().expect("peeked Some above");
        self.now = time;
        trace!("kernel: t={} dispatching {:?}", time.into_inner(), event);
        Some(event)
    }

    /// Number of events currently queued.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True if no events are queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
