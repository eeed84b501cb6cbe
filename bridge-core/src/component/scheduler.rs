//! Update Queue
//!
//! The queue holds the instances that asked to re-render since the last
//! flush. It is an ordered *set*: an instance that asks ten times before the
//! flush is queued once, which is what coalesces a burst of change
//! notifications into a single render.
//!
//! # Algorithm
//!
//! 1. `schedule(id)` inserts the instance if it is not already pending.
//! 2. `Host::flush` drains the queue and renders each instance once, in
//!    the order they were first scheduled.
//! 3. Renders (and their commit-phase effects) may schedule more updates.
//!    Those land in the now-empty queue and are drained by the next pass of
//!    the same flush.

use indexmap::IndexSet;

use super::instance::InstanceId;

/// Pending re-renders, in first-scheduled order.
#[derive(Debug, Default)]
pub struct UpdateQueue {
    pending: IndexSet<InstanceId>,
}

impl UpdateQueue {
    /// Create a new empty queue.
    pub fn new() -> Self {
        Self {
            pending: IndexSet::new(),
        }
    }

    /// Queue an instance. Returns `false` if it was already pending.
    pub fn schedule(&mut self, id: InstanceId) -> bool {
        self.pending.insert(id)
    }

    /// Forget an instance, e.g. because it was unmounted.
    pub fn remove(&mut self, id: InstanceId) -> bool {
        self.pending.shift_remove(&id)
    }

    /// Take every pending instance, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<InstanceId> {
        self.pending.drain(..).collect()
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.pending.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
