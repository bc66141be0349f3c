//! Debounced accumulation of pickup events.
//!
//! Pickup events often arrive in bursts (a dispatcher reassigning several
//! jobs at once). The buffer collects them and releases one batch when the
//! flush deadline passes, so the view re-renders once per burst.
//!
//! # Invariants
//!
//! - At most one flush deadline is armed at a time. Events arriving while it
//!   is armed do not move it.
//! - A released batch preserves arrival order within each list.

use std::time::Duration;

use fieldsync_proto::{Pickup, PickupId};

use crate::Moment;

/// Debounce window between the first buffered event and the flush.
pub const DEFAULT_FLUSH_WINDOW: Duration = Duration::from_millis(500);

/// Batch of pickup events released by one flush.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferedEvents {
    /// Created pickups, in arrival order
    pub created: Vec<Pickup>,
    /// Updated pickup snapshots, in arrival order
    pub updated: Vec<Pickup>,
    /// Deleted pickup ids
    pub deleted: Vec<PickupId>,
}

impl BufferedEvents {
    /// Whether the batch carries no events.
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    /// Total number of events in the batch.
    pub fn len(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }
}

/// Debounced pickup event buffer.
#[derive(Debug, Clone)]
pub struct CoalescingBuffer<I> {
    window: Duration,
    pending: BufferedEvents,
    flush_at: Option<I>,
}

impl<I: Moment> CoalescingBuffer<I> {
    /// Create an empty buffer with the given debounce window.
    pub fn new(window: Duration) -> Self {
        Self { window, pending: BufferedEvents::default(), flush_at: None }
    }

    /// Buffer a created pickup.
    pub fn on_created(&mut self, pickup: Pickup, now: I) {
        self.pending.created.push(pickup);
        self.arm(now);
    }

    /// Buffer an updated pickup snapshot.
    pub fn on_updated(&mut self, pickup: Pickup, now: I) {
        self.pending.updated.push(pickup);
        self.arm(now);
    }

    /// Buffer a deletion.
    pub fn on_deleted(&mut self, id: PickupId, now: I) {
        self.pending.deleted.push(id);
        self.arm(now);
    }

    fn arm(&mut self, now: I) {
        if self.flush_at.is_none() {
            self.flush_at = Some(now + self.window);
        }
    }

    /// Release the buffered batch if the flush deadline has passed.
    pub fn poll(&mut self, now: I) -> Option<BufferedEvents> {
        match self.flush_at {
            Some(at) if at <= now => {
                self.flush_at = None;
                Some(std::mem::take(&mut self.pending))
            },
            _ => None,
        }
    }

    /// Armed flush deadline, if any.
    pub fn next_deadline(&self) -> Option<I> {
        self.flush_at
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop everything and disarm the deadline.
    pub fn clear(&mut self) {
        self.pending = BufferedEvents::default();
        self.flush_at = None;
    }
}
