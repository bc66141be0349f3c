//! REST polling fallback.
//!
//! Keeps a fixed-interval deadline running for the lifetime of the view and
//! decides on each expiry whether a bulk fetch is needed. While the live
//! channel is connected the fetch is skipped; the deadline keeps running so
//! polling resumes on the first tick after a disconnect.

use std::time::Duration;

use crate::Moment;

/// Poll interval of a chat room.
pub const DEFAULT_CHAT_POLL_INTERVAL: Duration = Duration::from_millis(4500);

/// Poll interval of the pickup feed.
pub const DEFAULT_PICKUP_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Fixed-interval polling coordinator.
#[derive(Debug, Clone)]
pub struct PollCoordinator<I> {
    interval: Duration,
    next_at: Option<I>,
}

impl<I: Moment> PollCoordinator<I> {
    /// Create a stopped coordinator.
    pub fn new(interval: Duration) -> Self {
        Self { interval, next_at: None }
    }

    /// Start polling. The caller performs the initial bulk fetch; the first
    /// periodic check is one interval later.
    pub fn start(&mut self, now: I) {
        self.next_at = Some(now + self.interval);
    }

    /// Stop polling.
    pub fn stop(&mut self) {
        self.next_at = None;
    }

    /// Whether the coordinator is running.
    pub fn is_running(&self) -> bool {
        self.next_at.is_some()
    }

    /// Fire the interval if it has passed. Returns whether a fetch is due,
    /// which is only the case while the live channel is down.
    pub fn tick(&mut self, now: I, connected: bool) -> bool {
        match self.next_at {
            Some(at) if at <= now => {
                self.next_at = Some(now + self.interval);
                !connected
            },
            _ => false,
        }
    }

    /// Next interval expiry.
    pub fn next_deadline(&self) -> Option<I> {
        self.next_at
    }
}
