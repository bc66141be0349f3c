//! Throttled read acknowledgments.
//!
//! # Invariants
//!
//! - At most one acknowledgment per throttle window.
//! - An acknowledgment never lists messages authored by the local user or
//!   messages already read, and never more than `max_batch` ids.

use std::time::Duration;

use fieldsync_proto::{ChatMessage, MessageId};

use crate::Moment;

/// Minimum time between two acknowledgments.
pub const DEFAULT_READ_THROTTLE: Duration = Duration::from_millis(1500);

/// Most ids carried by one acknowledgment.
pub const MAX_READ_BATCH: usize = 30;

/// Read-receipt throttler.
#[derive(Debug, Clone)]
pub struct ReadReceiptThrottler<I> {
    window: Duration,
    max_batch: usize,
    last_sent: Option<I>,
}

impl<I: Moment> ReadReceiptThrottler<I> {
    /// Create a throttler.
    pub fn new(window: Duration, max_batch: usize) -> Self {
        Self { window, max_batch, last_sent: None }
    }

    /// Ids to acknowledge now, if any.
    ///
    /// `messages` must be in chronological order; the most recent unread
    /// messages are kept when there are more than `max_batch`. Records the
    /// send time when it returns `Some`.
    pub fn maybe_send(&mut self, messages: &[ChatMessage], now: I) -> Option<Vec<MessageId>> {
        if let Some(last) = self.last_sent {
            if now - last < self.window {
                return None;
            }
        }

        let unread: Vec<&ChatMessage> =
            messages.iter().filter(|m| !m.sender_is_local && !m.is_read).collect();
        if unread.is_empty() {
            return None;
        }

        let skip = unread.len().saturating_sub(self.max_batch);
        let ids = unread[skip..].iter().map(|m| m.id.clone()).collect();

        self.last_sent = Some(now);
        Some(ids)
    }

    /// Forget the last send time.
    pub fn reset(&mut self) {
        self.last_sent = None;
    }
}
