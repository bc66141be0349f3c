//! Reconnecting live-channel state machine.
//!
//! Owns the [`ConnectionState`] of one logical channel. The driver performs
//! the actual socket I/O and reports back through [`Link::on_open`] and
//! [`Link::on_closed`]; the link answers with [`LinkAction`]s and a reconnect
//! deadline.
//!
//! # State Machine
//!
//! ```text
//!                connect / reconnect deadline
//! ┌──────────────┐ ─────────────────────────> ┌────────────┐
//! │ Disconnected │                            │ Connecting │
//! └──────────────┘ <───────────────────────── └────────────┘
//!        ^            closed (schedule retry)        │ open
//!        │                                           ↓
//!        │          closed (schedule retry)   ┌───────────┐
//!        └─────────────────────────────────── │ Connected │
//!                                             └───────────┘
//! ```
//!
//! # Invariants
//!
//! - After [`Link::close`] no reconnect is ever scheduled or opened.
//! - The reconnect delay is `min(max_delay, base_delay * 2^attempt)`; the
//!   attempt counter resets on every successful open.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::Moment;

/// Delay before the first reconnect attempt.
pub const DEFAULT_RECONNECT_BASE: Duration = Duration::from_secs(1);

/// Upper bound on the reconnect delay.
pub const DEFAULT_RECONNECT_CAP: Duration = Duration::from_secs(10);

/// Connection state of a live channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No socket. A reconnect may be pending.
    #[default]
    Disconnected,
    /// Socket requested, not yet open.
    Connecting,
    /// Socket open. Sends are delivered.
    Connected,
}

/// Actions returned by the link for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// Open a socket to this URL
    Open {
        /// Channel URL including the token
        url: String,
    },
    /// Close the current socket
    Close,
}

/// Link configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Delay before the first reconnect
    pub base_delay: Duration,
    /// Upper bound on the reconnect delay
    pub max_delay: Duration,
    /// Give up after this many consecutive failed attempts. `None` retries
    /// forever.
    pub max_attempts: Option<u32>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_RECONNECT_BASE,
            max_delay: DEFAULT_RECONNECT_CAP,
            max_attempts: None,
        }
    }
}

impl LinkConfig {
    /// Reconnect delay after `attempt` consecutive failures.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Reconnecting link to one channel.
///
/// Pure state machine. Time is passed to the methods that need it.
#[derive(Debug, Clone)]
pub struct Link<I> {
    state: ConnectionState,
    config: LinkConfig,
    /// `None` when the channel or token was missing at setup
    url: Option<String>,
    attempt: u32,
    manual_closed: bool,
    reconnect_at: Option<I>,
}

impl<I: Moment> Link<I> {
    /// Create a disconnected link. `url` is `None` when the view has no
    /// channel to connect to, which turns [`Link::connect`] into a no-op.
    pub fn new(config: LinkConfig, url: Option<String>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            config,
            url,
            attempt: 0,
            manual_closed: false,
            reconnect_at: None,
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether sends are currently delivered.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Consecutive failed attempts since the last successful open.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Whether [`Link::close`] was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.manual_closed
    }

    /// Pending reconnect deadline, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<I> {
        self.reconnect_at
    }

    /// Start connecting.
    ///
    /// No-op if there is no channel URL, if the link was closed, or if a
    /// socket is already open or being opened.
    pub fn connect(&mut self) -> Vec<LinkAction> {
        if self.manual_closed || self.state != ConnectionState::Disconnected {
            return Vec::new();
        }
        let Some(url) = self.url.clone() else {
            debug!("no channel configured, staying disconnected");
            return Vec::new();
        };

        self.reconnect_at = None;
        self.state = ConnectionState::Connecting;
        vec![LinkAction::Open { url }]
    }

    /// Socket reported open.
    ///
    /// Returns [`LinkAction::Close`] if the link was closed while the socket
    /// was still opening.
    pub fn on_open(&mut self) -> Vec<LinkAction> {
        if self.manual_closed {
            return vec![LinkAction::Close];
        }
        if self.state != ConnectionState::Connecting {
            return Vec::new();
        }

        info!(attempts = self.attempt, "channel connected");
        self.state = ConnectionState::Connected;
        self.attempt = 0;
        Vec::new()
    }

    /// Socket reported closed, or the connection attempt failed.
    ///
    /// Schedules a reconnect unless the link was closed manually or the
    /// attempt ceiling was reached. Returns the scheduled delay.
    pub fn on_closed(&mut self, now: I) -> Option<Duration> {
        if self.state == ConnectionState::Disconnected {
            return None;
        }
        self.state = ConnectionState::Disconnected;

        if self.manual_closed {
            return None;
        }

        if let Some(max) = self.config.max_attempts {
            if self.attempt >= max {
                warn!(attempts = self.attempt, "giving up on live channel, polling only");
                return None;
            }
        }

        let delay = self.config.backoff(self.attempt);
        self.attempt += 1;
        self.reconnect_at = Some(now + delay);
        warn!(
            attempt = self.attempt,
            delay_ms = delay.as_millis() as u64,
            "channel closed, reconnecting"
        );
        Some(delay)
    }

    /// Close the channel for good. Idempotent.
    pub fn close(&mut self) -> Vec<LinkAction> {
        self.manual_closed = true;
        self.reconnect_at = None;

        if self.state == ConnectionState::Disconnected {
            return Vec::new();
        }

        self.state = ConnectionState::Disconnected;
        vec![LinkAction::Close]
    }

    /// Fire the reconnect deadline if it has passed.
    pub fn tick(&mut self, now: I) -> Vec<LinkAction> {
        match self.reconnect_at {
            Some(at) if at <= now => self.connect(),
            _ => Vec::new(),
        }
    }
}
