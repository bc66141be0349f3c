//! View configuration.
//!
//! Every tunable has a `DEFAULT_*` constant in the module of the state
//! machine that uses it; the `Default`/`new` constructors here collect them.

use std::time::Duration;

use fieldsync_core::{
    LinkConfig, address::DEFAULT_PICKUP_PATH, coalesce::DEFAULT_FLUSH_WINDOW,
    polling::{DEFAULT_CHAT_POLL_INTERVAL, DEFAULT_PICKUP_POLL_INTERVAL},
    presence::{DEFAULT_TYPING_IDLE, DEFAULT_TYPING_TIMEOUT},
    receipts::{DEFAULT_READ_THROTTLE, MAX_READ_BATCH},
};
use fieldsync_proto::UserId;

/// Scroll distance from the bottom under which the list counts as read.
pub const DEFAULT_SCROLL_THRESHOLD_PX: u32 = 60;

/// Settings shared by every view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// REST base URL. Channel URLs are derived from it.
    pub server: String,
    /// Bearer token. Without it the view runs on polling alone.
    pub token: Option<String>,
    /// Reconnect policy.
    pub link: LinkConfig,
}

impl SyncConfig {
    /// Shared settings with the default reconnect policy.
    pub fn new(server: impl Into<String>, token: Option<String>) -> Self {
        Self { server: server.into(), token, link: LinkConfig::default() }
    }
}

/// Pickup feed settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickupConfig {
    /// Shared settings.
    pub sync: SyncConfig,
    /// Channel path on the server.
    pub path: String,
    /// Debounce window for live pickup events.
    pub flush_window: Duration,
    /// REST polling interval while the channel is down.
    pub poll_interval: Duration,
}

impl PickupConfig {
    /// Pickup feed with default timings.
    pub fn new(sync: SyncConfig) -> Self {
        Self {
            sync,
            path: DEFAULT_PICKUP_PATH.to_string(),
            flush_window: DEFAULT_FLUSH_WINDOW,
            poll_interval: DEFAULT_PICKUP_POLL_INTERVAL,
        }
    }
}

/// Chat room settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Shared settings.
    pub sync: SyncConfig,
    /// Chat room id. Without it the view stays empty.
    pub room: Option<String>,
    /// Local user id. Inferred from the first bulk fetch when `None`.
    pub local_user_id: Option<UserId>,
    /// Remote typing indicator lifetime.
    pub typing_timeout: Duration,
    /// Quiet period before the local user stops "typing".
    pub typing_idle: Duration,
    /// Minimum time between read acknowledgments.
    pub read_throttle: Duration,
    /// Most ids per read acknowledgment.
    pub read_batch: usize,
    /// REST polling interval while the channel is down.
    pub poll_interval: Duration,
    /// Scroll distance under which unread messages are acknowledged.
    pub scroll_threshold_px: u32,
}

impl ChatConfig {
    /// Chat room with default timings.
    pub fn new(sync: SyncConfig, room: Option<String>) -> Self {
        Self {
            sync,
            room,
            local_user_id: None,
            typing_timeout: DEFAULT_TYPING_TIMEOUT,
            typing_idle: DEFAULT_TYPING_IDLE,
            read_throttle: DEFAULT_READ_THROTTLE,
            read_batch: MAX_READ_BATCH,
            poll_interval: DEFAULT_CHAT_POLL_INTERVAL,
            scroll_threshold_px: DEFAULT_SCROLL_THRESHOLD_PX,
        }
    }
}
