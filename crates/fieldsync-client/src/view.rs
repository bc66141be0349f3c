//! The interface shared by every live view, and the state it renders.

use fieldsync_core::{ConnectionState, Freshness, Moment};
use fieldsync_proto::{ChatMessage, Pickup, PresenceStatus, UserId};

use crate::{SyncAction, SyncEvent};

/// A live view the runtime can drive.
pub trait SyncView {
    /// Instant type of the view's environment.
    type Instant: Moment;

    /// Process one event and return the resulting actions.
    fn handle(&mut self, event: SyncEvent<Self::Instant>) -> Vec<SyncAction>;

    /// Earliest pending deadline. The runtime delivers a `Tick` once it
    /// passes.
    fn next_deadline(&self) -> Option<Self::Instant>;

    /// Current presentable state.
    fn snapshot(&self) -> ViewSnapshot;

    /// Live channel state.
    fn connection_state(&self) -> ConnectionState;

    /// Whether `Teardown` was processed. The runtime stops driving the view.
    fn is_torn_down(&self) -> bool;
}

/// Presentable state of a view.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewSnapshot {
    /// Pickup feed state.
    Pickups(PickupSnapshot),
    /// Chat room state.
    Chat(ChatSnapshot),
}

/// Pickup feed state.
#[derive(Debug, Clone, PartialEq)]
pub struct PickupSnapshot {
    /// Assigned, not yet completed. Most recent first.
    pub pending: Vec<Pickup>,
    /// Open to any worker. Most recent first.
    pub available: Vec<Pickup>,
    /// Completed. Most recent first.
    pub completed: Vec<Pickup>,
    /// Live channel state.
    pub connection: ConnectionState,
    /// Wall-clock seconds of the last applied change.
    pub last_sync_secs: Option<u64>,
    /// Coarse age of `last_sync_secs` when the snapshot was taken.
    pub freshness: Freshness,
    /// Whether `last_sync_secs` is older than a minute.
    pub stale: bool,
}

/// Chat room state.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSnapshot {
    /// Room id.
    pub room: Option<String>,
    /// Messages, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Remote participants currently typing.
    pub typing: Vec<UserId>,
    /// Known presence of remote participants.
    pub presence: Vec<(UserId, PresenceStatus)>,
    /// Local user id, if known.
    pub local_user: Option<UserId>,
    /// Live channel state.
    pub connection: ConnectionState,
}
