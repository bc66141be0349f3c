//! REST snapshot envelopes.
//!
//! Every bulk endpoint wraps its payload in `{"data": {...}}`. Only the list
//! fields are modelled; counters and pagination metadata are ignored.

use serde::Deserialize;

use crate::{ChatMessage, Pickup};

/// `{"data": T}` wrapper shared by every endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Endpoint payload.
    pub data: T,
}

/// Payload of the pending-pickups endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PendingPickups {
    /// Pickups assigned to the worker and not yet completed.
    #[serde(default)]
    pub pending_pickups: Vec<Pickup>,
}

/// Payload of the available-pickups endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailablePickups {
    /// Pickups open to any worker.
    #[serde(default)]
    pub available_pickups: Vec<Pickup>,
}

/// Payload of the completed-pickups endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletedPickups {
    /// Most recent completed pickups.
    #[serde(default)]
    pub completed_pickups: Vec<Pickup>,
}

/// Payload of the chat-room endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRoomData {
    /// Messages in chronological order.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}
