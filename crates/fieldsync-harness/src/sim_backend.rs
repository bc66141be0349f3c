//! In-memory model of the server the views talk to.
//!
//! Holds the authoritative pickups and chat history, and answers the
//! [`crate::SimDriver`]'s REST calls and channel frames from them.

use fieldsync_proto::{ChatMessage, MessageId, Pickup, PickupId, UserId};
use serde_json::json;

/// Server state for one simulation.
#[derive(Debug, Clone)]
pub struct SimBackend {
    /// Whether channel handshakes succeed.
    pub channel_up: bool,
    /// Whether REST calls succeed.
    pub rest_up: bool,
    /// Authoritative pickups, most recent first.
    pub pickups: Vec<Pickup>,
    /// Chat history, oldest first.
    pub messages: Vec<ChatMessage>,
    /// The worker using the client.
    pub worker: UserId,
    next_message_id: i64,
}

impl SimBackend {
    /// Reachable backend with no data.
    pub fn new(worker: UserId) -> Self {
        Self {
            channel_up: true,
            rest_up: true,
            pickups: Vec::new(),
            messages: Vec::new(),
            worker,
            next_message_id: 1,
        }
    }

    /// Insert or replace a pickup, moving it to the front.
    pub fn upsert_pickup(&mut self, pickup: Pickup) {
        self.pickups.retain(|p| p.id != pickup.id);
        self.pickups.insert(0, pickup);
    }

    /// Remove a pickup.
    pub fn delete_pickup(&mut self, id: PickupId) {
        self.pickups.retain(|p| p.id != id);
    }

    /// Append a message from `sender` and return it.
    pub fn append_message(&mut self, sender: UserId, body: &str) -> ChatMessage {
        let mut message = ChatMessage::new(self.next_message_id, sender, body);
        message.sender_hint_local = Some(sender == self.worker);
        self.next_message_id += 1;
        self.messages.push(message.clone());
        message
    }

    /// Mark messages read by id.
    pub fn mark_read(&mut self, ids: &[MessageId]) {
        for message in &mut self.messages {
            if ids.contains(&message.id) {
                message.is_read = true;
            }
        }
    }

    /// Wire frame announcing `message`.
    pub fn message_frame(message: &ChatMessage) -> String {
        json!({
            "event": "message",
            "message": {
                "id": message.id,
                "sender_id": message.sender_id,
                "content": message.body,
                "is_read": message.is_read,
            }
        })
        .to_string()
    }

    /// Wire frame for a pickup change. `event` is the full event name.
    pub fn pickup_frame(event: &str, pickup: &Pickup) -> String {
        json!({
            "event": event,
            "pickup": { "id": pickup.id, "status": pickup.status.as_str() }
        })
        .to_string()
    }

    /// Wire frame for a pickup removal.
    pub fn pickup_deleted_frame(id: PickupId) -> String {
        json!({ "event": "pickup_deleted", "pickup_id": id }).to_string()
    }
}
