//! Domain entities carried by frames and REST snapshots.
//!
//! The live feed and the REST endpoints describe the same entities with
//! slightly different field names. Each entity deserializes through a private
//! `Wire*` shape that accepts both, then normalises into the public type.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ProtocolError;

/// Stable pickup identifier.
pub type PickupId = u64;

/// Server-side user identifier.
pub type UserId = u64;

/// Chat message identifier.
///
/// REST snapshots use integer primary keys while the live channel uses
/// string identifiers. Both forms are kept verbatim so acknowledgments echo
/// exactly what the server sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    /// Integer identifier.
    Int(i64),
    /// String identifier.
    Text(String),
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for MessageId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

/// Pickup lifecycle status.
///
/// Closed set of known statuses plus [`PickupStatus::Other`] for anything the
/// server adds later. Decoding a status never fails.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PickupStatus {
    /// Requested by a customer, not yet accepted.
    Pending,
    /// Accepted by a worker.
    Accepted,
    /// Worker is on the way or collecting.
    InProgress,
    /// Open for any nearby worker.
    Available,
    /// Collected.
    Completed,
    /// Status string this client does not recognise.
    Other(String),
}

impl PickupStatus {
    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::InProgress => "in_progress",
            Self::Available => "available",
            Self::Completed => "completed",
            Self::Other(other) => other,
        }
    }
}

impl From<&str> for PickupStatus {
    fn from(status: &str) -> Self {
        match status {
            "pending" => Self::Pending,
            "accepted" => Self::Accepted,
            "in_progress" => Self::InProgress,
            "available" => Self::Available,
            "completed" => Self::Completed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for PickupStatus {
    fn from(status: String) -> Self {
        Self::from(status.as_str())
    }
}

impl From<PickupStatus> for String {
    fn from(status: PickupStatus) -> Self {
        match status {
            PickupStatus::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for PickupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote participant presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "snake_case")]
pub enum PresenceStatus {
    /// Participant has an open connection to the room.
    Online,
    /// Participant left or was never seen.
    Offline,
}

impl From<String> for PresenceStatus {
    fn from(status: String) -> Self {
        // Anything other than an explicit "online" is treated as offline.
        if status == "online" { Self::Online } else { Self::Offline }
    }
}

/// Pickup location.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "WireLocation")]
pub struct Location {
    /// Street address, if known.
    pub address: Option<String>,
    /// Latitude in degrees.
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    pub longitude: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireLocation {
    Address(String),
    Detailed {
        #[serde(default)]
        address: Option<String>,
        #[serde(default)]
        latitude: Option<f64>,
        #[serde(default)]
        longitude: Option<f64>,
    },
}

impl From<WireLocation> for Location {
    fn from(wire: WireLocation) -> Self {
        match wire {
            WireLocation::Address(address) => {
                Self { address: Some(address), latitude: None, longitude: None }
            },
            WireLocation::Detailed { address, latitude, longitude } => {
                Self { address, latitude, longitude }
            },
        }
    }
}

/// Full pickup snapshot.
///
/// Live `pickup_updated` events carry the whole entity rather than a diff, so
/// every field here is authoritative for its id at the time it was sent.
/// Serializes with the live field names (`owner_name`, `expected_fee`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WirePickup", into = "WirePickup")]
pub struct Pickup {
    /// Stable identity across updates.
    pub id: PickupId,
    /// Lifecycle status. Determines the bucket.
    pub status: PickupStatus,
    /// Where the pickup happens.
    pub location: Option<Location>,
    /// Name of the customer on the other side of the job.
    pub counterpart: Option<String>,
    /// Expected or actual fee.
    pub fee: Option<f64>,
    /// Kind of waste.
    pub waste_type: Option<String>,
    /// Creation timestamp as sent by the server.
    pub created_at: Option<String>,
    /// Last update timestamp as sent by the server.
    pub updated_at: Option<String>,
    /// Fields this client does not interpret, kept for the presentation layer.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Pickup {
    /// Minimal pickup with only identity and status.
    pub fn new(id: PickupId, status: impl Into<PickupStatus>) -> Self {
        Self {
            id,
            status: status.into(),
            location: None,
            counterpart: None,
            fee: None,
            waste_type: None,
            created_at: None,
            updated_at: None,
            extra: Map::new(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireNumber {
    Number(f64),
    Text(String),
}

impl WireNumber {
    fn value(self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WirePickup {
    id: PickupId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expected_fee: Option<WireNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    actual_fee: Option<WireNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    waste_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<Pickup> for WirePickup {
    fn from(pickup: Pickup) -> Self {
        Self {
            id: pickup.id,
            status: Some(pickup.status.into()),
            location: pickup.location,
            address: None,
            owner_name: pickup.counterpart,
            customer_name: None,
            expected_fee: pickup.fee.map(WireNumber::Number),
            actual_fee: None,
            waste_type: pickup.waste_type,
            created_at: pickup.created_at,
            updated_at: pickup.updated_at,
            extra: pickup.extra,
        }
    }
}

impl From<WirePickup> for Pickup {
    fn from(wire: WirePickup) -> Self {
        let location = match (wire.location, wire.address) {
            (Some(location), _) => Some(location),
            (None, Some(address)) => {
                Some(Location { address: Some(address), ..Location::default() })
            },
            (None, None) => None,
        };

        Self {
            id: wire.id,
            status: wire.status.map_or_else(|| PickupStatus::Other(String::new()), Into::into),
            location,
            counterpart: wire.owner_name.or(wire.customer_name),
            fee: wire.expected_fee.or(wire.actual_fee).and_then(WireNumber::value),
            waste_type: wire.waste_type,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
            extra: wire.extra,
        }
    }
}

/// A chat message.
///
/// Serializes in the live shape (`content`, `sender_id`) plus the REST
/// `sender` object when a name or worker hint is known. `sender_is_local`
/// is never written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireMessage", into = "WireMessage")]
pub struct ChatMessage {
    /// Server-assigned identifier.
    pub id: MessageId,
    /// Author.
    pub sender_id: UserId,
    /// Author display name (REST snapshots only).
    pub sender_name: Option<String>,
    /// Server hint that the author is the worker using this client.
    ///
    /// Only REST snapshots carry it. Used to discover the local user id when
    /// it was not configured explicitly.
    pub sender_hint_local: Option<bool>,
    /// Derived locally once the local user id is known. Never sent by the
    /// server.
    pub sender_is_local: bool,
    /// Message text.
    pub body: String,
    /// Attached image, if any.
    pub image_url: Option<String>,
    /// Creation timestamp as sent by the server.
    pub created_at: Option<String>,
    /// Whether the message has been acknowledged.
    pub is_read: bool,
}

impl ChatMessage {
    /// Plain text message with no image, unread.
    pub fn new(id: impl Into<MessageId>, sender_id: UserId, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sender_id,
            sender_name: None,
            sender_hint_local: None,
            sender_is_local: false,
            body: body.into(),
            image_url: None,
            created_at: None,
            is_read: false,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireSender {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_worker: Option<bool>,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    id: MessageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sender_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sender: Option<WireSender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_read: Option<bool>,
}

impl From<ChatMessage> for WireMessage {
    fn from(message: ChatMessage) -> Self {
        let sender = (message.sender_name.is_some() || message.sender_hint_local.is_some())
            .then(|| WireSender {
                id: Some(message.sender_id),
                name: message.sender_name,
                is_worker: message.sender_hint_local,
            });

        Self {
            id: message.id,
            sender_id: Some(message.sender_id),
            sender,
            content: Some(message.body),
            message: None,
            image_url: message.image_url,
            created_at: message.created_at,
            is_read: Some(message.is_read),
        }
    }
}

impl TryFrom<WireMessage> for ChatMessage {
    type Error = ProtocolError;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        let (nested_id, sender_name, sender_hint_local) = match wire.sender {
            Some(sender) => (sender.id, sender.name, sender.is_worker),
            None => (None, None, None),
        };
        let sender_id =
            wire.sender_id.or(nested_id).ok_or(ProtocolError::MissingField("sender_id"))?;

        Ok(Self {
            id: wire.id,
            sender_id,
            sender_name,
            sender_hint_local,
            sender_is_local: false,
            body: wire.content.or(wire.message).unwrap_or_default(),
            image_url: wire.image_url,
            created_at: wire.created_at,
            is_read: wire.is_read.unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn status_round_trips_known_and_unknown() {
        for raw in ["pending", "accepted", "in_progress", "available", "completed", "disputed"] {
            let status = PickupStatus::from(raw);
            assert_eq!(String::from(status), raw);
        }
        assert_eq!(PickupStatus::from("disputed"), PickupStatus::Other("disputed".into()));
    }

    #[test]
    fn pickup_accepts_rest_pending_shape() {
        let pickup: Pickup = serde_json::from_value(json!({
            "id": 7,
            "owner_name": "Ada",
            "owner_phone": null,
            "location": { "address": "1 Main St", "latitude": 4.05, "longitude": 9.7 },
            "status": "accepted",
            "expected_fee": "1500.00",
            "waste_type": "plastic"
        }))
        .unwrap();

        assert_eq!(pickup.id, 7);
        assert_eq!(pickup.status, PickupStatus::Accepted);
        assert_eq!(pickup.counterpart.as_deref(), Some("Ada"));
        assert_eq!(pickup.fee, Some(1500.0));
        assert_eq!(pickup.location.and_then(|l| l.latitude), Some(4.05));
        assert!(pickup.extra.contains_key("owner_phone"));
    }

    #[test]
    fn pickup_accepts_completed_string_location() {
        let pickup: Pickup = serde_json::from_value(json!({
            "id": 3,
            "status": "completed",
            "location": "2 Harbour Rd",
            "actual_fee": 900
        }))
        .unwrap();

        assert_eq!(pickup.location.and_then(|l| l.address).as_deref(), Some("2 Harbour Rd"));
        assert_eq!(pickup.fee, Some(900.0));
    }

    #[test]
    fn pickup_without_status_is_other() {
        let pickup: Pickup = serde_json::from_value(json!({ "id": 1 })).unwrap();
        assert_eq!(pickup.status, PickupStatus::Other(String::new()));
    }

    #[test]
    fn message_accepts_live_shape() {
        let msg: ChatMessage = serde_json::from_value(json!({
            "id": "9f1c",
            "sender_id": 4,
            "content": "on my way",
            "created_at": "2025-01-01T10:00:00Z",
            "is_read": false
        }))
        .unwrap();

        assert_eq!(msg.id, MessageId::from("9f1c"));
        assert_eq!(msg.sender_id, 4);
        assert_eq!(msg.body, "on my way");
        assert!(!msg.sender_is_local);
    }

    #[test]
    fn message_accepts_rest_shape() {
        let msg: ChatMessage = serde_json::from_value(json!({
            "id": 12,
            "sender": { "id": 5, "name": "Bo", "is_worker": true },
            "message": "arrived",
            "image_url": null,
            "created_at": "2025-01-01T10:00:00Z",
            "formatted_time": "10:00"
        }))
        .unwrap();

        assert_eq!(msg.id, MessageId::Int(12));
        assert_eq!(msg.sender_id, 5);
        assert_eq!(msg.sender_hint_local, Some(true));
        assert_eq!(msg.body, "arrived");
    }

    #[test]
    fn message_without_sender_is_rejected() {
        let result = serde_json::from_value::<ChatMessage>(json!({ "id": 1, "content": "x" }));
        assert!(result.is_err());
    }

    #[test]
    fn presence_defaults_to_offline() {
        let away: PresenceStatus = serde_json::from_value(json!("away")).unwrap();
        let online: PresenceStatus = serde_json::from_value(json!("online")).unwrap();
        assert_eq!(away, PresenceStatus::Offline);
        assert_eq!(online, PresenceStatus::Online);
    }

    #[test]
    fn pickup_serializes_with_wire_names() {
        let mut pickup = Pickup::new(7, "accepted");
        pickup.counterpart = Some("Ada".into());
        pickup.fee = Some(1500.0);
        let address = Some("1 Main St".into());
        pickup.location = Some(Location { address, ..Location::default() });
        pickup.extra.insert("owner_phone".into(), json!("555"));

        let value = serde_json::to_value(&pickup).unwrap();
        assert_eq!(value["owner_name"], "Ada");
        assert_eq!(value["expected_fee"], 1500.0);
        assert_eq!(value["owner_phone"], "555");

        let back: Pickup = serde_json::from_value(value).unwrap();
        assert_eq!(back, pickup);
    }

    #[test]
    fn message_serializes_with_wire_names() {
        let plain = ChatMessage::new(1, 2, "hello");
        let value = serde_json::to_value(&plain).unwrap();
        assert_eq!(value["content"], "hello");
        assert_eq!(serde_json::from_value::<ChatMessage>(value).unwrap(), plain);

        let mut named = ChatMessage::new("a1", 7, "on my way");
        named.sender_name = Some("Bo".into());
        named.sender_hint_local = Some(true);
        named.is_read = true;
        let value = serde_json::to_value(&named).unwrap();
        assert_eq!(value["sender"]["is_worker"], true);
        assert_eq!(serde_json::from_value::<ChatMessage>(value).unwrap(), named);
    }
}
