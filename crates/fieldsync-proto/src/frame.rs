//! Inbound and outbound frames.
//!
//! Every frame on a live channel is one UTF-8 JSON object. Inbound frames are
//! discriminated by `event`, outbound frames by `action`.
//!
//! # Invariants
//!
//! - [`decode`] never panics. Any input either yields an [`IncomingEvent`] or a
//!   [`ProtocolError`].
//! - An unrecognised `event` value is not an error. It yields
//!   [`IncomingEvent::Unknown`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ChatMessage, MessageId, Pickup, PickupId, PresenceStatus, UserId,
    errors::{ProtocolError, Result},
};

/// Largest inbound frame accepted by [`decode`], in bytes.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Decoded inbound event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum IncomingEvent {
    /// New chat message in the room.
    Message {
        /// The message.
        message: ChatMessage,
    },
    /// The other participant acknowledged messages.
    Read {
        /// Acknowledged message ids.
        message_ids: Vec<MessageId>,
        /// Participant who read them.
        #[serde(default)]
        user_id: Option<UserId>,
    },
    /// Typing indicator change.
    Typing {
        /// Participant typing.
        user_id: UserId,
        /// Whether they are currently typing.
        is_typing: bool,
    },
    /// Presence change.
    Presence {
        /// Participant whose presence changed.
        user_id: UserId,
        /// New presence.
        status: PresenceStatus,
    },
    /// A pickup was created.
    PickupCreated {
        /// Full snapshot.
        pickup: Pickup,
    },
    /// A pickup changed. Carries the full snapshot, not a diff.
    PickupUpdated {
        /// Full snapshot.
        pickup: Pickup,
    },
    /// A pickup was removed.
    PickupDeleted {
        /// Removed pickup.
        pickup_id: PickupId,
    },
    /// Event kind this client does not understand. Ignored by every view.
    #[serde(other)]
    Unknown,
}

/// Discriminant of an [`IncomingEvent`], used for routing and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `message`
    Message,
    /// `read`
    Read,
    /// `typing`
    Typing,
    /// `presence`
    Presence,
    /// `pickup_created`
    PickupCreated,
    /// `pickup_updated`
    PickupUpdated,
    /// `pickup_deleted`
    PickupDeleted,
    /// Anything else.
    Unknown,
}

impl EventKind {
    /// Wire name of the event kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Read => "read",
            Self::Typing => "typing",
            Self::Presence => "presence",
            Self::PickupCreated => "pickup_created",
            Self::PickupUpdated => "pickup_updated",
            Self::PickupDeleted => "pickup_deleted",
            Self::Unknown => "unknown",
        }
    }
}

impl IncomingEvent {
    /// Kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Message { .. } => EventKind::Message,
            Self::Read { .. } => EventKind::Read,
            Self::Typing { .. } => EventKind::Typing,
            Self::Presence { .. } => EventKind::Presence,
            Self::PickupCreated { .. } => EventKind::PickupCreated,
            Self::PickupUpdated { .. } => EventKind::PickupUpdated,
            Self::PickupDeleted { .. } => EventKind::PickupDeleted,
            Self::Unknown => EventKind::Unknown,
        }
    }
}

/// Outbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OutgoingFrame {
    /// Post a chat message.
    SendMessage {
        /// Message text.
        message: String,
        /// Client-generated id so the server can drop duplicates.
        client_message_id: String,
    },
    /// Announce typing state.
    Typing {
        /// Whether the local user is typing.
        is_typing: bool,
    },
    /// Acknowledge messages.
    Read {
        /// Message ids being acknowledged.
        message_ids: Vec<MessageId>,
    },
}

/// Decode one inbound frame.
///
/// # Errors
///
/// - [`ProtocolError::FrameTooLarge`] if `raw` exceeds [`MAX_FRAME_SIZE`]
/// - [`ProtocolError::MissingField`] if the frame is not an object with an
///   `event` field
/// - [`ProtocolError::Json`] if the JSON is malformed or the payload does not
///   match the event's shape
pub fn decode(raw: &str) -> Result<IncomingEvent> {
    if raw.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge { size: raw.len(), max: MAX_FRAME_SIZE });
    }

    let value: Value = serde_json::from_str(raw)?;
    if value.get("event").is_none() {
        return Err(ProtocolError::MissingField("event"));
    }

    Ok(serde_json::from_value(value)?)
}

/// Encode one outbound frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Json`] if serialization fails.
pub fn encode(frame: &OutgoingFrame) -> Result<String> {
    Ok(serde_json::to_string(frame)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::PickupStatus;

    #[test]
    fn decode_message_event() {
        let raw = r#"{"event":"message","message":{"id":"a1","sender_id":2,"content":"hi","created_at":"2025-01-01T00:00:00Z","is_read":false}}"#;
        let event = decode(raw).unwrap();

        match event {
            IncomingEvent::Message { message } => {
                assert_eq!(message.id, MessageId::from("a1"));
                assert_eq!(message.body, "hi");
            },
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn decode_read_with_mixed_ids() {
        let event = decode(r#"{"event":"read","message_ids":["x",4],"user_id":9}"#).unwrap();
        assert_eq!(
            event,
            IncomingEvent::Read {
                message_ids: vec![MessageId::from("x"), MessageId::Int(4)],
                user_id: Some(9),
            }
        );
    }

    #[test]
    fn decode_pickup_updated_carries_snapshot() {
        let raw = json!({
            "event": "pickup_updated",
            "pickup": { "id": 11, "status": "in_progress", "location": { "address": "Dock 4" } }
        })
        .to_string();

        match decode(&raw).unwrap() {
            IncomingEvent::PickupUpdated { pickup } => {
                assert_eq!(pickup.id, 11);
                assert_eq!(pickup.status, PickupStatus::InProgress);
            },
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn decode_unknown_event_is_not_an_error() {
        let event = decode(r#"{"event":"server_shutdown","reason":"deploy"}"#).unwrap();
        assert_eq!(event, IncomingEvent::Unknown);
        assert_eq!(event.kind(), EventKind::Unknown);
    }

    #[test]
    fn decode_rejects_missing_discriminator() {
        assert!(matches!(decode(r#"{"user_id":1}"#), Err(ProtocolError::MissingField("event"))));
        assert!(matches!(decode("[1,2,3]"), Err(ProtocolError::MissingField("event"))));
    }

    #[test]
    fn decode_rejects_malformed_json() {
        assert!(matches!(decode("{not json"), Err(ProtocolError::Json(_))));
        assert!(matches!(
            decode(r#"{"event":"typing","user_id":"nope"}"#),
            Err(ProtocolError::Json(_))
        ));
    }

    #[test]
    fn decode_rejects_oversized_frame() {
        let raw = " ".repeat(MAX_FRAME_SIZE + 1);
        assert!(matches!(decode(&raw), Err(ProtocolError::FrameTooLarge { .. })));
    }

    #[test]
    fn encode_outgoing_frames() {
        let typing = encode(&OutgoingFrame::Typing { is_typing: true }).unwrap();
        assert_eq!(typing, r#"{"action":"typing","is_typing":true}"#);

        let read =
            encode(&OutgoingFrame::Read { message_ids: vec![MessageId::Int(3), "b".into()] })
                .unwrap();
        assert_eq!(read, r#"{"action":"read","message_ids":[3,"b"]}"#);

        let send = encode(&OutgoingFrame::SendMessage {
            message: "hello".into(),
            client_message_id: "c-1".into(),
        })
        .unwrap();
        let value: Value = serde_json::from_str(&send).unwrap();
        assert_eq!(value["action"], "send_message");
        assert_eq!(value["client_message_id"], "c-1");
    }
}
