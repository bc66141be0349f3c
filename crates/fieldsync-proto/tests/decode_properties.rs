//! Property-based tests for frame decoding
//!
//! The decoder sits directly behind the socket, so it must tolerate any input
//! the network hands it.

use fieldsync_proto::{IncomingEvent, MessageId, OutgoingFrame, PickupStatus, decode, encode};
use proptest::prelude::*;
use serde_json::json;

fn arbitrary_status() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("pending".to_string()),
        Just("accepted".to_string()),
        Just("in_progress".to_string()),
        Just("available".to_string()),
        Just("completed".to_string()),
        "[a-z_]{0,12}",
    ]
}

proptest! {
    #[test]
    fn decode_never_panics_on_arbitrary_text(raw in ".{0,256}") {
        let _ = decode(&raw);
    }

    #[test]
    fn decode_never_panics_on_arbitrary_event_objects(
        event in "[a-z_]{0,16}",
        field in "[a-z_]{1,12}",
        value in any::<i64>(),
    ) {
        let raw = json!({ "event": event, field: value }).to_string();
        let _ = decode(&raw);
    }

    #[test]
    fn pickup_status_survives_decode(id in any::<u64>(), status in arbitrary_status()) {
        let raw = json!({ "event": "pickup_created", "pickup": { "id": id, "status": status } })
            .to_string();

        match decode(&raw) {
            Ok(IncomingEvent::PickupCreated { pickup }) => {
                prop_assert_eq!(pickup.id, id);
                prop_assert_eq!(pickup.status, PickupStatus::from(status.as_str()));
            },
            other => prop_assert!(false, "unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn read_frame_lists_every_id(ids in prop::collection::vec(any::<i64>(), 0..40)) {
        let message_ids: Vec<MessageId> = ids.iter().copied().map(MessageId::Int).collect();
        let raw = encode(&OutgoingFrame::Read { message_ids }).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        prop_assert_eq!(value["action"].as_str(), Some("read"));
        prop_assert_eq!(value["message_ids"].as_array().map(Vec::len), Some(ids.len()));
    }
}
