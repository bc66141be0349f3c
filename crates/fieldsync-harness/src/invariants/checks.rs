//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::{HashMap, HashSet};

use fieldsync_client::{SyncAction, ViewSnapshot};
use fieldsync_core::{Bucket, bucket, receipts::MAX_READ_BATCH};
use fieldsync_proto::Pickup;
use serde_json::Value;

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

fn buckets(view: &ViewSnapshot) -> Option<[(Bucket, &[Pickup]); 3]> {
    match view {
        ViewSnapshot::Pickups(s) => Some([
            (Bucket::Pending, s.pending.as_slice()),
            (Bucket::Available, s.available.as_slice()),
            (Bucket::Completed, s.completed.as_slice()),
        ]),
        ViewSnapshot::Chat(_) => None,
    }
}

/// A pickup id appears in at most one bucket, at most once.
pub struct BucketExclusivity;

impl Invariant for BucketExclusivity {
    fn name(&self) -> &'static str {
        "bucket_exclusivity"
    }

    fn check(&self, state: &SystemSnapshot<'_>) -> InvariantResult {
        let Some(all) = state.view.and_then(buckets) else {
            return Ok(());
        };

        let mut seen = HashMap::new();
        for (bucket, pickups) in all {
            for pickup in pickups {
                if let Some(first) = seen.insert(pickup.id, bucket) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "pickup {} listed in {first:?} and again in {bucket:?}",
                            pickup.id
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Every pickup sits in the bucket its status maps to.
pub struct BucketMatchesStatus;

impl Invariant for BucketMatchesStatus {
    fn name(&self) -> &'static str {
        "bucket_matches_status"
    }

    fn check(&self, state: &SystemSnapshot<'_>) -> InvariantResult {
        let Some(all) = state.view.and_then(buckets) else {
            return Ok(());
        };

        for (actual, pickups) in all {
            for pickup in pickups {
                let expected = bucket(&pickup.status);
                if expected != actual {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "pickup {} with status {:?} in {actual:?}, expected {expected:?}",
                            pickup.id,
                            pickup.status.as_str()
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// A chat room never lists the same message id twice.
pub struct UniqueMessageIds;

impl Invariant for UniqueMessageIds {
    fn name(&self) -> &'static str {
        "unique_message_ids"
    }

    fn check(&self, state: &SystemSnapshot<'_>) -> InvariantResult {
        let Some(ViewSnapshot::Chat(chat)) = state.view else {
            return Ok(());
        };

        let mut seen = HashSet::new();
        for message in &chat.messages {
            if !seen.insert(&message.id) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("message {} listed twice", message.id),
                });
            }
        }
        Ok(())
    }
}

/// Frames are only sent while the socket is open.
pub struct NoSendWhileDisconnected;

impl Invariant for NoSendWhileDisconnected {
    fn name(&self) -> &'static str {
        "no_send_while_disconnected"
    }

    fn check(&self, state: &SystemSnapshot<'_>) -> InvariantResult {
        for call in state.calls {
            if let SyncAction::Send(frame) = &call.action {
                if !call.socket_open {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("sent {frame} at {:?} with no open socket", call.at),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Read acknowledgments carry between one and `max_batch` ids.
pub struct ReadBatchBounded {
    /// Largest allowed batch.
    pub max_batch: usize,
}

impl Default for ReadBatchBounded {
    fn default() -> Self {
        Self { max_batch: MAX_READ_BATCH }
    }
}

impl Invariant for ReadBatchBounded {
    fn name(&self) -> &'static str {
        "read_batch_bounded"
    }

    fn check(&self, state: &SystemSnapshot<'_>) -> InvariantResult {
        for call in state.calls {
            let SyncAction::Send(frame) = &call.action else {
                continue;
            };
            let Ok(value) = serde_json::from_str::<Value>(frame) else {
                continue;
            };
            if value["action"] != "read" {
                continue;
            }

            let count = value["message_ids"].as_array().map_or(0, Vec::len);
            if count == 0 || count > self.max_batch {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "read acknowledgment with {count} ids, allowed 1..={}",
                        self.max_batch
                    ),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use fieldsync_client::{ChatSnapshot, ConnectionState, PickupSnapshot};
    use fieldsync_core::Freshness;
    use fieldsync_proto::ChatMessage;

    use super::*;
    use crate::RecordedCall;

    fn pickups(pending: Vec<Pickup>, available: Vec<Pickup>) -> ViewSnapshot {
        ViewSnapshot::Pickups(PickupSnapshot {
            pending,
            available,
            completed: Vec::new(),
            connection: ConnectionState::Connected,
            last_sync_secs: None,
            freshness: Freshness::Never,
            stale: false,
        })
    }

    fn send(frame: &str, socket_open: bool) -> RecordedCall {
        RecordedCall {
            at: Duration::ZERO,
            action: SyncAction::Send(frame.to_string()),
            socket_open,
        }
    }

    #[test]
    fn duplicate_pickup_is_flagged() {
        let view = pickups(vec![Pickup::new(1, "pending")], vec![Pickup::new(1, "available")]);
        let snapshot = SystemSnapshot::of_view(&view);

        assert!(BucketExclusivity.check(&snapshot).is_err());
    }

    #[test]
    fn misplaced_pickup_is_flagged() {
        let view = pickups(vec![Pickup::new(1, "completed")], Vec::new());
        let snapshot = SystemSnapshot::of_view(&view);

        assert!(BucketExclusivity.check(&snapshot).is_ok());
        assert!(BucketMatchesStatus.check(&snapshot).is_err());
    }

    #[test]
    fn repeated_message_is_flagged() {
        let view = ViewSnapshot::Chat(ChatSnapshot {
            room: Some("r".into()),
            messages: vec![ChatMessage::new(1, 2, "a"), ChatMessage::new(1, 2, "a")],
            typing: Vec::new(),
            presence: Vec::new(),
            local_user: None,
            connection: ConnectionState::Disconnected,
        });

        assert!(UniqueMessageIds.check(&SystemSnapshot::of_view(&view)).is_err());
    }

    #[test]
    fn send_on_closed_socket_is_flagged() {
        let calls = [send(r#"{"action":"typing","is_typing":true}"#, false)];
        let snapshot = SystemSnapshot { view: None, calls: &calls };

        assert!(NoSendWhileDisconnected.check(&snapshot).is_err());
    }

    #[test]
    fn oversized_read_batch_is_flagged() {
        let ids: Vec<u32> = (0..31).collect();
        let frame = serde_json::json!({ "action": "read", "message_ids": ids }).to_string();
        let calls = [send(&frame, true), send(r#"{"action":"typing","is_typing":false}"#, true)];
        let snapshot = SystemSnapshot { view: None, calls: &calls };

        assert!(ReadBatchBounded::default().check(&snapshot).is_err());
        assert!(ReadBatchBounded { max_batch: 31 }.check(&snapshot).is_ok());
    }
}
