//! Fuzz target for the view state machines
//!
//! Drives a pickup feed and a chat room with arbitrary event sequences,
//! including garbage frames, and checks that buckets stay disjoint and
//! message ids stay unique.

#![no_main]

use std::{collections::HashSet, time::Duration};

use arbitrary::Arbitrary;
use fieldsync_client::{
    ChatConfig, ChatRoom, PickupConfig, PickupFeed, SyncConfig, SyncEvent, SyncView,
};
use fieldsync_core::{Environment, env::test_utils::MockEnv};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Advance(u16),
    Opened,
    Closed,
    Frame(String),
    PickupFrame { id: u8, status: u8, kind: u8 },
    Compose(String),
    Send(String),
    Scrolled(u16),
}

const STATUSES: [&str; 5] = ["pending", "accepted", "available", "completed", "mystery"];
const KINDS: [&str; 3] = ["pickup_created", "pickup_updated", "pickup_deleted"];

fn event(env: &MockEnv, op: Op) -> SyncEvent<Duration> {
    match op {
        Op::Advance(ms) => {
            env.advance(Duration::from_millis(u64::from(ms)));
            SyncEvent::Tick { now: env.now() }
        },
        Op::Opened => SyncEvent::LinkOpened,
        Op::Closed => SyncEvent::LinkClosed,
        Op::Frame(text) => SyncEvent::FrameReceived(text),
        Op::PickupFrame { id, status, kind } => {
            let status = STATUSES[usize::from(status) % STATUSES.len()];
            let kind = KINDS[usize::from(kind) % KINDS.len()];
            SyncEvent::FrameReceived(format!(
                r#"{{"event":"{kind}","pickup":{{"id":{id},"status":"{status}"}}}}"#
            ))
        },
        Op::Compose(text) => SyncEvent::ComposeChanged { text },
        Op::Send(body) => SyncEvent::SendMessage { body },
        Op::Scrolled(distance) => SyncEvent::Scrolled { distance_from_bottom: u32::from(distance) },
    }
}

fn sync() -> SyncConfig {
    SyncConfig::new("https://fuzz.test", Some("tok".into()))
}

fuzz_target!(|ops: Vec<Op>| {
    let env = MockEnv::new();
    let Ok(mut feed) = PickupFeed::new(env.clone(), PickupConfig::new(sync())) else {
        return;
    };
    let Ok(mut room) = ChatRoom::new(env.clone(), ChatConfig::new(sync(), Some("r1".into())))
    else {
        return;
    };

    feed.handle(SyncEvent::Start);
    room.handle(SyncEvent::Start);
    for op in ops {
        let event = event(&env, op);
        feed.handle(event.clone());
        room.handle(event);

        let mut seen = HashSet::new();
        for (_, pickup) in feed.buckets().iter() {
            assert!(seen.insert(pickup.id), "pickup {} in two buckets", pickup.id);
        }

        let mut ids = HashSet::new();
        for message in room.messages() {
            assert!(ids.insert(message.id.clone()), "duplicate message {}", message.id);
        }
    }
});
