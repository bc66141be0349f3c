//! Property-based simulation tests.
//!
//! Random server activity and user input are scheduled on the virtual
//! timeline, the production runtime drives the view to the end, and the
//! standard invariants must hold after every render.

use std::time::Duration;

use fieldsync_app::Runtime;
use fieldsync_client::{
    ChatConfig, ChatRoom, PickupConfig, PickupFeed, SyncConfig, SyncEvent, ViewSnapshot,
};
use fieldsync_core::{Bucket, bucket};
use fieldsync_harness::{InvariantRegistry, SimBackend, SimDriver, SimEnv};
use fieldsync_proto::{Pickup, PickupId, PickupStatus};
use proptest::prelude::*;
use serde_json::json;

const STATUSES: [&str; 6] = ["pending", "accepted", "in_progress", "available", "completed", "odd"];

#[derive(Debug, Clone)]
enum PickupOp {
    Created(PickupId, usize),
    Updated(PickupId, usize),
    Deleted(PickupId),
    DropChannel,
}

#[derive(Debug, Clone)]
enum ChatOp {
    Remote(String),
    Typing(bool),
    Compose(String),
    Send(String),
    Scroll(u32),
    DropChannel,
}

fn pickup_op() -> impl Strategy<Value = PickupOp> {
    prop_oneof![
        4 => (0u64..8, 0..STATUSES.len()).prop_map(|(id, s)| PickupOp::Created(id, s)),
        4 => (0u64..8, 0..STATUSES.len()).prop_map(|(id, s)| PickupOp::Updated(id, s)),
        2 => (0u64..8).prop_map(PickupOp::Deleted),
        1 => Just(PickupOp::DropChannel),
    ]
}

fn chat_op() -> impl Strategy<Value = ChatOp> {
    prop_oneof![
        4 => "[a-z ]{1,12}".prop_map(ChatOp::Remote),
        2 => any::<bool>().prop_map(ChatOp::Typing),
        3 => "[a-z ]{0,8}".prop_map(ChatOp::Compose),
        2 => "[a-z ]{0,8}".prop_map(ChatOp::Send),
        2 => (0u32..200).prop_map(ChatOp::Scroll),
        1 => Just(ChatOp::DropChannel),
    ]
}

/// Ops with millisecond gaps between them.
fn timed<T: std::fmt::Debug + Clone>(
    op: impl Strategy<Value = T>,
) -> impl Strategy<Value = Vec<(u64, T)>> {
    prop::collection::vec((0u64..3000, op), 0..40)
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(future)
}

fn sync_config() -> SyncConfig {
    SyncConfig::new("https://api.test", Some("tok".into()))
}

fn schedule_pickups(driver: &mut SimDriver, ops: &[(u64, PickupOp)]) {
    let mut at = Duration::ZERO;
    for (gap, op) in ops {
        at += Duration::from_millis(*gap);
        match op {
            PickupOp::Created(id, s) => {
                let pickup = Pickup::new(*id, STATUSES[*s]);
                driver.push_frame(at, SimBackend::pickup_frame("pickup_created", &pickup));
            },
            PickupOp::Updated(id, s) => {
                let pickup = Pickup::new(*id, STATUSES[*s]);
                driver.push_frame(at, SimBackend::pickup_frame("pickup_updated", &pickup));
            },
            PickupOp::Deleted(id) => driver.push_frame(at, SimBackend::pickup_deleted_frame(*id)),
            PickupOp::DropChannel => driver.drop_channel(at),
        }
    }
}

fn schedule_chat(driver: &mut SimDriver, ops: &[(u64, ChatOp)]) {
    let mut at = Duration::ZERO;
    let mut next_id = 1000;
    for (gap, op) in ops {
        at += Duration::from_millis(*gap);
        match op {
            ChatOp::Remote(body) => {
                next_id += 1;
                let frame = json!({
                    "event": "message",
                    "message": { "id": format!("m{next_id}"), "sender_id": 8, "content": body }
                });
                driver.push_frame(at, frame.to_string());
            },
            ChatOp::Typing(is_typing) => {
                let frame = json!({ "event": "typing", "user_id": 8, "is_typing": is_typing });
                driver.push_frame(at, frame.to_string());
            },
            ChatOp::Compose(text) => {
                driver.schedule(at, SyncEvent::ComposeChanged { text: text.clone() });
            },
            ChatOp::Send(body) => driver.schedule(at, SyncEvent::SendMessage { body: body.clone() }),
            ChatOp::Scroll(distance) => {
                driver.schedule(at, SyncEvent::Scrolled { distance_from_bottom: *distance });
            },
            ChatOp::DropChannel => driver.drop_channel(at),
        }
    }
}

proptest! {
    /// Pickup invariants hold under arbitrary live activity and disconnects.
    #[test]
    fn prop_pickup_feed_invariants_hold(
        seed in any::<u64>(),
        channel_up in prop::bool::weighted(0.8),
        ops in timed(pickup_op()),
    ) {
        let env = SimEnv::with_seed(seed);
        let mut backend = SimBackend::new(7);
        backend.channel_up = channel_up;
        let mut driver = SimDriver::new(env.clone(), backend)
            .with_invariants(InvariantRegistry::standard())
            .run_until(Duration::from_secs(150));
        schedule_pickups(&mut driver, &ops);

        let feed = PickupFeed::new(env, PickupConfig::new(sync_config())).unwrap();
        let driver = block_on(async {
            let mut runtime = Runtime::new(driver, feed);
            runtime.start().await.unwrap();
            while runtime.step().await.unwrap() {}
            runtime.into_parts().0
        });

        prop_assert!(driver.violations().is_empty(), "{:?}", driver.violations());
    }

    /// Once the stream goes quiet, every pickup sits where its last status
    /// puts it.
    #[test]
    fn prop_quiet_feed_matches_last_status(
        ops in prop::collection::vec((0u64..8, 0..STATUSES.len()), 1..30),
    ) {
        let env = SimEnv::default();
        let mut driver = SimDriver::new(env.clone(), SimBackend::new(7))
            .run_until(Duration::from_secs(20));
        let updates: Vec<_> =
            ops.iter().map(|&(id, s)| (100, PickupOp::Updated(id, s))).collect();
        schedule_pickups(&mut driver, &updates);

        let feed = PickupFeed::new(env, PickupConfig::new(sync_config())).unwrap();
        let driver = block_on(async {
            let mut runtime = Runtime::new(driver, feed);
            runtime.start().await.unwrap();
            while runtime.step().await.unwrap() {}
            runtime.into_parts().0
        });

        let Some(ViewSnapshot::Pickups(snapshot)) = driver.last_render() else {
            return Err(TestCaseError::fail("no pickup render"));
        };
        for (id, s) in &ops {
            let last = ops.iter().rev().find(|(other, _)| other == id).map_or(*s, |&(_, s)| s);
            let expected = bucket(&PickupStatus::from(STATUSES[last]));
            let list = match expected {
                Bucket::Pending => &snapshot.pending,
                Bucket::Available => &snapshot.available,
                Bucket::Completed => &snapshot.completed,
            };
            prop_assert!(list.iter().any(|p| p.id == *id), "pickup {} not in {:?}", id, expected);
        }
    }

    /// Chat invariants hold under arbitrary traffic, input and disconnects.
    #[test]
    fn prop_chat_room_invariants_hold(
        seed in any::<u64>(),
        channel_up in prop::bool::weighted(0.8),
        ops in timed(chat_op()),
    ) {
        let env = SimEnv::with_seed(seed);
        let mut backend = SimBackend::new(7);
        backend.channel_up = channel_up;
        let mut driver = SimDriver::new(env.clone(), backend)
            .with_invariants(InvariantRegistry::standard())
            .run_until(Duration::from_secs(150));
        schedule_chat(&mut driver, &ops);

        let mut config = ChatConfig::new(sync_config(), Some("r1".into()));
        config.local_user_id = Some(7);
        let room = ChatRoom::new(env, config).unwrap();
        let driver = block_on(async {
            let mut runtime = Runtime::new(driver, room);
            runtime.start().await.unwrap();
            while runtime.step().await.unwrap() {}
            runtime.into_parts().0
        });

        prop_assert!(driver.violations().is_empty(), "{:?}", driver.violations());
    }
}
