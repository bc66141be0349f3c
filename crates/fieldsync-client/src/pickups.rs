//! Pickup feed view.
//!
//! Maintains the pending / available / completed buckets from three sources
//! that all converge on [`Buckets::apply`]:
//!
//! - live `pickup_*` events, debounced through the [`CoalescingBuffer`]
//! - the initial bulk fetch
//! - periodic bulk fetches while the channel is down
//!
//! Bulk results are applied immediately, in reverse list order, so that
//! head-insertion reproduces the server's ordering.

use fieldsync_core::{
    Buckets, BufferedEvents, CoalescingBuffer, ConnectionState, Environment, Freshness, Link,
    LinkAction, PollCoordinator, SyncError, address::channel_url, classify::Bucket,
};
use fieldsync_proto::{Pickup, PickupId};
use tracing::{debug, info, warn};

use crate::{
    PickupConfig, PickupSnapshot, SyncAction, SyncEvent, SyncView, ViewSnapshot,
    router::{self, EventSink},
};

/// Live pickup feed.
pub struct PickupFeed<E: Environment> {
    env: E,
    link: Link<E::Instant>,
    buffer: CoalescingBuffer<E::Instant>,
    buckets: Buckets,
    poll: PollCoordinator<E::Instant>,
    last_sync_secs: Option<u64>,
    /// Visible state changed since the last render
    dirty: bool,
    torn_down: bool,
}

impl<E: Environment> PickupFeed<E> {
    /// Create the feed.
    ///
    /// A missing token leaves the live channel disabled; the feed still
    /// polls.
    ///
    /// # Errors
    ///
    /// - [`SyncError::InvalidUrl`] if the server address is unusable
    pub fn new(env: E, config: PickupConfig) -> Result<Self, SyncError> {
        let url = match channel_url(&config.sync.server, &config.path, config.sync.token.as_deref())
        {
            Ok(url) => Some(url),
            Err(e) if e.allows_polling() => {
                warn!(error = %e, "pickup channel disabled, polling only");
                None
            },
            Err(e) => return Err(e),
        };

        Ok(Self {
            env,
            link: Link::new(config.sync.link, url),
            buffer: CoalescingBuffer::new(config.flush_window),
            buckets: Buckets::new(),
            poll: PollCoordinator::new(config.poll_interval),
            last_sync_secs: None,
            dirty: false,
            torn_down: false,
        })
    }

    /// Current buckets.
    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    /// Wall-clock seconds of the last applied change.
    pub fn last_sync_secs(&self) -> Option<u64> {
        self.last_sync_secs
    }

    /// Number of live events waiting for the next flush.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn mark_synced(&mut self) {
        self.last_sync_secs = Some(self.env.wall_clock_secs());
        self.dirty = true;
    }

    fn apply(&mut self, batch: BufferedEvents) {
        if batch.is_empty() {
            return;
        }
        debug!(events = batch.len(), "applying pickup batch");
        self.buckets.apply(batch);
        self.mark_synced();
    }

    /// A successful fetch counts as a sync even when it changes nothing.
    fn apply_bulk(&mut self, mut pickups: Vec<Pickup>) {
        debug!(count = pickups.len(), "applying bulk fetch");
        pickups.reverse();
        self.buckets.apply(BufferedEvents {
            created: Vec::new(),
            updated: pickups,
            deleted: Vec::new(),
        });
        self.mark_synced();
    }

    fn link_actions(actions: Vec<LinkAction>) -> impl Iterator<Item = SyncAction> {
        actions.into_iter().map(|action| match action {
            LinkAction::Open { url } => SyncAction::Open { url },
            LinkAction::Close => SyncAction::Close,
        })
    }

    fn handle_start(&mut self) -> Vec<SyncAction> {
        let now = self.env.now();
        let mut actions: Vec<SyncAction> = Self::link_actions(self.link.connect()).collect();
        actions.push(SyncAction::FetchPickups);
        self.poll.start(now);
        self.dirty = true;
        actions
    }

    fn handle_tick(&mut self, now: E::Instant) -> Vec<SyncAction> {
        let mut actions: Vec<SyncAction> = Self::link_actions(self.link.tick(now)).collect();
        if !actions.is_empty() {
            self.dirty = true;
        }

        if let Some(batch) = self.buffer.poll(now) {
            self.apply(batch);
        }

        if self.poll.tick(now, self.link.is_connected()) {
            debug!("channel down, polling pickups");
            actions.push(SyncAction::FetchPickups);
        }
        actions
    }

    fn handle_teardown(&mut self) -> Vec<SyncAction> {
        info!("pickup feed teardown");
        self.torn_down = true;
        self.buffer.clear();
        self.poll.stop();
        Self::link_actions(self.link.close()).collect()
    }
}

impl<E: Environment> EventSink for PickupFeed<E> {
    fn on_pickup_created(&mut self, pickup: Pickup) {
        self.buffer.on_created(pickup, self.env.now());
    }

    fn on_pickup_updated(&mut self, pickup: Pickup) {
        self.buffer.on_updated(pickup, self.env.now());
    }

    fn on_pickup_deleted(&mut self, pickup_id: PickupId) {
        self.buffer.on_deleted(pickup_id, self.env.now());
    }
}

impl<E: Environment> SyncView for PickupFeed<E> {
    type Instant = E::Instant;

    fn handle(&mut self, event: SyncEvent<E::Instant>) -> Vec<SyncAction> {
        if self.torn_down {
            return Vec::new();
        }

        let mut actions = match event {
            SyncEvent::Start => self.handle_start(),
            SyncEvent::Tick { now } => self.handle_tick(now),
            SyncEvent::LinkOpened => {
                let actions: Vec<SyncAction> = Self::link_actions(self.link.on_open()).collect();
                if self.link.is_connected() {
                    self.mark_synced();
                }
                actions
            },
            SyncEvent::LinkClosed => {
                let was = self.link.state();
                self.link.on_closed(self.env.now());
                self.dirty |= was != self.link.state();
                Vec::new()
            },
            SyncEvent::FrameReceived(raw) => {
                router::route_frame(self, &raw);
                Vec::new()
            },
            SyncEvent::PickupsFetched(pickups) => {
                self.apply_bulk(pickups);
                Vec::new()
            },
            SyncEvent::RequestFailed { reason } => {
                warn!(%reason, "pickup fetch failed, retrying on next interval");
                Vec::new()
            },
            SyncEvent::Teardown => return self.handle_teardown(),
            SyncEvent::MessagesFetched(_)
            | SyncEvent::MessagePosted
            | SyncEvent::ComposeChanged { .. }
            | SyncEvent::SendMessage { .. }
            | SyncEvent::Scrolled { .. } => {
                debug!("chat event ignored by pickup feed");
                Vec::new()
            },
        };

        if std::mem::take(&mut self.dirty) {
            actions.push(SyncAction::Render(self.snapshot()));
        }
        actions
    }

    fn next_deadline(&self) -> Option<E::Instant> {
        [self.link.next_deadline(), self.buffer.next_deadline(), self.poll.next_deadline()]
            .into_iter()
            .flatten()
            .min()
    }

    fn snapshot(&self) -> ViewSnapshot {
        let now_secs = self.env.wall_clock_secs();
        ViewSnapshot::Pickups(PickupSnapshot {
            pending: self.buckets.get(Bucket::Pending).to_vec(),
            available: self.buckets.get(Bucket::Available).to_vec(),
            completed: self.buckets.get(Bucket::Completed).to_vec(),
            connection: self.link.state(),
            last_sync_secs: self.last_sync_secs,
            freshness: Freshness::at(self.last_sync_secs, now_secs),
            stale: Freshness::is_stale(self.last_sync_secs, now_secs),
        })
    }

    fn connection_state(&self) -> ConnectionState {
        self.link.state()
    }

    fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use fieldsync_core::env::test_utils::{MOCK_EPOCH_SECS, MockEnv};
    use serde_json::json;

    use super::*;
    use crate::SyncConfig;

    fn feed(env: &MockEnv) -> PickupFeed<MockEnv> {
        let config = PickupConfig::new(SyncConfig::new("http://h", Some("tok".into())));
        PickupFeed::new(env.clone(), config).unwrap()
    }

    fn frame(event: &str, pickup: serde_json::Value) -> SyncEvent<Duration> {
        SyncEvent::FrameReceived(json!({ "event": event, "pickup": pickup }).to_string())
    }

    fn ids(feed: &PickupFeed<MockEnv>, bucket: Bucket) -> Vec<PickupId> {
        feed.buckets().get(bucket).iter().map(|p| p.id).collect()
    }

    fn connect(feed: &mut PickupFeed<MockEnv>) {
        feed.handle(SyncEvent::Start);
        feed.handle(SyncEvent::LinkOpened);
    }

    #[test]
    fn start_opens_channel_and_fetches() {
        let env = MockEnv::new();
        let mut feed = feed(&env);
        let actions = feed.handle(SyncEvent::Start);

        assert_eq!(actions[0], SyncAction::Open { url: "ws://h/ws/pickups/?token=tok".into() });
        assert_eq!(actions[1], SyncAction::FetchPickups);
        assert!(matches!(actions[2], SyncAction::Render(_)));
    }

    #[test]
    fn missing_token_polls_only() {
        let env = MockEnv::new();
        let config = PickupConfig::new(SyncConfig::new("http://h", None));
        let mut feed = PickupFeed::new(env, config).unwrap();

        let actions = feed.handle(SyncEvent::Start);
        assert!(!actions.iter().any(|a| matches!(a, SyncAction::Open { .. })));
        assert!(actions.contains(&SyncAction::FetchPickups));
    }

    #[test]
    fn invalid_server_is_rejected() {
        let config = PickupConfig::new(SyncConfig::new("ftp://h", Some("t".into())));
        assert!(PickupFeed::new(MockEnv::new(), config).is_err());
    }

    #[test]
    fn live_events_are_debounced() {
        let env = MockEnv::new();
        let mut feed = feed(&env);
        connect(&mut feed);

        feed.handle(frame("pickup_created", json!({ "id": 1, "status": "available" })));
        env.advance(Duration::from_millis(200));
        feed.handle(frame("pickup_updated", json!({ "id": 1, "status": "accepted" })));

        assert_eq!(feed.buffered(), 2);
        assert!(feed.buckets().is_empty());
        assert_eq!(feed.next_deadline(), Some(Duration::from_millis(500)));

        env.advance(Duration::from_millis(300));
        let actions = feed.handle(SyncEvent::Tick { now: env.now() });

        assert!(matches!(actions.last(), Some(SyncAction::Render(_))));
        // created applies after updated within a batch, so its snapshot wins
        assert_eq!(ids(&feed, Bucket::Available), vec![1]);
        assert!(ids(&feed, Bucket::Pending).is_empty());
    }

    #[test]
    fn bulk_fetch_preserves_server_order() {
        let env = MockEnv::new();
        let mut feed = feed(&env);
        feed.handle(SyncEvent::Start);

        feed.handle(SyncEvent::PickupsFetched(vec![
            Pickup::new(3, "pending"),
            Pickup::new(2, "pending"),
            Pickup::new(9, "completed"),
        ]));

        assert_eq!(ids(&feed, Bucket::Pending), vec![3, 2]);
        assert_eq!(ids(&feed, Bucket::Completed), vec![9]);
        assert_eq!(feed.last_sync_secs(), Some(MOCK_EPOCH_SECS));
    }

    #[test]
    fn polling_only_while_disconnected() {
        let env = MockEnv::new();
        let mut feed = feed(&env);
        connect(&mut feed);

        env.advance(Duration::from_secs(60));
        let actions = feed.handle(SyncEvent::Tick { now: env.now() });
        assert!(!actions.contains(&SyncAction::FetchPickups));

        feed.handle(SyncEvent::LinkClosed);
        env.advance(Duration::from_secs(60));
        let actions = feed.handle(SyncEvent::Tick { now: env.now() });
        assert!(actions.contains(&SyncAction::FetchPickups));
    }

    #[test]
    fn connecting_stamps_last_sync() {
        let env = MockEnv::new();
        let mut feed = feed(&env);
        feed.handle(SyncEvent::Start);
        env.advance(Duration::from_secs(5));
        feed.handle(SyncEvent::LinkOpened);

        assert_eq!(feed.last_sync_secs(), Some(MOCK_EPOCH_SECS + 5));
    }

    #[test]
    fn teardown_clears_deadlines_and_closes() {
        let env = MockEnv::new();
        let mut feed = feed(&env);
        connect(&mut feed);
        feed.handle(frame("pickup_created", json!({ "id": 1, "status": "available" })));

        let actions = feed.handle(SyncEvent::Teardown);
        assert_eq!(actions, vec![SyncAction::Close]);
        assert_eq!(feed.next_deadline(), None);
        assert!(feed.is_torn_down());
        assert!(feed.handle(SyncEvent::LinkClosed).is_empty());
    }

    #[test]
    fn malformed_frame_changes_nothing() {
        let env = MockEnv::new();
        let mut feed = feed(&env);
        connect(&mut feed);

        let actions = feed.handle(SyncEvent::FrameReceived("{oops".into()));
        assert!(actions.is_empty());
        assert_eq!(feed.buffered(), 0);
    }
}
