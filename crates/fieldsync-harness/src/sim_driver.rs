//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the CLI's tokio driver but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`fieldsync_app::Runtime`] orchestration code runs in both production and
//! simulation.
//!
//! Requests are answered by a [`SimBackend`] after a fixed latency. Inputs
//! and answers are queued on a virtual timeline; waiting for the next event
//! jumps the clock straight to whichever comes first, the next queued input
//! or the view's deadline.

use std::{collections::BTreeMap, time::Duration};

use fieldsync_app::Driver;
use fieldsync_client::{SyncAction, SyncEvent, ViewSnapshot};
use fieldsync_core::Environment;
use fieldsync_proto::MessageId;
use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    SimBackend, SimEnv,
    invariants::{InvariantRegistry, RecordedCall, SystemSnapshot, Violation},
};

/// Default one-way latency of simulated requests.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(20);

/// Error type for simulation driver.
#[derive(Debug, Clone)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// Simulation driver for deterministic testing.
pub struct SimDriver {
    env: SimEnv,
    backend: SimBackend,
    latency: Duration,
    /// Queued inputs keyed by (delivery time, insertion order)
    timeline: BTreeMap<(Duration, u64), SyncEvent<Duration>>,
    seq: u64,
    end_at: Option<Duration>,
    /// A handshake is in flight
    opening: bool,
    socket_open: bool,
    calls: Vec<RecordedCall>,
    last_render: Option<ViewSnapshot>,
    renders: usize,
    invariants: Option<InvariantRegistry>,
    violations: Vec<Violation>,
}

impl SimDriver {
    /// Create a driver answering from `backend`.
    pub fn new(env: SimEnv, backend: SimBackend) -> Self {
        Self {
            env,
            backend,
            latency: DEFAULT_LATENCY,
            timeline: BTreeMap::new(),
            seq: 0,
            end_at: None,
            opening: false,
            socket_open: false,
            calls: Vec::new(),
            last_render: None,
            renders: 0,
            invariants: None,
            violations: Vec::new(),
        }
    }

    /// Enable invariant checking after every render.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(registry);
        self
    }

    /// Deliver `Teardown` once virtual time reaches `at`.
    #[must_use]
    pub fn run_until(mut self, at: Duration) -> Self {
        self.end_at = Some(at);
        self
    }

    /// Set the one-way latency of simulated requests.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue `event` for delivery at virtual time `at`.
    pub fn schedule(&mut self, at: Duration, event: SyncEvent<Duration>) {
        self.timeline.insert((at, self.seq), event);
        self.seq += 1;
    }

    /// Queue `event` for delivery `after` from now.
    pub fn schedule_in(&mut self, after: Duration, event: SyncEvent<Duration>) {
        let at = self.env.now() + after;
        self.schedule(at, event);
    }

    /// Push a frame from the server at `at`. Dropped if the socket is not
    /// open by then.
    pub fn push_frame(&mut self, at: Duration, frame: String) {
        self.schedule(at, SyncEvent::FrameReceived(frame));
    }

    /// Drop the live channel at `at`. Reconnects succeed unless
    /// `channel_up` is cleared on the backend.
    pub fn drop_channel(&mut self, at: Duration) {
        self.schedule(at, SyncEvent::LinkClosed);
    }

    /// Server state.
    pub fn backend(&self) -> &SimBackend {
        &self.backend
    }

    /// Mutable server state.
    pub fn backend_mut(&mut self) -> &mut SimBackend {
        &mut self.backend
    }

    /// Every call made so far.
    pub fn calls(&self) -> &[RecordedCall] {
        &self.calls
    }

    /// Times of every `Open` call.
    pub fn open_times(&self) -> Vec<Duration> {
        self.calls
            .iter()
            .filter(|c| matches!(c.action, SyncAction::Open { .. }))
            .map(|c| c.at)
            .collect()
    }

    /// Text frames sent so far.
    pub fn sent_frames(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match &c.action {
                SyncAction::Send(frame) => Some(frame.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Count calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&SyncAction) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(&c.action)).count()
    }

    /// Most recent render.
    pub fn last_render(&self) -> Option<&ViewSnapshot> {
        self.last_render.as_ref()
    }

    /// Number of renders so far.
    pub fn renders(&self) -> usize {
        self.renders
    }

    /// Whether the simulated socket is open.
    pub fn socket_open(&self) -> bool {
        self.socket_open
    }

    /// Invariant violations found so far.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    fn record(&mut self, action: SyncAction) {
        trace!(?action, "driver call");
        self.calls.push(RecordedCall { at: self.env.now(), action, socket_open: self.socket_open });
    }

    fn check_invariants(&mut self) {
        let Some(registry) = &self.invariants else {
            return;
        };
        let snapshot = SystemSnapshot { view: self.last_render.as_ref(), calls: &self.calls };
        if let Err(found) = registry.check_all(&snapshot) {
            self.violations.extend(found);
        }
    }

    /// Apply the server-side effect of an outgoing frame.
    fn serve_frame(&mut self, frame: &str) {
        let Ok(value) = serde_json::from_str::<Value>(frame) else {
            return;
        };
        match value["action"].as_str() {
            Some("send_message") => {
                let body = value["message"].as_str().unwrap_or_default().to_string();
                let worker = self.backend.worker;
                let message = self.backend.append_message(worker, &body);
                let echo = SyncEvent::FrameReceived(SimBackend::message_frame(&message));
                self.schedule_in(self.latency, echo);
            },
            Some("read") => {
                let ids: Vec<MessageId> =
                    serde_json::from_value(value["message_ids"].clone()).unwrap_or_default();
                self.backend.mark_read(&ids);
            },
            _ => {},
        }
    }

    /// Whether a queued event still applies to the current socket.
    fn accept(&mut self, event: &SyncEvent<Duration>) -> bool {
        match event {
            SyncEvent::LinkOpened => {
                if !self.opening {
                    return false;
                }
                self.opening = false;
                self.socket_open = true;
                true
            },
            SyncEvent::LinkClosed => {
                if !self.opening && !self.socket_open {
                    return false;
                }
                self.opening = false;
                self.socket_open = false;
                true
            },
            SyncEvent::FrameReceived(_) => self.socket_open,
            _ => true,
        }
    }

    fn rest_answer(&self, ok: SyncEvent<Duration>) -> SyncEvent<Duration> {
        if self.backend.rest_up { ok } else { SyncEvent::RequestFailed { reason: "503".into() } }
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = Duration;

    async fn next_event(
        &mut self,
        deadline: Option<Duration>,
    ) -> Result<Option<SyncEvent<Duration>>, SimDriverError> {
        loop {
            let queued = self.timeline.keys().next().map(|&(at, _)| at);
            let wake = match (queued, deadline) {
                (Some(at), Some(d)) => at.min(d),
                (Some(at), None) => at,
                (None, Some(d)) => d,
                (None, None) => {
                    debug!("nothing left to simulate");
                    return Ok(Some(SyncEvent::Teardown));
                },
            };

            if let Some(end) = self.end_at {
                if wake > end {
                    self.env.advance_to(end);
                    self.end_at = None;
                    return Ok(Some(SyncEvent::Teardown));
                }
            }

            self.env.advance_to(wake);
            if queued != Some(wake) {
                return Ok(None);
            }

            let Some((_, event)) = self.timeline.pop_first() else {
                return Ok(None);
            };
            if self.accept(&event) {
                return Ok(Some(event));
            }
            trace!(?event, "dropping stale event");
        }
    }

    async fn open(&mut self, url: &str) -> Result<(), SimDriverError> {
        self.record(SyncAction::Open { url: url.to_string() });
        self.opening = true;
        let outcome =
            if self.backend.channel_up { SyncEvent::LinkOpened } else { SyncEvent::LinkClosed };
        self.schedule_in(self.latency, outcome);
        Ok(())
    }

    async fn send(&mut self, frame: String) -> Result<(), SimDriverError> {
        self.record(SyncAction::Send(frame.clone()));
        if self.socket_open {
            self.serve_frame(&frame);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.record(SyncAction::Close);
        self.opening = false;
        self.socket_open = false;
    }

    async fn fetch_pickups(&mut self) -> Result<(), SimDriverError> {
        self.record(SyncAction::FetchPickups);
        let answer = self.rest_answer(SyncEvent::PickupsFetched(self.backend.pickups.clone()));
        self.schedule_in(self.latency * 2, answer);
        Ok(())
    }

    async fn fetch_messages(&mut self, room: &str) -> Result<(), SimDriverError> {
        self.record(SyncAction::FetchMessages { room: room.to_string() });
        let answer = self.rest_answer(SyncEvent::MessagesFetched(self.backend.messages.clone()));
        self.schedule_in(self.latency * 2, answer);
        Ok(())
    }

    async fn post_message(&mut self, room: &str, body: &str) -> Result<(), SimDriverError> {
        self.record(SyncAction::PostMessage { room: room.to_string(), body: body.to_string() });
        if self.backend.rest_up {
            let worker = self.backend.worker;
            self.backend.append_message(worker, body);
        }
        let answer = self.rest_answer(SyncEvent::MessagePosted);
        self.schedule_in(self.latency * 2, answer);
        Ok(())
    }

    fn now(&self) -> Duration {
        self.env.now()
    }

    fn render(&mut self, snapshot: &ViewSnapshot) -> Result<(), SimDriverError> {
        self.last_render = Some(snapshot.clone());
        self.renders += 1;
        self.check_invariants();
        Ok(())
    }

    fn stop(&mut self) {
        self.timeline.clear();
    }
}
