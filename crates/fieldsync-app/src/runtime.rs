//! Generic runtime for view orchestration.
//!
//! The Runtime drives a single view's event loop, coordinating between:
//! - [`SyncView`]: the Sans-IO view state machine
//! - [`Driver`]: platform-specific I/O
//!
//! Each cycle waits for input or the view's next deadline, feeds the
//! resulting event to the view, and executes the returned actions.

use fieldsync_client::{SyncAction, SyncEvent, SyncView};
use tracing::{debug, trace};

use crate::Driver;

/// Generic runtime that orchestrates a view and a driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `V`: View sharing the driver's instant type
pub struct Runtime<D, V>
where
    D: Driver,
    V: SyncView<Instant = D::Instant>,
{
    driver: D,
    view: V,
}

impl<D, V> Runtime<D, V>
where
    D: Driver,
    D::Instant: std::fmt::Debug,
    V: SyncView<Instant = D::Instant>,
{
    /// Create a new runtime around `view`.
    pub fn new(driver: D, view: V) -> Self {
        Self { driver, view }
    }

    /// Run until the view is torn down.
    ///
    /// Delivers `Start`, then processes one event per cycle. The driver ends
    /// the loop by producing `Teardown`.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(mut self) -> Result<(), D::Error> {
        self.start().await?;

        while self.step().await? {}

        self.driver.stop();
        Ok(())
    }

    /// Deliver `Start` to the view.
    pub async fn start(&mut self) -> Result<(), D::Error> {
        self.deliver(SyncEvent::Start).await
    }

    /// Process one cycle of the event loop.
    ///
    /// Waits for the next input or until the view's earliest deadline, in
    /// which case a `Tick` is delivered. Returns `false` once the view is
    /// torn down.
    pub async fn step(&mut self) -> Result<bool, D::Error> {
        if self.view.is_torn_down() {
            return Ok(false);
        }

        let deadline = self.view.next_deadline();
        let event = match self.driver.next_event(deadline).await? {
            Some(event) => event,
            None => SyncEvent::Tick { now: self.driver.now() },
        };
        self.deliver(event).await?;

        Ok(!self.view.is_torn_down())
    }

    /// Feed one event to the view and execute its actions.
    pub async fn deliver(&mut self, event: SyncEvent<D::Instant>) -> Result<(), D::Error> {
        trace!(?event, "delivering event");
        let actions = self.view.handle(event);
        self.execute(actions).await
    }

    async fn execute(&mut self, actions: Vec<SyncAction>) -> Result<(), D::Error> {
        for action in actions {
            match action {
                SyncAction::Open { url } => {
                    debug!("opening channel");
                    self.driver.open(&url).await?;
                },
                SyncAction::Send(frame) => self.driver.send(frame).await?,
                SyncAction::Close => self.driver.close(),
                SyncAction::FetchPickups => self.driver.fetch_pickups().await?,
                SyncAction::FetchMessages { room } => self.driver.fetch_messages(&room).await?,
                SyncAction::PostMessage { room, body } => {
                    self.driver.post_message(&room, &body).await?;
                },
                SyncAction::Render(snapshot) => self.driver.render(&snapshot)?,
            }
        }
        Ok(())
    }

    /// Get a reference to the view
    pub fn view(&self) -> &V {
        &self.view
    }

    /// Get a reference to the driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Get a mutable reference to the driver
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Split into driver and view.
    pub fn into_parts(self) -> (D, V) {
        (self.driver, self.view)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, time::Duration};

    use fieldsync_client::{PickupConfig, PickupFeed, SyncConfig, ViewSnapshot};
    use fieldsync_core::{Environment, env::test_utils::MockEnv};

    use super::*;

    #[derive(Debug)]
    struct Never;

    impl std::fmt::Display for Never {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("never")
        }
    }

    impl std::error::Error for Never {}

    /// Replays queued events and records what the runtime asked for.
    struct Scripted {
        env: MockEnv,
        inputs: VecDeque<SyncEvent<Duration>>,
        calls: Vec<String>,
        renders: Vec<ViewSnapshot>,
    }

    impl Scripted {
        fn new(env: MockEnv, inputs: Vec<SyncEvent<Duration>>) -> Self {
            Self { env, inputs: inputs.into(), calls: Vec::new(), renders: Vec::new() }
        }
    }

    impl Driver for Scripted {
        type Error = Never;
        type Instant = Duration;

        async fn next_event(
            &mut self,
            deadline: Option<Duration>,
        ) -> Result<Option<SyncEvent<Duration>>, Never> {
            if let Some(event) = self.inputs.pop_front() {
                return Ok(Some(event));
            }
            match deadline {
                Some(at) => {
                    if at > self.env.now() {
                        self.env.advance(at - self.env.now());
                    }
                    Ok(None)
                },
                None => Ok(Some(SyncEvent::Teardown)),
            }
        }

        async fn open(&mut self, url: &str) -> Result<(), Never> {
            self.calls.push(format!("open {url}"));
            Ok(())
        }

        async fn send(&mut self, frame: String) -> Result<(), Never> {
            self.calls.push(format!("send {frame}"));
            Ok(())
        }

        fn close(&mut self) {
            self.calls.push("close".into());
        }

        async fn fetch_pickups(&mut self) -> Result<(), Never> {
            self.calls.push("fetch pickups".into());
            Ok(())
        }

        async fn fetch_messages(&mut self, room: &str) -> Result<(), Never> {
            self.calls.push(format!("fetch messages {room}"));
            Ok(())
        }

        async fn post_message(&mut self, room: &str, body: &str) -> Result<(), Never> {
            self.calls.push(format!("post {room} {body}"));
            Ok(())
        }

        fn now(&self) -> Duration {
            self.env.now()
        }

        fn render(&mut self, snapshot: &ViewSnapshot) -> Result<(), Never> {
            self.renders.push(snapshot.clone());
            Ok(())
        }

        fn stop(&mut self) {}
    }

    fn feed(env: &MockEnv) -> PickupFeed<MockEnv> {
        let config = PickupConfig::new(SyncConfig::new("http://h", Some("t".into())));
        PickupFeed::new(env.clone(), config).unwrap()
    }

    #[tokio::test]
    async fn start_executes_open_and_fetch() {
        let env = MockEnv::new();
        let mut runtime = Runtime::new(Scripted::new(env.clone(), Vec::new()), feed(&env));
        runtime.start().await.unwrap();

        let calls = &runtime.driver().calls;
        assert_eq!(calls[0], "open ws://h/ws/pickups/?token=t");
        assert_eq!(calls[1], "fetch pickups");
        assert_eq!(runtime.driver().renders.len(), 1);
    }

    #[tokio::test]
    async fn passing_deadline_delivers_tick() {
        let env = MockEnv::new();
        let driver = Scripted::new(env.clone(), Vec::new());
        let mut runtime = Runtime::new(driver, feed(&env));
        runtime.start().await.unwrap();
        runtime.deliver(SyncEvent::LinkClosed).await.unwrap();

        // Reconnect after the first backoff delay
        assert!(runtime.step().await.unwrap());
        assert_eq!(env.now(), Duration::from_secs(1));
        assert_eq!(
            runtime.driver().calls.last().map(String::as_str),
            Some("open ws://h/ws/pickups/?token=t")
        );
    }

    #[tokio::test]
    async fn run_stops_after_teardown() {
        let env = MockEnv::new();
        let driver = Scripted::new(env.clone(), vec![SyncEvent::LinkOpened, SyncEvent::Teardown]);
        let runtime = Runtime::new(driver, feed(&env));

        runtime.run().await.unwrap();
    }

    #[tokio::test]
    async fn teardown_closes_and_stops_driver() {
        let env = MockEnv::new();
        let driver = Scripted::new(env.clone(), vec![SyncEvent::LinkOpened, SyncEvent::Teardown]);
        let mut runtime = Runtime::new(driver, feed(&env));
        runtime.start().await.unwrap();

        assert!(runtime.step().await.unwrap());
        assert!(!runtime.step().await.unwrap());
        assert!(!runtime.step().await.unwrap());

        let (driver, view) = runtime.into_parts();
        assert_eq!(driver.calls.last().map(String::as_str), Some("close"));
        assert!(view.is_torn_down());
    }
}
