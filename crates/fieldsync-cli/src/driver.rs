//! Tokio driver: WebSocket channel, REST requests, terminal I/O.
//!
//! Every request runs on its own task and reports back through one inbound
//! queue, so [`Driver::next_event`] is a single `recv` with a deadline.
//! Socket events carry the generation of the open that produced them;
//! anything from a socket that has since been closed or replaced is dropped.

use std::{
    io::{self, Write},
    time::Instant,
};

use fieldsync_app::Driver;
use fieldsync_client::{
    SyncEvent, ViewSnapshot,
    rest::RestClient,
    transport,
};
use fieldsync_core::Environment;
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
    task::{JoinHandle, JoinSet},
};
use tracing::{debug, info, warn};

use crate::{render::TextRenderer, system_env::SystemEnv};

/// Driver errors.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Writing to the terminal failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Every inbound sender is gone.
    #[error("inbound queue closed")]
    InboundClosed,
}

/// What standard input lines mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Lines are ignored. End of input quits.
    Watch,
    /// Each line is composed and sent as a chat message.
    Chat,
}

enum Inbound {
    Opened { generation: u64, to_server: mpsc::Sender<String> },
    Frame { generation: u64, text: String },
    Closed { generation: u64 },
    Event(SyncEvent<Instant>),
}

/// Production [`Driver`] on tokio.
pub struct TokioDriver {
    env: SystemEnv,
    rest: RestClient,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    inbound_rx: mpsc::UnboundedReceiver<Inbound>,
    generation: u64,
    link: Option<JoinHandle<()>>,
    to_server: Option<mpsc::Sender<String>>,
    requests: JoinSet<()>,
    input: Option<JoinHandle<()>>,
    renderer: TextRenderer,
}

impl TokioDriver {
    /// Create a driver. No terminal input is read until
    /// [`TokioDriver::read_input`].
    pub fn new(env: SystemEnv, rest: RestClient) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        Self {
            env,
            rest,
            inbound_tx,
            inbound_rx,
            generation: 0,
            link: None,
            to_server: None,
            requests: JoinSet::new(),
            input: None,
            renderer: TextRenderer::default(),
        }
    }

    /// Start forwarding standard input. End of input or Ctrl-C tears the
    /// view down.
    ///
    /// Must be called inside a tokio runtime.
    pub fn read_input(&mut self, mode: InputMode) {
        if let Some(previous) = self.input.take() {
            previous.abort();
        }
        self.input = Some(tokio::spawn(forward_input(self.inbound_tx.clone(), mode)));
    }

    /// Drop the current socket and invalidate its pending events.
    fn drop_link(&mut self) {
        self.generation += 1;
        self.to_server = None;
        if let Some(link) = self.link.take() {
            link.abort();
        }
    }

    fn accept(&mut self, inbound: Inbound) -> Option<SyncEvent<Instant>> {
        match inbound {
            Inbound::Event(event) => Some(event),
            Inbound::Opened { generation, to_server } if generation == self.generation => {
                self.to_server = Some(to_server);
                Some(SyncEvent::LinkOpened)
            },
            Inbound::Frame { generation, text } if generation == self.generation => {
                Some(SyncEvent::FrameReceived(text))
            },
            Inbound::Closed { generation } if generation == self.generation => {
                self.to_server = None;
                Some(SyncEvent::LinkClosed)
            },
            _ => {
                debug!("dropping event from a replaced socket");
                None
            },
        }
    }

    fn spawn_request<F>(&mut self, request: F)
    where
        F: std::future::Future<Output = SyncEvent<Instant>> + Send + 'static,
    {
        let inbound = self.inbound_tx.clone();
        self.requests.spawn(async move {
            let event = request.await;
            let _ = inbound.send(Inbound::Event(event));
        });
    }
}

impl Driver for TokioDriver {
    type Error = DriverError;
    type Instant = Instant;

    async fn next_event(
        &mut self,
        deadline: Option<Instant>,
    ) -> Result<Option<SyncEvent<Instant>>, DriverError> {
        while self.requests.try_join_next().is_some() {}

        loop {
            let inbound = match deadline {
                Some(deadline) => {
                    let deadline = tokio::time::Instant::from_std(deadline);
                    match tokio::time::timeout_at(deadline, self.inbound_rx.recv()).await {
                        Ok(inbound) => inbound,
                        Err(_) => return Ok(None),
                    }
                },
                None => self.inbound_rx.recv().await,
            };

            let inbound = inbound.ok_or(DriverError::InboundClosed)?;
            if let Some(event) = self.accept(inbound) {
                return Ok(Some(event));
            }
        }
    }

    async fn open(&mut self, url: &str) -> Result<(), DriverError> {
        self.drop_link();
        let generation = self.generation;
        let inbound = self.inbound_tx.clone();
        let url = url.to_string();

        self.link = Some(tokio::spawn(async move {
            let mut socket = match transport::connect(&url).await {
                Ok(socket) => socket,
                Err(e) => {
                    warn!(error = %e, "channel connect failed");
                    let _ = inbound.send(Inbound::Closed { generation });
                    return;
                },
            };

            let opened = Inbound::Opened { generation, to_server: socket.to_server.clone() };
            if inbound.send(opened).is_err() {
                return;
            }
            while let Some(text) = socket.from_server.recv().await {
                if inbound.send(Inbound::Frame { generation, text }).is_err() {
                    return;
                }
            }
            info!("channel dropped");
            let _ = inbound.send(Inbound::Closed { generation });
        }));
        Ok(())
    }

    async fn send(&mut self, frame: String) -> Result<(), DriverError> {
        let Some(to_server) = &self.to_server else {
            warn!("send with no open channel");
            return Ok(());
        };
        if to_server.send(frame).await.is_err() {
            // The reader reports the close
            debug!("channel writer already stopped");
        }
        Ok(())
    }

    fn close(&mut self) {
        self.drop_link();
    }

    async fn fetch_pickups(&mut self) -> Result<(), DriverError> {
        let rest = self.rest.clone();
        self.spawn_request(async move {
            match rest.all_pickups().await {
                Ok(pickups) => SyncEvent::PickupsFetched(pickups),
                Err(e) => SyncEvent::RequestFailed { reason: e.to_string() },
            }
        });
        Ok(())
    }

    async fn fetch_messages(&mut self, room: &str) -> Result<(), DriverError> {
        let rest = self.rest.clone();
        let room = room.to_string();
        self.spawn_request(async move {
            match rest.messages(&room).await {
                Ok(messages) => SyncEvent::MessagesFetched(messages),
                Err(e) => SyncEvent::RequestFailed { reason: e.to_string() },
            }
        });
        Ok(())
    }

    async fn post_message(&mut self, room: &str, body: &str) -> Result<(), DriverError> {
        let rest = self.rest.clone();
        let (room, body) = (room.to_string(), body.to_string());
        self.spawn_request(async move {
            match rest.post_message(&room, &body).await {
                Ok(()) => SyncEvent::MessagePosted,
                Err(e) => SyncEvent::RequestFailed { reason: e.to_string() },
            }
        });
        Ok(())
    }

    fn now(&self) -> Instant {
        self.env.now()
    }

    fn render(&mut self, snapshot: &ViewSnapshot) -> Result<(), DriverError> {
        let lines = self.renderer.lines(snapshot);
        if lines.is_empty() {
            return Ok(());
        }

        let mut out = io::stdout().lock();
        for line in lines {
            writeln!(out, "{line}")?;
        }
        out.flush()?;
        Ok(())
    }

    fn stop(&mut self) {
        self.drop_link();
        self.requests.abort_all();
        if let Some(input) = self.input.take() {
            input.abort();
        }
    }
}

/// Forward terminal input until end of input or Ctrl-C, then tear down.
async fn forward_input(inbound: mpsc::UnboundedSender<Inbound>, mode: InputMode) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) if mode == InputMode::Chat => {
                    let compose = SyncEvent::ComposeChanged { text: line.clone() };
                    let _ = inbound.send(Inbound::Event(compose));
                    let _ = inbound.send(Inbound::Event(SyncEvent::SendMessage { body: line }));
                },
                Ok(Some(_)) => {},
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "reading input failed");
                    break;
                },
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let _ = inbound.send(Inbound::Event(SyncEvent::Teardown));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> TokioDriver {
        let rest = RestClient::new("http://127.0.0.1:1", None).unwrap();
        TokioDriver::new(SystemEnv::new(), rest)
    }

    #[tokio::test]
    async fn passed_deadline_yields_none() {
        let mut driver = driver();
        let deadline = driver.now();

        assert!(driver.next_event(Some(deadline)).await.unwrap().is_none());
        driver.stop();
    }

    #[tokio::test]
    async fn events_from_replaced_socket_are_dropped() {
        let mut driver = driver();
        driver.drop_link();
        let stale = driver.generation - 1;

        let frame = Inbound::Frame { generation: stale, text: "{}".into() };
        assert!(driver.accept(frame).is_none());
        assert!(driver.accept(Inbound::Closed { generation: stale }).is_none());

        let current = driver.generation;
        let closed = driver.accept(Inbound::Closed { generation: current });
        assert!(matches!(closed, Some(SyncEvent::LinkClosed)));
        driver.stop();
    }

    #[tokio::test]
    async fn unreachable_channel_reports_closed() {
        let mut driver = driver();
        driver.open("ws://127.0.0.1:1/ws/pickups/").await.unwrap();

        let event = driver.next_event(None).await.unwrap();
        assert!(matches!(event, Some(SyncEvent::LinkClosed)));
        driver.stop();
    }

    #[tokio::test]
    async fn failed_fetch_reports_request_failed() {
        let mut driver = driver();
        driver.fetch_pickups().await.unwrap();

        let event = driver.next_event(None).await.unwrap();
        assert!(matches!(event, Some(SyncEvent::RequestFailed { .. })));
        driver.stop();
    }
}
