//! Chat room view.
//!
//! Keeps the message list of one room in sync, tracks the other
//! participant's typing and presence, announces the local user's typing and
//! acknowledges read messages.
//!
//! # Invariants
//!
//! - Nothing is sent unless the channel is connected. Outgoing messages fall
//!   back to a REST post instead.
//! - Read acknowledgments are only evaluated while connected, so a dropped
//!   send never consumes the throttle window.

use fieldsync_core::{
    ConnectionState, Environment, Link, LinkAction, MessageList, OutboundTyping, PollCoordinator,
    PresenceTracker, ReadReceiptThrottler, SyncError,
    address::{channel_url, chat_path},
};
use fieldsync_proto::{ChatMessage, MessageId, OutgoingFrame, PresenceStatus, UserId, encode};
use tracing::{debug, info, warn};

use crate::{
    ChatConfig, ChatSnapshot, SyncAction, SyncEvent, SyncView, ViewSnapshot,
    router::{self, EventSink},
};

/// Live chat room.
pub struct ChatRoom<E: Environment> {
    env: E,
    room: Option<String>,
    scroll_threshold_px: u32,
    link: Link<E::Instant>,
    messages: MessageList,
    presence: PresenceTracker<E::Instant>,
    outbound_typing: OutboundTyping<E::Instant>,
    receipts: ReadReceiptThrottler<E::Instant>,
    poll: PollCoordinator<E::Instant>,
    /// A message arrived since the last receipt check
    arrived: bool,
    /// Visible state changed since the last render
    dirty: bool,
    torn_down: bool,
}

impl<E: Environment> ChatRoom<E> {
    /// Create the room view.
    ///
    /// A missing room or token leaves the live channel disabled.
    ///
    /// # Errors
    ///
    /// - [`SyncError::InvalidUrl`] if the server address is unusable
    pub fn new(env: E, config: ChatConfig) -> Result<Self, SyncError> {
        let url = match config.room.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(room) => {
                channel_url(&config.sync.server, &chat_path(room), config.sync.token.as_deref())
            },
            None => Err(SyncError::MissingChannel),
        };
        let url = match url {
            Ok(url) => Some(url),
            Err(e) if e.allows_polling() => {
                warn!(error = %e, "chat channel disabled");
                None
            },
            Err(e) => return Err(e),
        };

        Ok(Self {
            env,
            room: config.room,
            scroll_threshold_px: config.scroll_threshold_px,
            link: Link::new(config.sync.link, url),
            messages: MessageList::new(config.local_user_id),
            presence: PresenceTracker::new(config.local_user_id, config.typing_timeout),
            outbound_typing: OutboundTyping::new(config.typing_idle),
            receipts: ReadReceiptThrottler::new(config.read_throttle, config.read_batch),
            poll: PollCoordinator::new(config.poll_interval),
            arrived: false,
            dirty: false,
            torn_down: false,
        })
    }

    /// Messages, oldest first.
    pub fn messages(&self) -> &[ChatMessage] {
        self.messages.as_slice()
    }

    /// Local user id, if known.
    pub fn local_user(&self) -> Option<UserId> {
        self.messages.local_user()
    }

    /// Remote participants currently typing.
    pub fn typing_users(&self) -> Vec<UserId> {
        self.presence.typing_users()
    }

    /// Last known presence of `user`.
    pub fn presence_of(&self, user: UserId) -> Option<PresenceStatus> {
        self.presence.presence(user)
    }

    fn link_actions(actions: Vec<LinkAction>) -> impl Iterator<Item = SyncAction> {
        actions.into_iter().map(|action| match action {
            LinkAction::Open { url } => SyncAction::Open { url },
            LinkAction::Close => SyncAction::Close,
        })
    }

    fn fetch(&self) -> Option<SyncAction> {
        self.room.clone().map(|room| SyncAction::FetchMessages { room })
    }

    /// Encode `frame` for the open channel. `None` while not connected.
    fn send(&self, frame: &OutgoingFrame) -> Option<SyncAction> {
        if !self.link.is_connected() {
            return None;
        }
        match encode(frame) {
            Ok(text) => Some(SyncAction::Send(text)),
            Err(error) => {
                warn!(%error, "failed to encode outgoing frame");
                None
            },
        }
    }

    fn send_typing(&self, is_typing: Option<bool>) -> Option<SyncAction> {
        is_typing.and_then(|is_typing| self.send(&OutgoingFrame::Typing { is_typing }))
    }

    fn maybe_send_read_receipts(&mut self) -> Option<SyncAction> {
        if !self.link.is_connected() {
            return None;
        }
        let message_ids: Vec<MessageId> =
            self.receipts.maybe_send(self.messages.as_slice(), self.env.now())?;
        debug!(count = message_ids.len(), "acknowledging messages");
        self.send(&OutgoingFrame::Read { message_ids })
    }

    fn learn_local_user(&mut self, user: UserId) {
        info!(user, "local user identified");
        self.messages.set_local_user(user);
        self.presence.set_local_user(user);
    }

    fn handle_start(&mut self) -> Vec<SyncAction> {
        let mut actions: Vec<SyncAction> = Self::link_actions(self.link.connect()).collect();
        actions.extend(self.fetch());
        self.poll.start(self.env.now());
        self.dirty = true;
        actions
    }

    fn handle_tick(&mut self, now: E::Instant) -> Vec<SyncAction> {
        let mut actions: Vec<SyncAction> = Self::link_actions(self.link.tick(now)).collect();
        if !actions.is_empty() {
            self.dirty = true;
        }

        self.dirty |= self.presence.tick(now);

        let stop = self.outbound_typing.tick(now);
        actions.extend(self.send_typing(stop));

        if self.poll.tick(now, self.link.is_connected()) {
            debug!("channel down, polling messages");
            actions.extend(self.fetch());
        }
        actions
    }

    fn handle_fetched(&mut self, snapshot: Vec<ChatMessage>) -> Vec<SyncAction> {
        if self.messages.local_user().is_none() {
            if let Some(user) = MessageList::infer_local_user(&snapshot) {
                self.learn_local_user(user);
            }
        }

        let added = self.messages.merge(snapshot);
        self.dirty = true;
        if added > 0 {
            return self.maybe_send_read_receipts().into_iter().collect();
        }
        Vec::new()
    }

    fn handle_send(&mut self, body: &str) -> Vec<SyncAction> {
        let body = body.trim();
        if body.is_empty() {
            return Vec::new();
        }
        let Some(room) = self.room.clone() else {
            warn!("no chat room, message dropped");
            return Vec::new();
        };

        let stop = self.outbound_typing.reset();
        let mut actions: Vec<SyncAction> = self.send_typing(stop).into_iter().collect();

        if self.link.is_connected() {
            let frame = OutgoingFrame::SendMessage {
                message: body.to_string(),
                client_message_id: self.env.random_id(),
            };
            actions.extend(self.send(&frame));
        } else {
            debug!("channel down, posting message over REST");
            actions.push(SyncAction::PostMessage { room, body: body.to_string() });
        }
        actions
    }

    fn handle_teardown(&mut self) -> Vec<SyncAction> {
        info!(room = ?self.room, "chat room teardown");
        self.torn_down = true;
        self.poll.stop();
        self.presence.clear();
        self.outbound_typing.reset();
        Self::link_actions(self.link.close()).collect()
    }
}

impl<E: Environment> EventSink for ChatRoom<E> {
    fn on_message(&mut self, message: ChatMessage) {
        if self.messages.push(message) {
            self.arrived = true;
            self.dirty = true;
        }
    }

    fn on_read(&mut self, message_ids: Vec<MessageId>, _user_id: Option<UserId>) {
        if self.messages.mark_read(&message_ids) > 0 {
            self.dirty = true;
        }
    }

    fn on_typing(&mut self, user_id: UserId, is_typing: bool) {
        self.dirty |= self.presence.on_typing(user_id, is_typing, self.env.now());
    }

    fn on_presence(&mut self, user_id: UserId, status: PresenceStatus) {
        self.dirty |= self.presence.on_presence(user_id, status);
    }
}

impl<E: Environment> SyncView for ChatRoom<E> {
    type Instant = E::Instant;

    fn handle(&mut self, event: SyncEvent<E::Instant>) -> Vec<SyncAction> {
        if self.torn_down {
            return Vec::new();
        }

        let mut actions = match event {
            SyncEvent::Start => self.handle_start(),
            SyncEvent::Tick { now } => self.handle_tick(now),
            SyncEvent::LinkOpened => {
                self.dirty = true;
                Self::link_actions(self.link.on_open()).collect()
            },
            SyncEvent::LinkClosed => {
                let was = self.link.state();
                self.link.on_closed(self.env.now());
                self.dirty |= was != self.link.state();
                Vec::new()
            },
            SyncEvent::FrameReceived(raw) => {
                router::route_frame(self, &raw);
                if std::mem::take(&mut self.arrived) {
                    self.maybe_send_read_receipts().into_iter().collect()
                } else {
                    Vec::new()
                }
            },
            SyncEvent::MessagesFetched(snapshot) => self.handle_fetched(snapshot),
            SyncEvent::MessagePosted => self.fetch().into_iter().collect(),
            SyncEvent::RequestFailed { reason } => {
                warn!(%reason, "chat request failed");
                Vec::new()
            },
            SyncEvent::ComposeChanged { text } => {
                let now = self.env.now();
                let typing = self.outbound_typing.on_input(&text, self.link.is_connected(), now);
                self.send_typing(typing).into_iter().collect()
            },
            SyncEvent::SendMessage { body } => self.handle_send(&body),
            SyncEvent::Scrolled { distance_from_bottom } => {
                if distance_from_bottom < self.scroll_threshold_px {
                    self.maybe_send_read_receipts().into_iter().collect()
                } else {
                    Vec::new()
                }
            },
            SyncEvent::Teardown => return self.handle_teardown(),
            SyncEvent::PickupsFetched(_) => {
                debug!("pickup event ignored by chat room");
                Vec::new()
            },
        };

        if std::mem::take(&mut self.dirty) {
            actions.push(SyncAction::Render(self.snapshot()));
        }
        actions
    }

    fn next_deadline(&self) -> Option<E::Instant> {
        [
            self.link.next_deadline(),
            self.presence.next_deadline(),
            self.outbound_typing.next_deadline(),
            self.poll.next_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot::Chat(ChatSnapshot {
            room: self.room.clone(),
            messages: self.messages.as_slice().to_vec(),
            typing: self.presence.typing_users(),
            presence: self.presence.presences(),
            local_user: self.messages.local_user(),
            connection: self.link.state(),
        })
    }

    fn connection_state(&self) -> ConnectionState {
        self.link.state()
    }

    fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}
