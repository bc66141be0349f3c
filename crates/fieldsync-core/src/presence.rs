//! Ephemeral typing and presence state.
//!
//! Nothing here outlives the view. Inbound typing indicators expire on their
//! own because the remote side may disconnect without ever sending
//! `is_typing: false`.
//!
//! # Invariants
//!
//! - Events from the local user never change state.
//! - A typing indicator expires exactly `typing_timeout` after the last
//!   `is_typing: true` from that participant.

use std::{collections::BTreeMap, time::Duration};

use fieldsync_proto::{PresenceStatus, UserId};

use crate::Moment;

/// How long a remote typing indicator stays on without a refresh.
pub const DEFAULT_TYPING_TIMEOUT: Duration = Duration::from_millis(2500);

/// Quiet period after the last local keystroke before `typing: false`.
pub const DEFAULT_TYPING_IDLE: Duration = Duration::from_millis(1500);

/// Remote participants' typing and presence.
#[derive(Debug, Clone)]
pub struct PresenceTracker<I> {
    local_user: Option<UserId>,
    typing_timeout: Duration,
    /// Typing participants and when their indicator expires
    typing: BTreeMap<UserId, I>,
    presence: BTreeMap<UserId, PresenceStatus>,
}

impl<I: Moment> PresenceTracker<I> {
    /// Create a tracker. `local_user` may be learned later through
    /// [`PresenceTracker::set_local_user`].
    pub fn new(local_user: Option<UserId>, typing_timeout: Duration) -> Self {
        Self { local_user, typing_timeout, typing: BTreeMap::new(), presence: BTreeMap::new() }
    }

    /// Set the local user id used for self-suppression.
    pub fn set_local_user(&mut self, user: UserId) {
        self.local_user = Some(user);
        self.typing.remove(&user);
        self.presence.remove(&user);
    }

    fn is_self(&self, user: UserId) -> bool {
        self.local_user == Some(user)
    }

    /// Apply a typing event. Returns whether the visible state changed.
    pub fn on_typing(&mut self, user: UserId, is_typing: bool, now: I) -> bool {
        if self.is_self(user) {
            return false;
        }

        if is_typing {
            self.typing.insert(user, now + self.typing_timeout).is_none()
        } else {
            self.typing.remove(&user).is_some()
        }
    }

    /// Apply a presence event. Last write wins. Returns whether the visible
    /// state changed.
    pub fn on_presence(&mut self, user: UserId, status: PresenceStatus) -> bool {
        if self.is_self(user) {
            return false;
        }
        self.presence.insert(user, status) != Some(status)
    }

    /// Expire typing indicators whose deadline has passed. Returns whether
    /// any expired.
    pub fn tick(&mut self, now: I) -> bool {
        let before = self.typing.len();
        self.typing.retain(|_, expires| *expires > now);
        self.typing.len() != before
    }

    /// Earliest typing expiry.
    pub fn next_deadline(&self) -> Option<I> {
        self.typing.values().min().copied()
    }

    /// Participants currently typing, ascending by id.
    pub fn typing_users(&self) -> Vec<UserId> {
        self.typing.keys().copied().collect()
    }

    /// Whether `user` is currently shown as typing.
    pub fn is_typing(&self, user: UserId) -> bool {
        self.typing.contains_key(&user)
    }

    /// Last known presence of `user`.
    pub fn presence(&self, user: UserId) -> Option<PresenceStatus> {
        self.presence.get(&user).copied()
    }

    /// Every known presence, ascending by id.
    pub fn presences(&self) -> Vec<(UserId, PresenceStatus)> {
        self.presence.iter().map(|(u, s)| (*u, *s)).collect()
    }

    /// Forget all typing and presence state.
    pub fn clear(&mut self) {
        self.typing.clear();
        self.presence.clear();
    }
}

/// Debouncer for the local user's own typing indicator.
///
/// Announces `true` once per composing burst and `false` either when the
/// input is cleared or after a quiet period without changes.
#[derive(Debug, Clone)]
pub struct OutboundTyping<I> {
    idle: Duration,
    announced: bool,
    quiet_at: Option<I>,
}

impl<I: Moment> OutboundTyping<I> {
    /// Create a debouncer with the given quiet period.
    pub fn new(idle: Duration) -> Self {
        Self { idle, announced: false, quiet_at: None }
    }

    /// Compose box changed. Returns the typing flag to send, if any.
    ///
    /// `true` is only announced while `connected`; an unconnected burst stays
    /// silent until the next change after the link comes up.
    pub fn on_input(&mut self, text: &str, connected: bool, now: I) -> Option<bool> {
        if text.trim().is_empty() {
            return self.reset();
        }

        self.quiet_at = Some(now + self.idle);
        if !self.announced && connected {
            self.announced = true;
            return Some(true);
        }
        None
    }

    /// Fire the quiet deadline if it has passed.
    pub fn tick(&mut self, now: I) -> Option<bool> {
        match self.quiet_at {
            Some(at) if at <= now => self.reset(),
            _ => None,
        }
    }

    /// End the burst. Returns `Some(false)` if `true` had been announced.
    pub fn reset(&mut self) -> Option<bool> {
        self.quiet_at = None;
        if self.announced {
            self.announced = false;
            Some(false)
        } else {
            None
        }
    }

    /// Pending quiet deadline.
    pub fn next_deadline(&self) -> Option<I> {
        self.quiet_at
    }

    /// Whether `true` has been announced and not yet retracted.
    pub fn is_announced(&self) -> bool {
        self.announced
    }
}
