//! Chat message list.
//!
//! Chronological list keyed by [`MessageId`]. Live messages are appended;
//! polled snapshots are merged by id.
//!
//! # Invariants
//!
//! - Ids are unique within the list.
//! - `is_read` never goes from `true` back to `false`.
//! - Once the local user is known, `sender_is_local` is correct for every
//!   message.

use std::collections::HashSet;

use fieldsync_proto::{ChatMessage, MessageId, UserId};

/// Messages of one chat room, oldest first.
#[derive(Debug, Clone, Default)]
pub struct MessageList {
    messages: Vec<ChatMessage>,
    local_user: Option<UserId>,
}

impl MessageList {
    /// Empty list. `local_user` may be `None` until inferred.
    pub fn new(local_user: Option<UserId>) -> Self {
        Self { messages: Vec::new(), local_user }
    }

    /// Messages, oldest first.
    pub fn as_slice(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the room has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Local user id, if known.
    pub fn local_user(&self) -> Option<UserId> {
        self.local_user
    }

    /// Record the local user and re-derive `sender_is_local`.
    pub fn set_local_user(&mut self, user: UserId) {
        self.local_user = Some(user);
        for msg in &mut self.messages {
            msg.sender_is_local = msg.sender_id == user;
        }
    }

    /// Local user as flagged by the server in `messages`: the sender of the
    /// first message marked as authored by the worker.
    pub fn infer_local_user(messages: &[ChatMessage]) -> Option<UserId> {
        messages.iter().find(|m| m.sender_hint_local == Some(true)).map(|m| m.sender_id)
    }

    fn stamp(&self, mut msg: ChatMessage) -> ChatMessage {
        msg.sender_is_local = self.local_user == Some(msg.sender_id);
        msg
    }

    /// Append a live message. A message whose id is already present replaces
    /// it in place instead. Returns whether the list changed.
    pub fn push(&mut self, msg: ChatMessage) -> bool {
        let mut msg = self.stamp(msg);
        match self.messages.iter_mut().find(|m| m.id == msg.id) {
            Some(existing) => {
                msg.is_read |= existing.is_read;
                let changed = *existing != msg;
                *existing = msg;
                changed
            },
            None => {
                self.messages.push(msg);
                true
            },
        }
    }

    /// Merge a polled snapshot by id.
    ///
    /// Known messages are refreshed in place (keeping a local `is_read`),
    /// unknown ones are appended in snapshot order. Messages absent from the
    /// snapshot are kept. Returns the number of new messages.
    pub fn merge(&mut self, snapshot: Vec<ChatMessage>) -> usize {
        let mut added = 0;
        for msg in snapshot {
            let known = self.messages.iter().any(|m| m.id == msg.id);
            self.push(msg);
            if !known {
                added += 1;
            }
        }
        added
    }

    /// Mark messages read. Returns the number that changed.
    pub fn mark_read(&mut self, ids: &[MessageId]) -> usize {
        let ids: HashSet<&MessageId> = ids.iter().collect();
        let mut changed = 0;
        for msg in &mut self.messages {
            if !msg.is_read && ids.contains(&msg.id) {
                msg.is_read = true;
                changed += 1;
            }
        }
        changed
    }

    /// Drop every message.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
