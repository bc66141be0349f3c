//! Plain-text rendering of view snapshots.

use std::collections::HashSet;

use fieldsync_client::{ChatSnapshot, ConnectionState, PickupSnapshot, ViewSnapshot};
use fieldsync_proto::{ChatMessage, MessageId, Pickup, PresenceStatus, UserId};

/// Turns snapshots into terminal lines.
///
/// The pickup feed is redrawn in full on every change. Chat output only
/// appends messages that were not printed before, so the scrollback reads
/// like a transcript.
#[derive(Debug, Default)]
pub struct TextRenderer {
    printed: HashSet<MessageId>,
    last_status: Option<String>,
    last_typing: Vec<UserId>,
    last_presence: Vec<(UserId, PresenceStatus)>,
}

impl TextRenderer {
    /// Lines to print for `snapshot`. Empty when nothing visible changed.
    pub fn lines(&mut self, snapshot: &ViewSnapshot) -> Vec<String> {
        match snapshot {
            ViewSnapshot::Pickups(feed) => self.pickup_lines(feed),
            ViewSnapshot::Chat(room) => self.chat_lines(room),
        }
    }

    fn pickup_lines(&self, feed: &PickupSnapshot) -> Vec<String> {
        let mut status =
            format!("[{}] synced {}", connection_label(feed.connection), feed.freshness);
        if feed.stale {
            status.push_str(" (stale)");
        }

        let mut lines = vec![status];
        let buckets = [
            ("pending", &feed.pending),
            ("available", &feed.available),
            ("completed", &feed.completed),
        ];
        for (title, pickups) in buckets {
            lines.push(format!("{title} ({})", pickups.len()));
            lines.extend(pickups.iter().map(pickup_line));
        }
        lines
    }

    fn chat_lines(&mut self, room: &ChatSnapshot) -> Vec<String> {
        let mut lines = Vec::new();

        let status = format!(
            "[{}] room {}",
            connection_label(room.connection),
            room.room.as_deref().unwrap_or("-")
        );
        if self.last_status.as_ref() != Some(&status) {
            lines.push(status.clone());
            self.last_status = Some(status);
        }

        for entry in &room.presence {
            if !self.last_presence.contains(entry) {
                let (user, presence) = entry;
                let label = match presence {
                    PresenceStatus::Online => "online",
                    PresenceStatus::Offline => "offline",
                };
                lines.push(format!("  user {user} is {label}"));
            }
        }
        self.last_presence.clone_from(&room.presence);

        for message in &room.messages {
            if self.printed.insert(message.id.clone()) {
                lines.push(message_line(message));
            }
        }

        if room.typing != self.last_typing {
            if !room.typing.is_empty() {
                let who: Vec<String> = room.typing.iter().map(|u| format!("user {u}")).collect();
                lines.push(format!("  {} typing...", who.join(", ")));
            }
            self.last_typing.clone_from(&room.typing);
        }
        lines
    }
}

fn connection_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Connected => "live",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Disconnected => "offline",
    }
}

fn pickup_line(pickup: &Pickup) -> String {
    let mut line = format!("  #{} {}", pickup.id, pickup.status);
    if let Some(address) = pickup.location.as_ref().and_then(|l| l.address.as_deref()) {
        line.push_str(&format!(" @ {address}"));
    }
    if let Some(waste) = &pickup.waste_type {
        line.push_str(&format!(" [{waste}]"));
    }
    line
}

fn message_line(message: &ChatMessage) -> String {
    let sender = if message.sender_is_local {
        "me".to_string()
    } else {
        message.sender_name.clone().unwrap_or_else(|| format!("user {}", message.sender_id))
    };
    match &message.image_url {
        Some(url) if message.body.is_empty() => format!("{sender}: <image {url}>"),
        _ => format!("{sender}: {}", message.body),
    }
}
