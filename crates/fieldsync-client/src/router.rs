//! Routing of decoded frames to per-kind handlers.
//!
//! A view implements [`EventSink`] for the kinds it cares about; the rest
//! fall through to the default no-op handlers.

use fieldsync_proto::{
    ChatMessage, EventKind, IncomingEvent, MessageId, Pickup, PickupId, PresenceStatus, UserId,
    decode,
};
use tracing::debug;

/// Per-kind handlers for inbound events.
///
/// Every handler defaults to doing nothing.
pub trait EventSink {
    /// A chat message arrived.
    fn on_message(&mut self, _message: ChatMessage) {}

    /// Messages were acknowledged.
    fn on_read(&mut self, _message_ids: Vec<MessageId>, _user_id: Option<UserId>) {}

    /// A participant started or stopped typing.
    fn on_typing(&mut self, _user_id: UserId, _is_typing: bool) {}

    /// A participant's presence changed.
    fn on_presence(&mut self, _user_id: UserId, _status: PresenceStatus) {}

    /// A pickup was created.
    fn on_pickup_created(&mut self, _pickup: Pickup) {}

    /// A pickup changed.
    fn on_pickup_updated(&mut self, _pickup: Pickup) {}

    /// A pickup was removed.
    fn on_pickup_deleted(&mut self, _pickup_id: PickupId) {}
}

/// Deliver `event` to exactly one handler of `sink`.
pub fn dispatch<S: EventSink + ?Sized>(sink: &mut S, event: IncomingEvent) {
    match event {
        IncomingEvent::Message { message } => sink.on_message(message),
        IncomingEvent::Read { message_ids, user_id } => sink.on_read(message_ids, user_id),
        IncomingEvent::Typing { user_id, is_typing } => sink.on_typing(user_id, is_typing),
        IncomingEvent::Presence { user_id, status } => sink.on_presence(user_id, status),
        IncomingEvent::PickupCreated { pickup } => sink.on_pickup_created(pickup),
        IncomingEvent::PickupUpdated { pickup } => sink.on_pickup_updated(pickup),
        IncomingEvent::PickupDeleted { pickup_id } => sink.on_pickup_deleted(pickup_id),
        IncomingEvent::Unknown => {},
    }
}

/// Decode `raw` and dispatch it. Malformed frames are logged and dropped.
///
/// Returns the kind of the routed event, or `None` if the frame was dropped.
pub fn route_frame<S: EventSink + ?Sized>(sink: &mut S, raw: &str) -> Option<EventKind> {
    match decode(raw) {
        Ok(event) => {
            let kind = event.kind();
            dispatch(sink, event);
            Some(kind)
        },
        Err(error) => {
            debug!(%error, len = raw.len(), "dropping malformed frame");
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
    }

    impl EventSink for Recorder {
        fn on_message(&mut self, _message: ChatMessage) {
            self.calls.push("message");
        }

        fn on_pickup_deleted(&mut self, _pickup_id: PickupId) {
            self.calls.push("pickup_deleted");
        }
    }

    #[test]
    fn routes_to_matching_handler() {
        let mut sink = Recorder::default();
        let kind = route_frame(&mut sink, r#"{"event":"pickup_deleted","pickup_id":4}"#);

        assert_eq!(kind, Some(EventKind::PickupDeleted));
        assert_eq!(sink.calls, vec!["pickup_deleted"]);
    }

    #[test]
    fn irrelevant_kinds_fall_to_defaults() {
        let mut sink = Recorder::default();
        let kind = route_frame(&mut sink, r#"{"event":"typing","user_id":2,"is_typing":true}"#);

        assert_eq!(kind, Some(EventKind::Typing));
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn malformed_frames_are_dropped() {
        let mut sink = Recorder::default();
        assert_eq!(route_frame(&mut sink, "not json"), None);
        assert_eq!(route_frame(&mut sink, r#"{"event":"message"}"#), None);
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn unknown_events_reach_no_handler() {
        let mut sink = Recorder::default();
        assert_eq!(route_frame(&mut sink, r#"{"event":"ping"}"#), Some(EventKind::Unknown));
        assert!(sink.calls.is_empty());
    }
}
