//! View events and actions.

use fieldsync_proto::{ChatMessage, Pickup};

use crate::ViewSnapshot;

/// Events the caller feeds into a view.
///
/// The caller is responsible for:
/// - Reporting socket lifecycle and received frames
/// - Reporting REST results
/// - Driving time forward via ticks
/// - Forwarding user intents (compose, send, scroll)
///
/// Generic over `I` (Instant type) to support both production
/// (`std::time::Instant`) and simulation (virtual clock) environments.
#[derive(Debug, Clone)]
pub enum SyncEvent<I = std::time::Instant> {
    /// View mounted. Connects the channel and requests the initial bulk
    /// fetch.
    Start,

    /// Time tick for deadline processing.
    ///
    /// The caller should deliver a tick whenever the view's
    /// `next_deadline()` passes.
    Tick {
        /// Current time from the environment.
        now: I,
    },

    /// The socket requested by `SyncAction::Open` is open.
    LinkOpened,

    /// The socket closed or could not be opened.
    LinkClosed,

    /// Text frame received on the channel.
    FrameReceived(String),

    /// Bulk pickup fetch completed.
    PickupsFetched(Vec<Pickup>),

    /// Bulk message fetch completed.
    MessagesFetched(Vec<ChatMessage>),

    /// A bulk fetch or post failed.
    RequestFailed {
        /// Human-readable cause, for logging.
        reason: String,
    },

    /// A message posted over REST was accepted.
    MessagePosted,

    /// The compose box changed.
    ComposeChanged {
        /// Current compose text.
        text: String,
    },

    /// The user submitted a message.
    SendMessage {
        /// Message text.
        body: String,
    },

    /// The message list scrolled.
    Scrolled {
        /// Distance between the viewport bottom and the list bottom.
        distance_from_bottom: u32,
    },

    /// View unmounting. Closes the channel and clears every deadline.
    Teardown,
}

/// Actions a view produces for the caller to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    /// Open a socket. Report the outcome with `LinkOpened` / `LinkClosed`.
    Open {
        /// Channel URL including the token.
        url: String,
    },

    /// Send a text frame on the open socket.
    Send(String),

    /// Close the socket.
    Close,

    /// Fetch every pickup bucket. Report with `PickupsFetched`.
    FetchPickups,

    /// Fetch a chat room's messages. Report with `MessagesFetched`.
    FetchMessages {
        /// Chat room id.
        room: String,
    },

    /// Post a message over REST. Report with `MessagePosted`.
    PostMessage {
        /// Chat room id.
        room: String,
        /// Message text.
        body: String,
    },

    /// Present new view state.
    Render(ViewSnapshot),
}
