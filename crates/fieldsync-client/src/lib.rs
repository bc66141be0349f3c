//! Client
//!
//! Action-based view state machines for fieldsync. Each live view (the pickup
//! feed, one chat room) is one actor: it receives events ([`SyncEvent`]),
//! processes them through the pure state machines of [`fieldsync_core`], and
//! returns actions ([`SyncAction`]) for the caller to execute.
//!
//! # Components
//!
//! - [`PickupFeed`]: pickup buckets fed by the pickup channel and polling
//! - [`ChatRoom`]: one chat room with typing, presence and read receipts
//! - [`EventSink`]: per-kind handlers the decoded frames are routed to
//! - [`SyncView`]: the interface the runtime drives both views through
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::connect`]: open a WebSocket channel
//! - [`rest::RestClient`]: bulk fetch and message posting over HTTP

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod chat;
mod config;
mod event;
mod pickups;
pub mod router;
mod view;

#[cfg(feature = "transport")]
pub mod rest;
#[cfg(feature = "transport")]
pub mod transport;

pub use chat::ChatRoom;
pub use config::{ChatConfig, DEFAULT_SCROLL_THRESHOLD_PX, PickupConfig, SyncConfig};
pub use event::{SyncAction, SyncEvent};
pub use fieldsync_core::{ConnectionState, Environment, SyncError};
pub use pickups::PickupFeed;
pub use router::EventSink;
pub use view::{ChatSnapshot, PickupSnapshot, SyncView, ViewSnapshot};
