//! Fieldsync core state machines
//!
//! Every type in this crate is a pure state machine: no I/O, no clocks, no
//! timers. Methods take the current instant as a parameter, and anything that
//! must happen later is exposed as a deadline via `next_deadline()`. The
//! runtime sleeps until the earliest deadline and calls back with the new
//! instant.
//!
//! The instant type is generic ([`Moment`]) so the same logic runs against
//! `std::time::Instant` in production and a virtual clock in simulation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod classify;
pub mod coalesce;
pub mod env;
pub mod error;
pub mod freshness;
pub mod link;
pub mod messages;
pub mod polling;
pub mod presence;
pub mod receipts;

pub use classify::{Bucket, Buckets, bucket};
pub use coalesce::{BufferedEvents, CoalescingBuffer};
pub use env::{Environment, Moment};
pub use error::SyncError;
pub use freshness::Freshness;
pub use link::{ConnectionState, Link, LinkAction, LinkConfig};
pub use messages::MessageList;
pub use polling::PollCoordinator;
pub use presence::{OutboundTyping, PresenceTracker};
pub use receipts::ReadReceiptThrottler;
