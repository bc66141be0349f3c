//! Fieldsync wire protocol
//!
//! Typed representation of the JSON frames exchanged over the live channels
//! (chat rooms and the pickup feed) and of the bulk snapshots returned by the
//! REST collaborator.
//!
//! # Frames
//!
//! Inbound frames carry an `event` discriminator and decode into the closed
//! [`IncomingEvent`] union. Unrecognised discriminators decode to
//! [`IncomingEvent::Unknown`] so servers can add event kinds without breaking
//! older clients. Outbound frames carry an `action` discriminator
//! ([`OutgoingFrame`]).
//!
//! # Entities
//!
//! [`Pickup`] and [`ChatMessage`] accept both the live payload shape and the
//! REST payload shape, so both paths converge on one state shape.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod entities;
pub mod errors;
mod frame;
pub mod rest;

pub use entities::{
    ChatMessage, Location, MessageId, Pickup, PickupId, PickupStatus, PresenceStatus, UserId,
};
pub use errors::{ProtocolError, Result};
pub use frame::{EventKind, IncomingEvent, MAX_FRAME_SIZE, OutgoingFrame, decode, encode};
