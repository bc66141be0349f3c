//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the runtime from specific I/O
//! implementations. The CLI implements it with tokio, WebSockets and HTTP;
//! the simulation harness implements it with a virtual clock and scripted
//! inputs. The generic [`crate::Runtime`] handles all orchestration.

use std::future::Future;

use fieldsync_client::{SyncEvent, ViewSnapshot};
use fieldsync_core::Moment;

/// Abstracts I/O operations for the runtime.
///
/// Requests that complete later (socket open, REST calls) only start here.
/// Their outcome comes back through [`Driver::next_event`] as the matching
/// [`SyncEvent`].
///
/// # Associated Types
///
/// - [`Error`](Driver::Error): Platform-specific error type
/// - [`Instant`](Driver::Instant): Time representation (real or virtual)
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in simulation.
    type Instant: Moment;

    /// Wait for the next input event.
    ///
    /// Returns `None` once `deadline` has passed without input. With no
    /// deadline, waits for input indefinitely.
    fn next_event(
        &mut self,
        deadline: Option<Self::Instant>,
    ) -> impl Future<Output = Result<Option<SyncEvent<Self::Instant>>, Self::Error>> + Send;

    /// Start opening a socket to `url`.
    fn open(&mut self, url: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Send a text frame on the open socket.
    ///
    /// # Errors
    ///
    /// Returns an error only if the driver itself is broken. A socket that
    /// closed underneath is reported as `LinkClosed` instead.
    fn send(&mut self, frame: String) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Close the socket, if any. Does not report `LinkClosed`.
    fn close(&mut self);

    /// Start a bulk fetch of every pickup bucket.
    fn fetch_pickups(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Start a bulk fetch of a chat room's messages.
    fn fetch_messages(&mut self, room: &str)
    -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Start posting a message over REST.
    fn post_message(
        &mut self,
        room: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Current time instant.
    fn now(&self) -> Self::Instant;

    /// Present view state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, snapshot: &ViewSnapshot) -> Result<(), Self::Error>;

    /// Stop every in-flight request and clean up resources.
    fn stop(&mut self);
}
