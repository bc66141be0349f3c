//! Error types for the fieldsync core.
//!
//! Only view setup can fail. Once a view is running, transport, decode and
//! REST failures are absorbed by the reconnect and polling policies and never
//! surface as errors.

use thiserror::Error;

/// Errors raised while setting up a view's channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Server address could not be turned into a channel URL
    #[error("invalid server url {url:?}: {reason}")]
    InvalidUrl {
        /// The offending address
        url: String,
        /// What was wrong with it
        reason: String,
    },

    /// No channel identifier (e.g. chat room) was supplied
    #[error("missing channel identifier")]
    MissingChannel,

    /// No bearer token was supplied
    #[error("missing auth token")]
    MissingToken,
}

impl SyncError {
    /// Returns true if the view can still run in polling-only mode.
    ///
    /// A missing token or channel only disables the live channel. A malformed
    /// server address breaks REST polling as well.
    pub fn allows_polling(&self) -> bool {
        matches!(self, Self::MissingToken | Self::MissingChannel)
    }
}
