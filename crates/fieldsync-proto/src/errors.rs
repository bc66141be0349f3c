//! Protocol error types.
//!
//! Decoding never panics; every malformed input maps to a [`ProtocolError`].

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding or encoding frames.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Frame is not valid JSON or does not match any known shape.
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field was absent from an otherwise well-formed object.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Frame exceeds the accepted size.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Size of the received frame in bytes.
        size: usize,
        /// Maximum accepted size in bytes.
        max: usize,
    },
}
