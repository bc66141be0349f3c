//! Application layer for fieldsync
//!
//! Generic runtime that drives one live view, enabling deterministic
//! simulation testing with the same code that runs in production.
//!
//! # Components
//!
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod driver;
mod runtime;

pub use driver::Driver;
pub use runtime::Runtime;
