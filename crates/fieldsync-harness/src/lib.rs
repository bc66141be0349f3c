//! Deterministic simulation harness for fieldsync views.
//!
//! Virtual-clock implementations of the Environment and Driver traits, so the
//! production [`fieldsync_app::Runtime`] can be driven through reconnects,
//! polling and live updates without sockets or real time.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the common
//! view invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod sim_backend;
pub mod sim_driver;
pub mod sim_env;

pub use invariants::{
    BucketExclusivity, BucketMatchesStatus, Invariant, InvariantRegistry, InvariantResult,
    NoSendWhileDisconnected, ReadBatchBounded, RecordedCall, SystemSnapshot, UniqueMessageIds,
    Violation,
};
pub use sim_backend::SimBackend;
pub use sim_driver::{SimDriver, SimDriverError};
pub use sim_env::{SIM_EPOCH_SECS, SimEnv};
