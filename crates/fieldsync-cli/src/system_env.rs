//! Production environment backed by the system clock and the OS RNG.
//!
//! Behavior here is non-deterministic by nature. Everything that needs
//! reproducible time or randomness runs against `SimEnv` instead.

use std::time::Duration;

use fieldsync_core::Environment;

/// Real time, tokio sleeps, and OS randomness.
///
/// # Panics
///
/// `random_bytes` panics if the OS RNG fails. Client message ids cannot be
/// generated without it and the failure indicates a broken host.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    /// A clock set before 1970 reads as the epoch.
    #[allow(clippy::disallowed_methods)]
    fn wall_clock_secs(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs())
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }
}
