//! Environment abstraction for deterministic testing.
//!
//! Decouples sync logic from system resources (time, randomness). Enables
//! deterministic simulation (virtual clock, seeded RNG) and production use
//! with real system resources.

use std::{
    ops::{Add, Sub},
    time::Duration,
};

/// Point in time usable by the state machines.
///
/// Implemented for `std::time::Instant` and for any virtual clock with the
/// same arithmetic. `Duration` itself qualifies, which keeps unit tests free
/// of real clocks.
pub trait Moment:
    Copy + Ord + Send + Sync + Sub<Output = Duration> + Add<Duration, Output = Self>
{
}

impl<T> Moment for T where
    T: Copy + Ord + Send + Sync + Sub<Output = Duration> + Add<Duration, Output = T>
{
}

/// Abstract environment providing time, randomness, and async primitives.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - Methods are infallible except in exceptional circumstances (e.g., OS
///   entropy exhaustion, incorrect simulation setup)
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, while simulation
    /// environments use virtual time.
    type Instant: Moment;

    /// Current time (monotonic).
    ///
    /// # Invariants
    ///
    /// - Subsequent calls return times >= previous calls.
    fn now(&self) -> Self::Instant;

    /// Seconds since the Unix epoch.
    ///
    /// Only used for the user-facing "last synchronized" stamp. Ordering and
    /// deadlines always use [`Environment::now`].
    fn wall_clock_secs(&self) -> u64;

    /// Sleeps for the specified duration.
    ///
    /// This is the ONLY async method in the trait, and it should only be used
    /// by driver code (not sync logic).
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Random 128-bit identifier rendered as 32 lowercase hex digits.
    ///
    /// Used for client-side message ids.
    fn random_id(&self) -> String {
        let mut bytes = [0u8; 16];
        self.random_bytes(&mut bytes);
        format!("{:032x}", u128::from_be_bytes(bytes))
    }
}

/// Manually driven environment for unit tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
        time::Duration,
    };

    use super::Environment;

    /// Wall-clock seconds reported at virtual time zero.
    pub const MOCK_EPOCH_SECS: u64 = 1_700_000_000;

    /// Environment whose clock only moves through [`MockEnv::advance`].
    ///
    /// Uses `Duration` since start as its instant type. Random bytes come
    /// from a counter, so ids are unique and predictable.
    #[derive(Clone, Default)]
    pub struct MockEnv {
        nanos: Arc<AtomicU64>,
        counter: Arc<AtomicU64>,
    }

    impl MockEnv {
        /// Clock at zero.
        pub fn new() -> Self {
            Self::default()
        }

        /// Move the clock forward.
        pub fn advance(&self, by: Duration) {
            self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
        }
    }

    impl Environment for MockEnv {
        type Instant = Duration;

        fn now(&self) -> Duration {
            Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
        }

        fn wall_clock_secs(&self) -> u64 {
            MOCK_EPOCH_SECS + self.now().as_secs()
        }

        fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            self.advance(duration);
            async {}
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            let n = self.counter.fetch_add(1, Ordering::SeqCst).to_be_bytes();
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = n[i % n.len()];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct CountingEnv;

    impl Environment for CountingEnv {
        type Instant = Duration;

        fn now(&self) -> Duration {
            Duration::ZERO
        }

        fn wall_clock_secs(&self) -> u64 {
            0
        }

        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            async {}
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = i as u8;
            }
        }
    }

    #[test]
    fn random_id_is_32_hex_digits() {
        let id = CountingEnv.random_id();
        assert_eq!(id.len(), 32);
        assert_eq!(id, "000102030405060708090a0b0c0d0e0f");
    }

    #[test]
    fn mock_env_advances_only_on_demand() {
        let env = test_utils::MockEnv::new();
        assert_eq!(env.now(), Duration::ZERO);
        env.advance(Duration::from_secs(2));
        assert_eq!(env.now(), Duration::from_secs(2));
        assert_eq!(env.wall_clock_secs(), test_utils::MOCK_EPOCH_SECS + 2);
        assert_ne!(env.random_id(), env.random_id());
    }

    #[test]
    fn random_u64_is_big_endian() {
        assert_eq!(CountingEnv.random_u64(), 0x0001_0203_0405_0607);
    }
}
