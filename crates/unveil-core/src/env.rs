//! Environment abstraction for deterministic testing.
//!
//! Decouples room logic and its runtimes from system resources (time,
//! randomness). Production uses the system clock and OS entropy; simulations
//! use a virtual clock and a seeded RNG.

use std::time::Duration;

/// Abstract environment providing time and randomness.
///
/// Implementations MUST guarantee that `now()` never goes backwards.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, simulations use
    /// virtual time (e.g. `tokio::time::Instant` under turmoil).
    type Instant: Copy + Ord + Send + Sync + std::fmt::Debug + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    ///
    /// Round deadlines are measured on this clock, so it must be the clock
    /// that paces the runtime's ticks.
    fn now(&self) -> Self::Instant;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`, used for connection ids and owner tokens.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
