//! Production environment.
//!
//! The driver measures round deadlines from [`SystemEnv::now`], which reads
//! the same monotonic clock that paces the runtime's tick interval. Entropy
//! comes from the OS (getrandom) and backs two values:
//!
//! - connection ids, drawn on accept and re-rolled while one collides with a
//!   live connection
//! - owner tokens, minted once per room and later presented to reclaim it

use unveil_core::Environment;

/// Monotonic system clock and OS randomness.
///
/// # Panics
///
/// Panics if the OS RNG fails.
#[derive(Clone, Default)]
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

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG is available");
    }
}
