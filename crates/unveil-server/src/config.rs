//! Server configuration.

use std::time::Duration;

use unveil_core::{DEFAULT_TIME_LIMIT, OwnerClaimPolicy, SessionDefaults};

/// Configuration for the [`ServerDriver`](crate::ServerDriver).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Maximum concurrent connections
    pub max_connections: usize,
    /// Countdown length for new rooms, and the fallback for malformed limits
    pub default_time_limit: u32,
    /// How owner claims on existing rooms are checked
    pub owner_claim: OwnerClaimPolicy,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
            default_time_limit: DEFAULT_TIME_LIMIT,
            owner_claim: OwnerClaimPolicy::Open,
        }
    }
}

impl DriverConfig {
    /// Defaults applied to rooms created under this config.
    pub fn session_defaults(&self) -> SessionDefaults {
        SessionDefaults { time_limit: self.default_time_limit }
    }
}

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:3000")
    pub bind_address: String,
    /// Interval between clock samples; a reveal lands at most this long after
    /// its deadline
    pub tick_interval: Duration,
    /// Driver configuration (limits, room defaults)
    pub driver: DriverConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            tick_interval: Duration::from_millis(100),
            driver: DriverConfig::default(),
        }
    }
}
