//! Unveil server binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default port with a 10 second default countdown
//! unveil-server --bind 0.0.0.0:3000
//!
//! # Require owner tokens for ownership transfer
//! unveil-server --owner-claim token --default-limit 30
//! ```

use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use unveil_core::OwnerClaimPolicy;
use unveil_server::{DriverConfig, Server, ServerRuntimeConfig};

/// Owner-claim policy as accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OwnerClaim {
    /// Latest owner-claiming join takes over the room
    Open,
    /// Owner claims must present the room's owner token
    Token,
}

impl From<OwnerClaim> for OwnerClaimPolicy {
    fn from(claim: OwnerClaim) -> Self {
        match claim {
            OwnerClaim::Open => Self::Open,
            OwnerClaim::Token => Self::Token,
        }
    }
}

/// Unveil reveal-room server
#[derive(Parser, Debug)]
#[command(name = "unveil-server")]
#[command(about = "Simultaneous-choice reveal room server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    bind: String,

    /// Maximum concurrent connections
    #[arg(long, default_value = "10000")]
    max_connections: usize,

    /// Countdown length for new rooms, in seconds
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
    default_limit: u32,

    /// How owner claims on existing rooms are checked
    #[arg(long, value_enum, default_value = "open")]
    owner_claim: OwnerClaim,

    /// Clock sampling interval in milliseconds
    #[arg(long, default_value = "100", value_parser = clap::value_parser!(u64).range(1..))]
    tick_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Unveil server starting");
    tracing::info!("Binding to {}", args.bind);

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        tick_interval: Duration::from_millis(args.tick_ms),
        driver: DriverConfig {
            max_connections: args.max_connections,
            default_time_limit: args.default_limit,
            owner_claim: args.owner_claim.into(),
        },
    };

    let server = Server::bind(config).await?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
