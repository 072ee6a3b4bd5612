//! Deterministic simulation harness for Unveil.
//!
//! Turmoil-based pieces that let the real server runtime run over simulated
//! TCP with virtual time: a seeded [`SimEnv`], a [`SimListener`] adapter, and
//! a [`SimClient`] that speaks the wire protocol.
//!
//! Round deadlines and clock samples follow turmoil's clock, so a ten second
//! round costs microseconds of wall time and replays identically for a given
//! seed.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod sim_client;
pub mod sim_env;
pub mod sim_server;

pub use sim_client::SimClient;
pub use sim_env::SimEnv;
pub use sim_server::{SimListener, run_sim_server};
