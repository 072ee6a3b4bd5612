//! Unveil core state machines.
//!
//! Pure logic with no I/O: callers feed requests and clock readings in, and
//! read results back out. The server driver decides what to broadcast.
//!
//! # Components
//!
//! - [`Roster`]: insertion-ordered players of one room, deduplicated by name
//! - [`Session`]: one room's roster, ownership, time limit and timer state
//! - [`TimerWheel`]: outstanding countdowns, each with an absolute deadline
//! - [`SessionRegistry`]: room id → session, lazy creation, eviction when empty
//! - [`Environment`]: time and randomness, swapped for virtual time in tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
pub mod error;
pub mod registry;
pub mod roster;
pub mod session;
pub mod timer;

pub use env::Environment;
pub use error::SessionError;
pub use registry::{JoinReceipt, JoinRequest, Reveal, SessionDefaults, SessionRegistry};
pub use roster::{JoinOutcome, Player, Roster, natural_cmp};
pub use session::{DEFAULT_TIME_LIMIT, OwnerClaimPolicy, Session, parse_time_limit};
pub use timer::{Countdown, Expiry, TimerState, TimerWheel};
