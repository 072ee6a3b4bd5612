//! Driver error types.
//!
//! Room-level refusals ([`SessionError`]) never surface here; the driver
//! turns them into notices or debug logs. What remains are faults in how the
//! runtime drives the state machine.

use thiserror::Error;
use unveil_core::SessionError;
use unveil_proto::ConnectionId;

/// Errors returned by [`ServerDriver::process_event`](crate::ServerDriver::process_event).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// Event names a connection the driver never accepted or already closed.
    ///
    /// Usually a late event for a connection that was just torn down.
    #[error("connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    /// Runtime reused a connection id that is still live.
    ///
    /// Connection ids must be unique; this is a runtime bug.
    #[error("connection already exists: {0}")]
    ConnectionAlreadyExists(ConnectionId),

    /// Room operation failed in a way the driver could not absorb
    #[error("room error: {0}")]
    Session(#[from] SessionError),
}
