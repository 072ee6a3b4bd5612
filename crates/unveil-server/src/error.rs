//! Runtime error types.

use std::fmt;

use crate::server_error::ServerError as DriverError;

/// Errors that can occur in the server runtime.
#[derive(Debug)]
pub enum RuntimeError {
    /// Configuration error (invalid bind address, zero tick interval).
    ///
    /// Fatal at startup. Fix configuration and restart.
    Config(String),

    /// Transport/network error (bind failure, I/O error).
    ///
    /// Fatal when binding; per-connection otherwise.
    Transport(String),

    /// Protocol error (bad header, oversized frame).
    ///
    /// Fatal for the offending connection only.
    Protocol(String),

    /// Driver error (from `ServerDriver` processing).
    Driver(DriverError),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Self::Driver(err) => write!(f, "driver error: {err}"),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Driver(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DriverError> for RuntimeError {
    fn from(err: DriverError) -> Self {
        Self::Driver(err)
    }
}

impl From<std::io::Error> for RuntimeError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<unveil_proto::ProtocolError> for RuntimeError {
    fn from(err: unveil_proto::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_driver_errors_with_source() {
        use std::error::Error;

        let err = RuntimeError::from(DriverError::ConnectionNotFound(7));

        assert_eq!(err.to_string(), "driver error: connection not found: 7");
        assert!(err.source().is_some());
    }
}
