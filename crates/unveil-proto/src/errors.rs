//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while framing or (de)serializing messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer shorter than the fixed header
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Required length
        expected: usize,
        /// Available length
        actual: usize,
    },

    /// Payload shorter than the header claims
    #[error("frame truncated: expected {expected} payload bytes, got {actual}")]
    FrameTruncated {
        /// Payload size announced by the header
        expected: usize,
        /// Payload bytes available
        actual: usize,
    },

    /// Header does not start with the protocol magic
    #[error("invalid magic number")]
    InvalidMagic,

    /// Header carries a version this build does not speak
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Payload exceeds the protocol limit
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Offending size
        size: usize,
        /// Protocol maximum
        max: usize,
    },

    /// CBOR encoding failed
    #[error("CBOR encode error: {0}")]
    CborEncode(String),

    /// CBOR decoding failed or the payload is not a known message
    #[error("CBOR decode error: {0}")]
    CborDecode(String),
}
