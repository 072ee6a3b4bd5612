//! Unveil wire protocol.
//!
//! Every message travels as a [`Frame`]: a fixed 12-byte binary header
//! followed by a CBOR payload. The header is parsed zero-copy so a runtime can
//! size its reads before touching the payload; the payload decodes into the
//! request ([`ClientMessage`]) or event ([`ServerMessage`]) vocabulary.
//!
//! # Invariants
//!
//! - A frame's payload length always equals the size recorded in its header.
//! - Payloads never exceed [`FrameHeader::MAX_PAYLOAD_SIZE`].
//! - Message names on the wire are camelCase and adjacently tagged
//!   (`{"event": .., "data": ..}`), so clients written against the event
//!   vocabulary see the same names regardless of language.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
mod frame;
mod header;
pub mod message;

pub use errors::{ProtocolError, Result};
pub use frame::Frame;
pub use header::FrameHeader;
pub use message::{ClientMessage, LimitInput, PlayerView, ServerMessage, WireMessage};

/// Opaque identifier of a transport connection, assigned by the runtime.
pub type ConnectionId = u64;

/// Caller-supplied room key.
pub type RoomId = String;
