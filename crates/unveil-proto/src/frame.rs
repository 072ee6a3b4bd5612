//! Frame type combining header and payload.
//!
//! Layout on the wire: `[FrameHeader: 12 bytes] + [payload: variable]`.
//! A frame is a pure data holder; see [`crate::WireMessage`] for turning
//! messages into frames and back.

use bytes::{BufMut, Bytes};

use crate::{
    FrameHeader,
    errors::{ProtocolError, Result},
};

/// Complete protocol frame.
///
/// # Invariants
///
/// - `payload.len()` equals `header.payload_size()`. Enforced by
///   [`Frame::new`] and verified by [`Frame::decode`].
/// - `payload.len()` never exceeds [`FrameHeader::MAX_PAYLOAD_SIZE`] on the
///   wire; oversized frames are rejected by [`Frame::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header
    pub header: FrameHeader,

    /// Raw payload bytes (CBOR-encoded message)
    pub payload: Bytes,
}

impl Frame {
    /// Build a frame around `payload`, recording its length in the header.
    ///
    /// # Errors
    ///
    /// `ProtocolError::PayloadTooLarge` if the payload exceeds the protocol
    /// maximum.
    pub fn new(payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();

        let size = u32::try_from(payload.len())
            .ok()
            .filter(|len| *len <= FrameHeader::MAX_PAYLOAD_SIZE)
            .ok_or(ProtocolError::PayloadTooLarge {
                size: payload.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            })?;

        let mut header = FrameHeader::new();
        header.payload_size = size.to_be_bytes();

        debug_assert_eq!(header.payload_size() as usize, payload.len());

        Ok(Self { header, payload })
    }

    /// Total encoded length (header plus payload).
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        FrameHeader::SIZE + self.payload.len()
    }

    /// Encode frame into `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        debug_assert_eq!(self.payload.len(), self.header.payload_size() as usize);

        dst.put_slice(&self.header.to_bytes());
        dst.put_slice(&self.payload);
    }

    /// Encode frame into a fresh buffer.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf
    }

    /// Decode a frame from wire bytes. Trailing bytes are ignored.
    ///
    /// # Errors
    ///
    /// - Any header validation error from [`FrameHeader::from_bytes`]
    /// - `ProtocolError::FrameTruncated` if fewer payload bytes are present
    ///   than the header announces
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::from_bytes(bytes)?;

        let payload_size = header.payload_size() as usize;
        let total_size = FrameHeader::SIZE + payload_size;

        let payload = bytes.get(FrameHeader::SIZE..total_size).ok_or(
            ProtocolError::FrameTruncated {
                expected: payload_size,
                actual: bytes.len().saturating_sub(FrameHeader::SIZE),
            },
        )?;

        Ok(Self { header: *header, payload: Bytes::copy_from_slice(payload) })
    }
}
