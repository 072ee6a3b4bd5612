//! Frame header with zero-copy parsing.
//!
//! The header is a fixed 12-byte big-endian structure. Runtimes read exactly
//! [`FrameHeader::SIZE`] bytes, validate them here, then read the announced
//! number of payload bytes.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{ProtocolError, Result};

/// Fixed 12-byte frame header (big endian)
///
/// Layout: `magic (4) | version (1) | reserved (3) | payload_size (4)`.
///
/// Every field is a byte array, so any 12-byte pattern is a structurally
/// valid header and casting untrusted network bytes is sound. Semantic checks
/// (magic, version, size limit) happen in [`FrameHeader::from_bytes`].
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    magic: [u8; 4],
    version: u8,
    reserved: [u8; 3],
    pub(crate) payload_size: [u8; 4],
}

impl FrameHeader {
    /// Size of the serialized header
    pub const SIZE: usize = 12;

    /// Magic number: "UNVL" in ASCII
    pub const MAGIC: u32 = 0x554E_564C;

    /// Current protocol version
    pub const VERSION: u8 = 0x01;

    /// Maximum payload size (64 KiB). Rosters are small; anything larger is
    /// garbage or abuse.
    pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024;

    /// Header for an empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: Self::MAGIC.to_be_bytes(),
            version: Self::VERSION,
            reserved: [0; 3],
            payload_size: [0; 4],
        }
    }

    /// Parse a header from the front of `bytes` without copying.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTooShort` if fewer than 12 bytes are available
    /// - `ProtocolError::InvalidMagic` if the magic number is wrong
    /// - `ProtocolError::UnsupportedVersion` for unknown versions
    /// - `ProtocolError::PayloadTooLarge` if the announced size exceeds the
    ///   protocol maximum
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let (header, _) = Self::ref_from_prefix(bytes).map_err(|_| {
            ProtocolError::FrameTooShort { expected: Self::SIZE, actual: bytes.len() }
        })?;

        if u32::from_be_bytes(header.magic) != Self::MAGIC {
            return Err(ProtocolError::InvalidMagic);
        }

        if header.version != Self::VERSION {
            return Err(ProtocolError::UnsupportedVersion(header.version));
        }

        let payload_size = header.payload_size();
        if payload_size > Self::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_size as usize,
                max: Self::MAX_PAYLOAD_SIZE as usize,
            });
        }

        Ok(header)
    }

    /// Serialize header to bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(IntoBytes::as_bytes(self));
        arr
    }

    /// Protocol magic number.
    #[must_use]
    pub fn magic(&self) -> u32 {
        u32::from_be_bytes(self.magic)
    }

    /// Protocol version byte.
    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Length of the payload following this header.
    #[must_use]
    pub fn payload_size(&self) -> u32 {
        u32::from_be_bytes(self.payload_size)
    }
}

impl Default for FrameHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_header_parses_back() {
        let bytes = FrameHeader::new().to_bytes();
        let header = FrameHeader::from_bytes(&bytes).unwrap();

        assert_eq!(header.magic(), FrameHeader::MAGIC);
        assert_eq!(header.version(), FrameHeader::VERSION);
        assert_eq!(header.payload_size(), 0);
    }

    #[test]
    fn rejects_short_buffer() {
        let result = FrameHeader::from_bytes(&[0x55, 0x4E]);
        assert_eq!(result, Err(ProtocolError::FrameTooShort { expected: 12, actual: 2 }));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = FrameHeader::new().to_bytes();
        bytes[0] = b'X';
        assert_eq!(FrameHeader::from_bytes(&bytes), Err(ProtocolError::InvalidMagic));
    }

    #[test]
    fn rejects_unknown_version() {
        let mut bytes = FrameHeader::new().to_bytes();
        bytes[4] = 9;
        assert_eq!(FrameHeader::from_bytes(&bytes), Err(ProtocolError::UnsupportedVersion(9)));
    }

    #[test]
    fn rejects_oversized_payload_claim() {
        let mut bytes = FrameHeader::new().to_bytes();
        bytes[8..12].copy_from_slice(&(FrameHeader::MAX_PAYLOAD_SIZE + 1).to_be_bytes());
        assert!(matches!(
            FrameHeader::from_bytes(&bytes),
            Err(ProtocolError::PayloadTooLarge { .. })
        ));
    }
}
