//! Fuzz target for Frame::decode
//!
//! Arbitrary byte sequences must never panic the frame parser: bad magic,
//! unknown versions, oversized or truncated payloads all return an error.
//! Frames that do decode must re-encode to the bytes they came from.

#![no_main]

use libfuzzer_sys::fuzz_target;
use unveil_proto::{Frame, FrameHeader};

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = Frame::decode(data) else {
        return;
    };

    assert!(frame.payload.len() <= FrameHeader::MAX_PAYLOAD_SIZE as usize);
    assert_eq!(frame.to_vec(), data[..frame.encoded_len()]);
});
