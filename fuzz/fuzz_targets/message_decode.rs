//! Fuzz target for CBOR message decoding
//!
//! # Strategy
//!
//! - Random bytes: completely arbitrary payloads
//! - Tagged: a valid `event` name paired with arbitrary `data` bytes
//!
//! # Invariants
//!
//! - NEVER panic on malformed CBOR
//! - Re-encoding a decoded request is stable

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use unveil_proto::{ClientMessage, Frame, ServerMessage, WireMessage};

const EVENTS: [&str; 6] =
    ["joinSession", "setTimerLimit", "startTimer", "makeChoice", "leaveSession", "kickPlayer"];

#[derive(Debug, Arbitrary)]
enum Payload {
    Random(Vec<u8>),
    Tagged { event: u8, data: Vec<u8> },
}

fuzz_target!(|payload: Payload| {
    let bytes = match payload {
        Payload::Random(bytes) => bytes,
        Payload::Tagged { event, data } => tagged(EVENTS[event as usize % EVENTS.len()], &data),
    };

    let Ok(frame) = Frame::new(bytes) else {
        return;
    };

    let _ = ServerMessage::from_frame(&frame);

    if let Ok(request) = ClientMessage::from_frame(&frame) {
        let reencoded = request.to_frame().expect("decoded request must encode");
        let again = ClientMessage::from_frame(&reencoded).expect("re-encoded request must decode");
        assert_eq!(again.to_frame().expect("request must encode"), reencoded);
    }
});

/// Hand-assembled `{"event": <name>, "data": <raw>}` map.
fn tagged(event: &str, data: &[u8]) -> Vec<u8> {
    let mut out = vec![0xA2];
    push_text(&mut out, "event");
    push_text(&mut out, event);
    push_text(&mut out, "data");
    out.extend_from_slice(data);
    out
}

fn push_text(out: &mut Vec<u8>, text: &str) {
    out.push(0x60 | text.len() as u8);
    out.extend_from_slice(text.as_bytes());
}
