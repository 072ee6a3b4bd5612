//! Fuzz target for the server driver
//!
//! # Strategy
//!
//! - Structured requests: well-formed messages from a few connections
//! - Garbage frames: arbitrary payload bytes
//! - Ticks and reconnects interleaved at random
//!
//! # Invariants
//!
//! - Known connections never produce a driver error
//! - No live room has an empty roster
//! - Every roster member's connection receives the room's broadcasts
//! - Broadcasts during a round never carry a choice

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use unveil_proto::{ClientMessage, Frame, LimitInput, ServerMessage, WireMessage};
use unveil_server::{DriverConfig, ServerAction, ServerDriver, ServerEvent, SystemEnv};

const CONNECTIONS: u64 = 4;
const ROOMS: [&str; 2] = ["R1", "R2"];

#[derive(Debug, Arbitrary)]
enum Step {
    Join { conn: u8, room: bool, name: u8, owner: bool },
    Limit { conn: u8, room: bool, limit: i16 },
    Start { conn: u8, room: bool },
    Choice { conn: u8, room: bool, choice: u8 },
    Leave { conn: u8, room: bool },
    Kick { conn: u8, room: bool, target: u8 },
    Garbage { conn: u8, bytes: Vec<u8> },
    Tick,
    Reconnect { conn: u8 },
}

fn conn(raw: u8) -> u64 {
    u64::from(raw) % CONNECTIONS + 1
}

fn room(raw: bool) -> String {
    ROOMS[usize::from(raw)].to_string()
}

fn frame(conn_raw: u8, message: &ClientMessage) -> ServerEvent {
    ServerEvent::FrameReceived {
        connection_id: conn(conn_raw),
        frame: message.to_frame().expect("request must encode"),
    }
}

fuzz_target!(|steps: Vec<Step>| {
    let mut driver = ServerDriver::new(SystemEnv::new(), DriverConfig::default());
    for connection_id in 1..=CONNECTIONS {
        driver.process_event(ServerEvent::ConnectionAccepted { connection_id }).unwrap();
    }

    for step in steps.into_iter().take(256) {
        let events = match step {
            Step::Join { conn: c, room: r, name, owner } => vec![frame(
                c,
                &ClientMessage::JoinSession {
                    room_id: room(r),
                    name: format!("P{}", name % 3),
                    is_owner: owner,
                    owner_token: None,
                },
            )],
            Step::Limit { conn: c, room: r, limit } => vec![frame(
                c,
                &ClientMessage::SetTimerLimit {
                    room_id: room(r),
                    limit: LimitInput::Integer(i64::from(limit)),
                },
            )],
            Step::Start { conn: c, room: r } => {
                vec![frame(c, &ClientMessage::StartTimer(room(r)))]
            },
            Step::Choice { conn: c, room: r, choice } => vec![frame(
                c,
                &ClientMessage::MakeChoice { room_id: room(r), choice: choice.to_string() },
            )],
            Step::Leave { conn: c, room: r } => {
                vec![frame(c, &ClientMessage::LeaveSession(room(r)))]
            },
            Step::Kick { conn: c, room: r, target } => vec![frame(
                c,
                &ClientMessage::KickPlayer { room_id: room(r), player_id: conn(target) },
            )],
            Step::Garbage { conn: c, bytes } => match Frame::new(bytes) {
                Ok(frame) => vec![ServerEvent::FrameReceived { connection_id: conn(c), frame }],
                Err(_) => Vec::new(),
            },
            Step::Tick => vec![ServerEvent::Tick],
            Step::Reconnect { conn: c } => vec![
                ServerEvent::ConnectionClosed { connection_id: conn(c), reason: "fuzz".into() },
                ServerEvent::ConnectionAccepted { connection_id: conn(c) },
            ],
        };

        for event in events {
            let actions = driver.process_event(event).expect("known connection must not error");

            for action in &actions {
                if let ServerAction::BroadcastToRoom {
                    room_id,
                    message: ServerMessage::UpdatePlayers(players),
                } = action
                {
                    if driver.sessions().get(room_id).is_some_and(|s| s.is_timer_active()) {
                        assert!(players.iter().all(|p| p.choice.is_none()));
                    }
                }
            }
        }

        for room_id in driver.sessions().rooms() {
            let session = driver.sessions().get(room_id).unwrap();
            assert!(!session.roster().is_empty());

            let subscribers: Vec<u64> = driver.connections_in_room(room_id).collect();
            for player in session.roster().iter() {
                assert!(subscribers.contains(&player.connection_id));
            }
        }
    }

    assert_eq!(driver.connection_count(), CONNECTIONS as usize);
});
