//! CBOR-encoded messages.
//!
//! Requests flow client → server as [`ClientMessage`]; events flow server →
//! client as [`ServerMessage`]. Both are adjacently tagged so a frame decodes
//! to `{"event": "<camelCaseName>", "data": <payload>}`.
//!
//! Disconnects are not messages: the runtime reports them as a transport
//! event.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    ConnectionId, Frame, RoomId,
    errors::{ProtocolError, Result},
};

/// Shared CBOR framing for both message directions.
pub trait WireMessage: Serialize + DeserializeOwned {
    /// Encode this message into a frame.
    fn to_frame(&self) -> Result<Frame> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| ProtocolError::CborEncode(e.to_string()))?;
        Frame::new(buf)
    }

    /// Decode a message from a frame's payload.
    fn from_frame(frame: &Frame) -> Result<Self> {
        ciborium::de::from_reader(&frame.payload[..])
            .map_err(|e| ProtocolError::CborDecode(e.to_string()))
    }
}

/// Raw time-limit value as supplied by a client.
///
/// Clients send whatever their input widget produced: a number or the text
/// of a form field. Coercion to seconds happens server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LimitInput {
    /// Integer value
    Integer(i64),
    /// Fractional value
    Float(f64),
    /// Free text
    Text(String),
}

impl From<u32> for LimitInput {
    fn from(seconds: u32) -> Self {
        Self::Integer(i64::from(seconds))
    }
}

impl From<&str> for LimitInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Requests sent by a connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Join (or create, when claiming ownership) a room
    JoinSession {
        /// Room to join
        room_id: RoomId,
        /// Display name; the roster's uniqueness key
        name: String,
        /// Whether the caller claims room ownership
        is_owner: bool,
        /// Capability returned by the room's creation acknowledgment
        #[serde(default, skip_serializing_if = "Option::is_none")]
        owner_token: Option<u64>,
    },

    /// Owner-only: change the countdown length
    SetTimerLimit {
        /// Target room
        room_id: RoomId,
        /// Requested limit in seconds
        limit: LimitInput,
    },

    /// Owner-only: start a round
    StartTimer(RoomId),

    /// Submit a choice for the running round
    MakeChoice {
        /// Target room
        room_id: RoomId,
        /// Submitted value
        choice: String,
    },

    /// Leave a room
    LeaveSession(RoomId),

    /// Owner-only: remove a player
    KickPlayer {
        /// Target room
        room_id: RoomId,
        /// Connection id of the player to remove
        player_id: ConnectionId,
    },
}

impl WireMessage for ClientMessage {}

/// A player as presented to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    /// Connection currently representing the player
    pub id: ConnectionId,
    /// Display name
    pub name: String,
    /// Submitted choice, when visible
    pub choice: Option<String>,
    /// Whether the player joined as the room owner
    pub is_owner: bool,
}

/// Events emitted by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Current sorted roster of a room
    UpdatePlayers(Vec<PlayerView>),

    /// Acknowledgment of a successful join, sent to the joiner only
    Joined {
        /// Whether the join claimed ownership
        is_owner: bool,
        /// Room joined
        room_id: RoomId,
        /// Ownership capability, present for owner joins
        #[serde(default, skip_serializing_if = "Option::is_none")]
        owner_token: Option<u64>,
    },

    /// User-facing error notice
    ErrorMsg(String),

    /// New countdown length in seconds
    LimitUpdated(u32),

    /// A round started with this many seconds
    TimerStarted(u32),

    /// Round over: sorted roster with every choice revealed
    Reveal(Vec<PlayerView>),

    /// The receiving connection was removed from its room
    Kicked,
}

impl WireMessage for ServerMessage {}

impl ServerMessage {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpdatePlayers(_) => "updatePlayers",
            Self::Joined { .. } => "joined",
            Self::ErrorMsg(_) => "errorMsg",
            Self::LimitUpdated(_) => "limitUpdated",
            Self::TimerStarted(_) => "timerStarted",
            Self::Reveal(_) => "reveal",
            Self::Kicked => "kicked",
        }
    }
}
