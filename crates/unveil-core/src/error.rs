//! Error types for room operations.
//!
//! None of these are fatal. The router turns a few of them into a single
//! user-facing notice and drops the rest silently.

use thiserror::Error;
use unveil_proto::{ConnectionId, RoomId};

/// Reasons a room operation was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Caller does not hold room authority
    #[error("connection {caller} is not the owner of room {room_id}")]
    NotOwner {
        /// Room addressed
        room_id: RoomId,
        /// Connection that attempted the privileged operation
        caller: ConnectionId,
    },

    /// Submission outside a running round
    #[error("no round is running in room {0}")]
    TimerIdle(RoomId),

    /// Caller has no roster entry in the room
    #[error("connection {caller} has no player in room {room_id}")]
    UnknownPlayer {
        /// Room addressed
        room_id: RoomId,
        /// Connection without a player
        caller: ConnectionId,
    },

    /// Countdown belongs to a superseded round
    #[error("countdown generation {generation} is stale in room {room_id}")]
    StaleTimer {
        /// Room the countdown was started in
        room_id: RoomId,
        /// Generation carried by the countdown
        generation: u64,
    },

    /// Room does not exist
    #[error("room not found: {0}")]
    RoomNotFound(RoomId),

    /// Room already exists
    #[error("room already exists: {0}")]
    RoomAlreadyExists(RoomId),

    /// Owner claim did not present the room's owner token
    #[error("ownership claim rejected for room {0}")]
    ClaimRejected(RoomId),
}

impl SessionError {
    /// Whether the caller should see a notice for this refusal.
    ///
    /// Authority failures and stray submissions are dropped without feedback;
    /// only a join that cannot proceed is worth telling the user about.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::RoomNotFound(_) | Self::ClaimRejected(_))
    }
}
