//! Room id → session map and the countdowns running against it.
//!
//! The registry is an owned value; the server driver holds exactly one.
//! Sessions are created lazily by the first owner-claiming join and evicted
//! once their roster is empty. Eviction also cancels the room's countdowns, so
//! a later room with the same id never sees a reveal it did not start.
//!
//! Rooms are stored in a `BTreeMap` so iteration order (disconnect fan-out,
//! tick reveals) is deterministic across runs.

use std::{collections::BTreeMap, time::Duration};

use unveil_proto::{ConnectionId, RoomId};

use crate::{
    error::SessionError,
    roster::{JoinOutcome, Player},
    session::{DEFAULT_TIME_LIMIT, OwnerClaimPolicy, Session},
    timer::TimerWheel,
};

/// Values applied to newly created sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionDefaults {
    /// Initial countdown length in seconds
    pub time_limit: u32,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self { time_limit: DEFAULT_TIME_LIMIT }
    }
}

/// A join as presented to the registry.
#[derive(Debug, Clone, Copy)]
pub struct JoinRequest<'a> {
    /// Room to join
    pub room_id: &'a str,
    /// Player name
    pub name: &'a str,
    /// Connection joining
    pub connection_id: ConnectionId,
    /// Whether the caller claims ownership
    pub claim_owner: bool,
    /// Token presented with an ownership claim
    pub owner_token: Option<u64>,
}

/// Outcome of an accepted join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinReceipt {
    /// The join created the room
    pub created: bool,
    /// Whether the player was added or reattached
    pub outcome: JoinOutcome,
    /// Owner token, handed back to accepted owner claims only
    pub owner_token: Option<u64>,
}

/// Players revealed at the end of a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reveal {
    /// Room whose round ended
    pub room_id: RoomId,
    /// Sorted roster, choices included
    pub players: Vec<Player>,
}

/// All live rooms.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<RoomId, Session>,
    timers: TimerWheel,
    defaults: SessionDefaults,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new(defaults: SessionDefaults) -> Self {
        Self { sessions: BTreeMap::new(), timers: TimerWheel::new(), defaults }
    }

    /// Session for `room_id`.
    pub fn get(&self, room_id: &str) -> Option<&Session> {
        self.sessions.get(room_id)
    }

    /// Mutable session for `room_id`.
    pub fn get_mut(&mut self, room_id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(room_id)
    }

    /// Whether `room_id` is live.
    pub fn contains(&self, room_id: &str) -> bool {
        self.sessions.contains_key(room_id)
    }

    /// Number of live rooms.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// No live rooms.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Live room ids in order.
    pub fn rooms(&self) -> impl Iterator<Item = &RoomId> {
        self.sessions.keys()
    }

    /// Outstanding countdowns across all rooms.
    pub fn timers(&self) -> &TimerWheel {
        &self.timers
    }

    /// Create a room owned by `owner`.
    pub fn create(
        &mut self,
        room_id: &str,
        owner: ConnectionId,
        owner_token: u64,
    ) -> Result<&mut Session, SessionError> {
        if self.sessions.contains_key(room_id) {
            return Err(SessionError::RoomAlreadyExists(room_id.to_string()));
        }

        let session = Session::new(room_id, owner, owner_token, self.defaults.time_limit);
        Ok(self.sessions.entry(room_id.to_string()).or_insert(session))
    }

    /// Join a room, creating it when the caller claims ownership.
    ///
    /// `mint_token` is only called when a room is created.
    pub fn join(
        &mut self,
        request: JoinRequest<'_>,
        policy: OwnerClaimPolicy,
        mint_token: impl FnOnce() -> u64,
    ) -> Result<JoinReceipt, SessionError> {
        let JoinRequest { room_id, name, connection_id, claim_owner, owner_token } = request;

        let created = !self.contains(room_id);
        if created && !claim_owner {
            return Err(SessionError::RoomNotFound(room_id.to_string()));
        }

        let session = if created {
            self.create(room_id, connection_id, mint_token())?
        } else {
            let session = self
                .sessions
                .get_mut(room_id)
                .ok_or_else(|| SessionError::RoomNotFound(room_id.to_string()))?;
            if claim_owner {
                session.claim_ownership(connection_id, owner_token, policy)?;
            }
            session
        };

        let outcome = session.join(name, connection_id, claim_owner);

        Ok(JoinReceipt {
            created,
            outcome,
            owner_token: claim_owner.then(|| session.owner_token()),
        })
    }

    /// Owner-only: start a round in `room_id` at clock reading `now`,
    /// replacing any queued countdown.
    ///
    /// Returns the countdown length.
    pub fn start_timer(
        &mut self,
        room_id: &str,
        caller: ConnectionId,
        now: Duration,
    ) -> Result<u32, SessionError> {
        let session = self
            .sessions
            .get_mut(room_id)
            .ok_or_else(|| SessionError::RoomNotFound(room_id.to_string()))?;

        let countdown = session.start_timer(caller, now)?;
        let seconds = countdown.seconds();

        self.timers.cancel_room(room_id);
        self.timers.schedule(countdown);
        Ok(seconds)
    }

    /// End every round whose deadline has passed at clock reading `now`.
    ///
    /// Each expiry yields either the reveal for its room or the reason it was
    /// discarded.
    pub fn tick(&mut self, now: Duration) -> Vec<Result<Reveal, SessionError>> {
        self.timers
            .tick(now)
            .into_iter()
            .map(|expiry| {
                let session = self
                    .sessions
                    .get_mut(&expiry.room_id)
                    .ok_or_else(|| SessionError::RoomNotFound(expiry.room_id.clone()))?;
                let players = session.expire(expiry.generation)?;
                Ok(Reveal { room_id: expiry.room_id, players })
            })
            .collect()
    }

    /// Remove the player bound to `connection_id` from every room.
    ///
    /// Returns the rooms that lost a player. Empty rooms are left for the
    /// caller to evict after it has broadcast the change.
    pub fn remove_connection(&mut self, connection_id: ConnectionId) -> Vec<RoomId> {
        self.sessions
            .iter_mut()
            .filter_map(|(room_id, session)| {
                session.leave(connection_id).map(|_| room_id.clone())
            })
            .collect()
    }

    /// Drop `room_id` if its roster is empty. Returns whether it was dropped.
    pub fn evict_if_empty(&mut self, room_id: &str) -> bool {
        if !self.sessions.get(room_id).is_some_and(|s| s.roster().is_empty()) {
            return false;
        }

        self.sessions.remove(room_id);
        self.timers.cancel_room(room_id);
        true
    }
}
