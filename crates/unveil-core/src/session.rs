//! One room's state: roster, ownership, time limit and round state.
//!
//! Every privileged operation (set time limit, start timer, kick) checks the
//! caller against the current owner connection and returns
//! [`SessionError::NotOwner`] otherwise. Ownership is a fact about a
//! connection, independent of roster membership: the owner may have left the
//! roster and still hold authority.

use std::time::Duration;

use unveil_proto::{ConnectionId, LimitInput, PlayerView, RoomId};

use crate::{
    error::SessionError,
    roster::{JoinOutcome, Player, Roster},
    timer::{Countdown, TimerState},
};

/// Countdown length used when none (or garbage) is configured.
pub const DEFAULT_TIME_LIMIT: u32 = 10;

/// How an owner-claiming join against an existing room is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OwnerClaimPolicy {
    /// The most recent claim wins, no proof required
    #[default]
    Open,
    /// A claim must present the owner token issued when the room was created
    Token,
}

/// State of a single room.
#[derive(Debug, Clone)]
pub struct Session {
    room_id: RoomId,
    owner: ConnectionId,
    owner_token: u64,
    roster: Roster,
    timer: TimerState,
    generation: u64,
    time_limit: u32,
}

impl Session {
    /// Create an idle room owned by `owner`.
    pub fn new(
        room_id: impl Into<RoomId>,
        owner: ConnectionId,
        owner_token: u64,
        time_limit: u32,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            owner,
            owner_token,
            roster: Roster::new(),
            timer: TimerState::Idle,
            generation: 0,
            time_limit,
        }
    }

    /// Room identifier.
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Connection currently holding authority.
    pub fn owner(&self) -> ConnectionId {
        self.owner
    }

    /// Whether `connection_id` holds authority.
    pub fn is_owner(&self, connection_id: ConnectionId) -> bool {
        self.owner == connection_id
    }

    /// Capability proving ownership under [`OwnerClaimPolicy::Token`].
    pub fn owner_token(&self) -> u64 {
        self.owner_token
    }

    /// The room's players.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Round state.
    pub fn timer(&self) -> TimerState {
        self.timer
    }

    /// Whether a round is running.
    pub fn is_timer_active(&self) -> bool {
        self.timer.is_running()
    }

    /// Generation of the most recently started round.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Countdown length in seconds.
    pub fn time_limit(&self) -> u32 {
        self.time_limit
    }

    /// Transfer authority to `connection_id`.
    pub fn claim_ownership(
        &mut self,
        connection_id: ConnectionId,
        token: Option<u64>,
        policy: OwnerClaimPolicy,
    ) -> Result<(), SessionError> {
        if policy == OwnerClaimPolicy::Token && token != Some(self.owner_token) {
            return Err(SessionError::ClaimRejected(self.room_id.clone()));
        }

        self.owner = connection_id;
        Ok(())
    }

    /// Add or reattach a player.
    pub fn join(&mut self, name: &str, connection_id: ConnectionId, is_owner: bool) -> JoinOutcome {
        self.roster.add_or_update(name, connection_id, is_owner)
    }

    /// Owner-only: change the countdown length for future rounds.
    pub fn set_time_limit(
        &mut self,
        caller: ConnectionId,
        seconds: u32,
    ) -> Result<u32, SessionError> {
        self.authorize(caller)?;
        self.time_limit = seconds;
        Ok(seconds)
    }

    /// Owner-only: start a round.
    ///
    /// Clears every choice and returns the countdown that ends the round
    /// `time_limit` seconds after `now`. Starting while a round runs is
    /// allowed; the new round supersedes it.
    pub fn start_timer(
        &mut self,
        caller: ConnectionId,
        now: Duration,
    ) -> Result<Countdown, SessionError> {
        self.authorize(caller)?;

        self.generation += 1;
        self.timer = TimerState::Running { generation: self.generation };
        self.roster.reset_choices();

        Ok(Countdown::new(self.room_id.clone(), self.generation, self.time_limit, now))
    }

    /// Record the caller's choice for the running round.
    pub fn submit_choice(
        &mut self,
        caller: ConnectionId,
        choice: impl Into<String>,
    ) -> Result<(), SessionError> {
        if !self.timer.is_running() {
            return Err(SessionError::TimerIdle(self.room_id.clone()));
        }

        let player = self.roster.find_by_connection_mut(caller).ok_or_else(|| {
            SessionError::UnknownPlayer { room_id: self.room_id.clone(), caller }
        })?;
        player.choice = Some(choice.into());
        Ok(())
    }

    /// End the round driven by `generation`, returning the revealed roster.
    pub fn expire(&mut self, generation: u64) -> Result<Vec<Player>, SessionError> {
        if self.timer != (TimerState::Running { generation }) {
            return Err(SessionError::StaleTimer { room_id: self.room_id.clone(), generation });
        }

        self.timer = TimerState::Idle;
        Ok(self.roster.sorted())
    }

    /// Owner-only: remove the player bound to `target`.
    pub fn kick(
        &mut self,
        caller: ConnectionId,
        target: ConnectionId,
    ) -> Result<Option<Player>, SessionError> {
        self.authorize(caller)?;
        Ok(self.unbind(target))
    }

    /// Remove the caller's player, if any.
    pub fn leave(&mut self, connection_id: ConnectionId) -> Option<Player> {
        self.unbind(connection_id)
    }

    // A connection that joined under several names holds several slots; all
    // of them go.
    fn unbind(&mut self, connection_id: ConnectionId) -> Option<Player> {
        let first = self.roster.remove(connection_id)?;
        while self.roster.remove(connection_id).is_some() {}
        Some(first)
    }

    /// Sorted roster for `updatePlayers`.
    ///
    /// Choices are withheld while a round runs; the reveal is the only place
    /// in-round choices become visible.
    pub fn player_views(&self) -> Vec<PlayerView> {
        let running = self.timer.is_running();
        self.roster
            .sorted()
            .iter()
            .map(|p| if running { p.hidden_view() } else { p.view() })
            .collect()
    }

    fn authorize(&self, caller: ConnectionId) -> Result<(), SessionError> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(SessionError::NotOwner { room_id: self.room_id.clone(), caller })
        }
    }
}

/// Coerce a client-supplied limit to seconds.
///
/// Integers are taken as-is, fractions truncate toward zero, and text is read
/// for a leading integer (`" 15s"` is 15). Anything unreadable, non-positive
/// or wider than `u32` becomes `default`.
pub fn parse_time_limit(input: &LimitInput, default: u32) -> u32 {
    let parsed = match input {
        LimitInput::Integer(n) => Some(*n),
        LimitInput::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        LimitInput::Float(_) => None,
        LimitInput::Text(text) => leading_integer(text),
    };

    parsed.filter(|n| *n > 0).and_then(|n| u32::try_from(n).ok()).unwrap_or(default)
}

fn leading_integer(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let value: i64 = rest.get(..end).filter(|d| !d.is_empty())?.parse().ok()?;

    Some(if negative { -value } else { value })
}
