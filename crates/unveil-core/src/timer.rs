//! Reveal countdowns.
//!
//! A round is a small state machine owned by the session:
//!
//! ```text
//! ┌──────┐  start (owner)   ┌─────────────────────────┐
//! │ Idle │─────────────────>│ Running { generation }  │
//! └──────┘                  └─────────────────────────┘
//!    ↑                            │            │
//!    │    countdown expiry with   │            │ start again
//!    └──── matching generation ───┘            │ (generation + 1)
//!                                              ↓
//!                               ┌─────────────────────────┐
//!                               │ Running { generation+1 }│
//!                               └─────────────────────────┘
//! ```
//!
//! Countdowns live outside the session, in a [`TimerWheel`]. Each one is
//! anchored to the moment its round started and carries an absolute deadline
//! on the caller's clock, so a reveal never comes early however the clock
//! samples are spaced. Every countdown also carries the generation it was
//! started for; the session refuses expiries whose generation is not the
//! current one, and restarting a round cancels the room's queued countdowns.
//!
//! Clock readings are [`Duration`]s since an origin of the caller's choosing.

use std::time::Duration;

use unveil_proto::RoomId;

/// Round state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerState {
    /// No round running; submissions are ignored
    #[default]
    Idle,
    /// Round running; submissions accepted
    Running {
        /// Generation of the countdown driving this round
        generation: u64,
    },
}

impl TimerState {
    /// Whether a round is running.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

/// Handle for one scheduled countdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    room_id: RoomId,
    generation: u64,
    seconds: u32,
    deadline: Duration,
}

impl Countdown {
    /// Countdown of `seconds` for `generation` of `room_id`, started at clock
    /// reading `started_at`.
    pub fn new(
        room_id: impl Into<RoomId>,
        generation: u64,
        seconds: u32,
        started_at: Duration,
    ) -> Self {
        let deadline = started_at.saturating_add(Duration::from_secs(u64::from(seconds)));
        Self { room_id: room_id.into(), generation, seconds, deadline }
    }

    /// Room the countdown belongs to.
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Generation the countdown was started for.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Round length in seconds.
    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    /// Clock reading at which the round ends.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Whether the round is over at clock reading `now`.
    pub fn is_due(&self, now: Duration) -> bool {
        now >= self.deadline
    }
}

/// An expired countdown, to be checked against its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expiry {
    /// Room the countdown belonged to
    pub room_id: RoomId,
    /// Generation the countdown was started for
    pub generation: u64,
}

/// All outstanding countdowns.
#[derive(Debug, Default)]
pub struct TimerWheel {
    countdowns: Vec<Countdown>,
}

impl TimerWheel {
    /// Create an empty wheel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a countdown.
    pub fn schedule(&mut self, countdown: Countdown) {
        self.countdowns.push(countdown);
    }

    /// Drop every countdown queued for `room_id`. Returns how many were
    /// cancelled.
    pub fn cancel_room(&mut self, room_id: &str) -> usize {
        let before = self.countdowns.len();
        self.countdowns.retain(|c| c.room_id != room_id);
        before - self.countdowns.len()
    }

    /// Collect every countdown whose deadline has passed at `now`.
    ///
    /// Expired countdowns leave the wheel and come back in deadline order;
    /// equal deadlines keep scheduling order.
    pub fn tick(&mut self, now: Duration) -> Vec<Expiry> {
        let mut due = Vec::new();

        self.countdowns.retain(|countdown| {
            if countdown.is_due(now) {
                due.push(countdown.clone());
                false
            } else {
                true
            }
        });

        due.sort_by_key(Countdown::deadline);
        due.into_iter().map(|c| Expiry { room_id: c.room_id, generation: c.generation }).collect()
    }

    /// Number of queued countdowns.
    pub fn len(&self) -> usize {
        self.countdowns.len()
    }

    /// No countdowns queued.
    pub fn is_empty(&self) -> bool {
        self.countdowns.is_empty()
    }
}
