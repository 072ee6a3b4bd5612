//! Player roster for one room.
//!
//! Players are kept in insertion order and deduplicated by name. A player who
//! reconnects under the same name keeps their slot (and their choice) and only
//! has the connection id swapped, so the room cannot tell them apart from a
//! player who never left.
//!
//! The canonical presentation order is [`Roster::sorted`], recomputed on every
//! call.

use std::cmp::Ordering;

use unveil_proto::{ConnectionId, PlayerView};

/// A participant in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Connection currently representing this player
    pub connection_id: ConnectionId,
    /// Display name, unique within the room
    pub name: String,
    /// Submission for the current round
    pub choice: Option<String>,
    /// Whether the player was created by an owner-claiming join
    pub is_owner: bool,
}

impl Player {
    /// Observer view including the choice.
    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.connection_id,
            name: self.name.clone(),
            choice: self.choice.clone(),
            is_owner: self.is_owner,
        }
    }

    /// Observer view with the choice withheld.
    pub fn hidden_view(&self) -> PlayerView {
        PlayerView { choice: None, ..self.view() }
    }
}

/// Result of [`Roster::add_or_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new player was appended
    Added,
    /// An existing player was reattached to a new connection
    Rejoined {
        /// Connection the player was bound to before
        previous: ConnectionId,
    },
}

/// Insertion-ordered set of players, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: Vec<Player>,
}

impl Roster {
    /// Create an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a player, or reattach an existing one to `connection_id`.
    ///
    /// Rejoining leaves `choice` and `is_owner` untouched.
    pub fn add_or_update(
        &mut self,
        name: &str,
        connection_id: ConnectionId,
        is_owner: bool,
    ) -> JoinOutcome {
        if let Some(player) = self.players.iter_mut().find(|p| p.name == name) {
            let previous = std::mem::replace(&mut player.connection_id, connection_id);
            return JoinOutcome::Rejoined { previous };
        }

        self.players.push(Player {
            connection_id,
            name: name.to_string(),
            choice: None,
            is_owner,
        });
        JoinOutcome::Added
    }

    /// Remove the player bound to `connection_id`, if any.
    pub fn remove(&mut self, connection_id: ConnectionId) -> Option<Player> {
        let index = self.players.iter().position(|p| p.connection_id == connection_id)?;
        Some(self.players.remove(index))
    }

    /// Player bound to `connection_id`.
    pub fn find_by_connection(&self, connection_id: ConnectionId) -> Option<&Player> {
        self.players.iter().find(|p| p.connection_id == connection_id)
    }

    /// Mutable player bound to `connection_id`.
    pub fn find_by_connection_mut(&mut self, connection_id: ConnectionId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.connection_id == connection_id)
    }

    /// Player named `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    /// Clear every player's choice.
    pub fn reset_choices(&mut self) {
        for player in &mut self.players {
            player.choice = None;
        }
    }

    /// Snapshot in canonical order (see [`natural_cmp`]).
    pub fn sorted(&self) -> Vec<Player> {
        let mut players = self.players.clone();
        players.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        players
    }

    /// Players in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    /// Number of players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// No players left.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

/// Natural name order: case-insensitive, digit runs compared by value.
///
/// `"p2" < "p10"` and `"alice" < "Bob"`. Names that only differ in case or in
/// leading zeros fall back to plain byte order, so the result is a total order
/// over distinct strings.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    folded_cmp(a, b).then_with(|| a.cmp(b))
}

fn folded_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        let ord = match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_run = take_digits(&mut left);
                let r_run = take_digits(&mut right);
                cmp_digit_runs(&l_run, &r_run)
            },
            (Some(l), Some(r)) => {
                left.next();
                right.next();
                l.to_lowercase().cmp(r.to_lowercase())
            },
        };

        if ord != Ordering::Equal {
            return ord;
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        run.push(c);
    }
    run
}

// Digit runs are compared as strings so arbitrarily long numbers never
// overflow.
fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
