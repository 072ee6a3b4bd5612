//! Server driver.
//!
//! Ties together the room state machines ([`SessionRegistry`]) and broadcast
//! membership ([`ConnectionRegistry`]). The driver performs no I/O: runtimes
//! feed it [`ServerEvent`]s and execute the [`ServerAction`]s it returns.
//!
//! Refused requests never produce an error. Privileged commands from
//! non-owners and stray submissions are dropped with a debug log; a join that
//! cannot proceed gets one targeted `errorMsg`.

use std::time::Duration;

use unveil_core::{
    Environment, JoinRequest, Player, SessionError, SessionRegistry, parse_time_limit,
};
use unveil_proto::{
    ClientMessage, ConnectionId, Frame, LimitInput, PlayerView, RoomId, ServerMessage,
    WireMessage,
};

use crate::{config::DriverConfig, registry::ConnectionRegistry, server_error::ServerError};

/// Events that the server driver processes.
///
/// These are produced by the external runtime (simulation or production).
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A new connection was accepted
    ConnectionAccepted {
        /// Unique connection ID assigned by the runtime
        connection_id: ConnectionId,
    },

    /// A frame was received from a connection
    FrameReceived {
        /// Connection that sent the frame
        connection_id: ConnectionId,
        /// The received frame
        frame: Frame,
    },

    /// A connection was closed (by peer or error)
    ConnectionClosed {
        /// Connection that was closed
        connection_id: ConnectionId,
        /// Reason for closure
        reason: String,
    },

    /// Clock sample; every round whose deadline has passed ends
    Tick,
}

/// Actions that the server driver produces.
///
/// These are executed by runtime-specific code (production or simulation).
/// `I` is the environment's instant type.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerAction<I = std::time::Instant> {
    /// Send a message to one connection
    SendToConnection {
        /// Target connection
        connection_id: ConnectionId,
        /// Message to send
        message: ServerMessage,
    },

    /// Send a message to every connection subscribed to a room
    ///
    /// Subscribers are resolved when the action is executed.
    BroadcastToRoom {
        /// Target room
        room_id: RoomId,
        /// Message to broadcast
        message: ServerMessage,
    },

    /// Close a connection
    CloseConnection {
        /// Connection to close
        connection_id: ConnectionId,
        /// Reason for closure
        reason: String,
    },

    /// Log a message (for debugging/monitoring)
    Log {
        /// Log level
        level: LogLevel,
        /// Message to log
        message: String,
        /// When the event occurred
        timestamp: I,
    },
}

/// Log levels for server actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
}

/// Action-based server driver.
///
/// Routes room requests, countdown ticks and disconnects.
pub struct ServerDriver<E>
where
    E: Environment,
{
    /// Live connections and their room subscriptions
    connections: ConnectionRegistry,
    /// Room state
    sessions: SessionRegistry,
    /// Environment (time, RNG)
    env: E,
    /// Origin of the clock that round deadlines are measured on
    epoch: E::Instant,
    /// Server configuration
    config: DriverConfig,
}

type Actions<E> = Vec<ServerAction<<E as Environment>::Instant>>;

impl<E> ServerDriver<E>
where
    E: Environment,
{
    /// Create a new server driver.
    pub fn new(env: E, config: DriverConfig) -> Self {
        let epoch = env.now();
        Self {
            connections: ConnectionRegistry::new(),
            sessions: SessionRegistry::new(config.session_defaults()),
            env,
            epoch,
            config,
        }
    }

    /// Process a server event and return actions to execute.
    ///
    /// This is the main entry point for the server driver.
    pub fn process_event(&mut self, event: ServerEvent) -> Result<Actions<E>, ServerError> {
        match event {
            ServerEvent::ConnectionAccepted { connection_id } => {
                self.handle_connection_accepted(connection_id)
            },
            ServerEvent::FrameReceived { connection_id, frame } => {
                self.handle_frame_received(connection_id, &frame)
            },
            ServerEvent::ConnectionClosed { connection_id, reason } => {
                self.handle_connection_closed(connection_id, &reason)
            },
            ServerEvent::Tick => Ok(self.handle_tick()),
        }
    }

    fn handle_connection_accepted(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<Actions<E>, ServerError> {
        if self.connections.connection_count() >= self.config.max_connections {
            return Ok(vec![ServerAction::CloseConnection {
                connection_id,
                reason: "max connections exceeded".to_string(),
            }]);
        }

        if !self.connections.register(connection_id) {
            return Err(ServerError::ConnectionAlreadyExists(connection_id));
        }

        Ok(vec![self.log(LogLevel::Debug, format!("connection {connection_id} accepted"))])
    }

    fn handle_frame_received(
        &mut self,
        connection_id: ConnectionId,
        frame: &Frame,
    ) -> Result<Actions<E>, ServerError> {
        if !self.connections.is_registered(connection_id) {
            return Err(ServerError::ConnectionNotFound(connection_id));
        }

        let request = match ClientMessage::from_frame(frame) {
            Ok(request) => request,
            Err(e) => {
                return Ok(vec![self.log(
                    LogLevel::Warn,
                    format!("dropping undecodable frame from connection {connection_id}: {e}"),
                )]);
            },
        };

        match request {
            ClientMessage::JoinSession { room_id, name, is_owner, owner_token } => {
                let request = JoinRequest {
                    room_id: &room_id,
                    name: &name,
                    connection_id,
                    claim_owner: is_owner,
                    owner_token,
                };
                self.handle_join(request)
            },
            ClientMessage::SetTimerLimit { room_id, limit } => {
                Ok(self.handle_set_limit(connection_id, &room_id, &limit))
            },
            ClientMessage::StartTimer(room_id) => Ok(self.handle_start(connection_id, &room_id)),
            ClientMessage::MakeChoice { room_id, choice } => {
                Ok(self.handle_choice(connection_id, &room_id, choice))
            },
            ClientMessage::LeaveSession(room_id) => Ok(self.handle_leave(connection_id, &room_id)),
            ClientMessage::KickPlayer { room_id, player_id } => {
                Ok(self.handle_kick(connection_id, &room_id, player_id))
            },
        }
    }

    fn handle_join(&mut self, request: JoinRequest<'_>) -> Result<Actions<E>, ServerError> {
        let JoinRequest { room_id, name, connection_id, claim_owner, .. } = request;
        let env = &self.env;

        let receipt =
            match self.sessions.join(request, self.config.owner_claim, || env.random_u64()) {
                Ok(receipt) => receipt,
                Err(e @ SessionError::RoomAlreadyExists(_)) => return Err(e.into()),
                Err(e) => return Ok(self.refusal(connection_id, &e)),
            };

        self.connections.subscribe(connection_id, room_id);

        let mut actions = Vec::new();
        if receipt.created {
            actions.push(
                self.log(LogLevel::Info, format!("room {room_id} created by {connection_id}")),
            );
        }
        actions.push(self.log(
            LogLevel::Debug,
            format!("{name:?} joined {room_id} from {connection_id} ({:?})", receipt.outcome),
        ));
        actions.push(self.update_players(room_id));
        actions.push(ServerAction::SendToConnection {
            connection_id,
            message: ServerMessage::Joined {
                is_owner: claim_owner,
                room_id: room_id.to_string(),
                owner_token: receipt.owner_token,
            },
        });

        Ok(actions)
    }

    fn handle_set_limit(
        &mut self,
        caller: ConnectionId,
        room_id: &str,
        limit: &LimitInput,
    ) -> Actions<E> {
        let seconds = parse_time_limit(limit, self.config.default_time_limit);

        let result = match self.sessions.get_mut(room_id) {
            Some(session) => session.set_time_limit(caller, seconds),
            None => Err(SessionError::RoomNotFound(room_id.to_string())),
        };

        match result {
            Ok(seconds) => vec![broadcast(room_id, ServerMessage::LimitUpdated(seconds))],
            Err(e) => vec![self.dropped(&e)],
        }
    }

    fn handle_start(&mut self, caller: ConnectionId, room_id: &str) -> Actions<E> {
        match self.sessions.start_timer(room_id, caller, self.clock()) {
            Ok(seconds) => vec![
                self.log(LogLevel::Debug, format!("round started in {room_id} for {seconds}s")),
                broadcast(room_id, ServerMessage::TimerStarted(seconds)),
            ],
            Err(e) => vec![self.dropped(&e)],
        }
    }

    fn handle_choice(&mut self, caller: ConnectionId, room_id: &str, choice: String) -> Actions<E> {
        let result = match self.sessions.get_mut(room_id) {
            Some(session) => session.submit_choice(caller, choice),
            None => Err(SessionError::RoomNotFound(room_id.to_string())),
        };

        match result {
            Ok(()) => Vec::new(),
            Err(e) => vec![self.dropped(&e)],
        }
    }

    fn handle_leave(&mut self, caller: ConnectionId, room_id: &str) -> Actions<E> {
        self.connections.unsubscribe(caller, room_id);

        let Some(session) = self.sessions.get_mut(room_id) else {
            return Vec::new();
        };
        session.leave(caller);

        let mut actions = vec![self.update_players(room_id)];
        actions.extend(self.evict_if_empty(room_id));
        actions
    }

    fn handle_kick(
        &mut self,
        caller: ConnectionId,
        room_id: &str,
        target: ConnectionId,
    ) -> Actions<E> {
        let result = match self.sessions.get_mut(room_id) {
            Some(session) => session.kick(caller, target),
            None => Err(SessionError::RoomNotFound(room_id.to_string())),
        };

        let removed = match result {
            Ok(removed) => removed,
            Err(e) => return vec![self.dropped(&e)],
        };

        let mut actions = Vec::new();
        let was_subscribed = self.connections.unsubscribe(target, room_id);
        if removed.is_some() || was_subscribed {
            actions.push(self.log(
                LogLevel::Info,
                format!("connection {target} kicked from {room_id} by {caller}"),
            ));
            actions.push(ServerAction::SendToConnection {
                connection_id: target,
                message: ServerMessage::Kicked,
            });
        }
        actions.push(self.update_players(room_id));
        actions.extend(self.evict_if_empty(room_id));
        actions
    }

    fn handle_connection_closed(
        &mut self,
        connection_id: ConnectionId,
        reason: &str,
    ) -> Result<Actions<E>, ServerError> {
        let subscribed = self
            .connections
            .unregister(connection_id)
            .ok_or(ServerError::ConnectionNotFound(connection_id))?;

        let mut actions = vec![self.log(
            LogLevel::Debug,
            format!(
                "connection {connection_id} closed: {reason} ({} subscriptions released)",
                subscribed.len()
            ),
        )];

        for room_id in self.sessions.remove_connection(connection_id) {
            actions.push(self.update_players(&room_id));
            actions.extend(self.evict_if_empty(&room_id));
        }

        Ok(actions)
    }

    fn handle_tick(&mut self) -> Actions<E> {
        let mut actions = Vec::new();

        for result in self.sessions.tick(self.clock()) {
            match result {
                Ok(reveal) => {
                    let players = reveal.players.iter().map(Player::view).collect();
                    actions.push(self.log(LogLevel::Debug, format!("reveal in {}", reveal.room_id)));
                    actions.push(broadcast(&reveal.room_id, ServerMessage::Reveal(players)));
                },
                Err(e) => actions.push(self.dropped(&e)),
            }
        }

        actions
    }

    fn evict_if_empty(&mut self, room_id: &str) -> Option<ServerAction<E::Instant>> {
        if !self.sessions.evict_if_empty(room_id) {
            return None;
        }

        let orphaned = self.connections.close_room(room_id);
        Some(self.log(
            LogLevel::Info,
            format!("room {room_id} evicted ({} idle subscribers released)", orphaned.len()),
        ))
    }

    fn update_players(&self, room_id: &str) -> ServerAction<E::Instant> {
        let players: Vec<PlayerView> =
            self.sessions.get(room_id).map(|s| s.player_views()).unwrap_or_default();
        broadcast(room_id, ServerMessage::UpdatePlayers(players))
    }

    fn refusal(&self, connection_id: ConnectionId, err: &SessionError) -> Actions<E> {
        let mut actions = vec![self.dropped(err)];
        if let Some(notice) = notice(err) {
            actions.push(ServerAction::SendToConnection {
                connection_id,
                message: ServerMessage::ErrorMsg(notice.to_string()),
            });
        }
        actions
    }

    fn dropped(&self, err: &SessionError) -> ServerAction<E::Instant> {
        self.log(LogLevel::Debug, format!("request dropped: {err}"))
    }

    /// Time since the driver was created; the clock round deadlines use.
    fn clock(&self) -> Duration {
        self.env.now() - self.epoch
    }

    fn log(&self, level: LogLevel, message: String) -> ServerAction<E::Instant> {
        ServerAction::Log { level, message, timestamp: self.env.now() }
    }

    /// All connections subscribed to a room.
    pub fn connections_in_room(&self, room_id: &str) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connections.connections_in_room(room_id)
    }

    /// Number of active connections.
    pub fn connection_count(&self) -> usize {
        self.connections.connection_count()
    }

    /// Room state, for inspection.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

}

impl<E> std::fmt::Debug for ServerDriver<E>
where
    E: Environment,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerDriver")
            .field("connection_count", &self.connections.connection_count())
            .field("room_count", &self.sessions.len())
            .field("pending_reveals", &self.sessions.timers().len())
            .finish()
    }
}

fn broadcast<I>(room_id: &str, message: ServerMessage) -> ServerAction<I> {
    ServerAction::BroadcastToRoom { room_id: room_id.to_string(), message }
}

/// User-facing text for refusals that warrant one.
fn notice(err: &SessionError) -> Option<&'static str> {
    match err {
        SessionError::RoomNotFound(_) => Some("Session does not exist."),
        SessionError::ClaimRejected(_) => Some("Ownership claim rejected."),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    };

    use unveil_core::OwnerClaimPolicy;

    use super::*;

    /// Counter RNG and a clock that only moves when told to.
    #[derive(Clone, Default)]
    struct TestEnv {
        counter: Arc<AtomicU64>,
        clock_ms: Arc<AtomicU64>,
    }

    impl TestEnv {
        fn advance(&self, by: Duration) {
            self.clock_ms.fetch_add(by.as_millis() as u64, Ordering::Relaxed);
        }
    }

    impl Environment for TestEnv {
        type Instant = Duration;

        fn now(&self) -> Duration {
            Duration::from_millis(self.clock_ms.load(Ordering::Relaxed))
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            let next = self.counter.fetch_add(1, Ordering::Relaxed) + 1000;
            for (dst, src) in buffer.iter_mut().zip(next.to_be_bytes().iter().cycle()) {
                *dst = *src;
            }
        }
    }

    type Action = ServerAction<Duration>;

    const ALICE: u64 = 1;
    const BOB: u64 = 2;
    const CAROL: u64 = 3;

    fn driver() -> ServerDriver<TestEnv> {
        driver_with(DriverConfig::default())
    }

    fn driver_with(config: DriverConfig) -> ServerDriver<TestEnv> {
        let mut driver = ServerDriver::new(TestEnv::default(), config);
        for id in [ALICE, BOB, CAROL] {
            driver.process_event(ServerEvent::ConnectionAccepted { connection_id: id }).unwrap();
        }
        driver
    }

    fn send(
        driver: &mut ServerDriver<TestEnv>,
        connection_id: u64,
        request: ClientMessage,
    ) -> Vec<Action> {
        let frame = request.to_frame().unwrap();
        driver.process_event(ServerEvent::FrameReceived { connection_id, frame }).unwrap()
    }

    fn join(room: &str, name: &str, owner: bool) -> ClientMessage {
        ClientMessage::JoinSession {
            room_id: room.into(),
            name: name.into(),
            is_owner: owner,
            owner_token: None,
        }
    }

    /// Non-log actions, for asserting on what clients observe.
    fn visible(actions: Vec<Action>) -> Vec<Action> {
        actions.into_iter().filter(|a| !matches!(a, ServerAction::Log { .. })).collect()
    }

    fn names(players: &[PlayerView]) -> Vec<(&str, Option<&str>)> {
        players.iter().map(|p| (p.name.as_str(), p.choice.as_deref())).collect()
    }

    /// Advance the clock by `by` and sample it.
    fn tick_after(driver: &mut ServerDriver<TestEnv>, by: Duration) -> Vec<Action> {
        driver.env.advance(by);
        visible(driver.process_event(ServerEvent::Tick).unwrap())
    }

    /// `times` one-second ticks.
    fn tick(driver: &mut ServerDriver<TestEnv>, times: usize) -> Vec<Action> {
        let mut actions = Vec::new();
        for _ in 0..times {
            actions.extend(tick_after(driver, Duration::from_secs(1)));
        }
        actions
    }

    #[test]
    fn server_accepts_connection() {
        let mut driver = ServerDriver::new(TestEnv::default(), DriverConfig::default());

        let actions =
            driver.process_event(ServerEvent::ConnectionAccepted { connection_id: 1 }).unwrap();

        assert_eq!(driver.connection_count(), 1);
        assert!(matches!(actions[0], ServerAction::Log { level: LogLevel::Debug, .. }));
    }

    #[test]
    fn server_rejects_when_max_connections_exceeded() {
        let config = DriverConfig { max_connections: 3, ..Default::default() };
        let mut driver = driver_with(config);

        let actions =
            driver.process_event(ServerEvent::ConnectionAccepted { connection_id: 4 }).unwrap();

        assert_eq!(driver.connection_count(), 3);
        assert!(matches!(actions[0], ServerAction::CloseConnection { connection_id: 4, .. }));
    }

    #[test]
    fn duplicate_connection_id_is_an_error() {
        let mut driver = driver();

        let result = driver.process_event(ServerEvent::ConnectionAccepted { connection_id: ALICE });

        assert_eq!(result, Err(ServerError::ConnectionAlreadyExists(ALICE)));
    }

    #[test]
    fn events_for_unknown_connection_fail() {
        let mut driver = driver();
        let frame = ClientMessage::StartTimer("R1".into()).to_frame().unwrap();

        assert_eq!(
            driver.process_event(ServerEvent::FrameReceived { connection_id: 99, frame }),
            Err(ServerError::ConnectionNotFound(99))
        );
        assert_eq!(
            driver.process_event(ServerEvent::ConnectionClosed {
                connection_id: 99,
                reason: "gone".into()
            }),
            Err(ServerError::ConnectionNotFound(99))
        );
    }

    #[test]
    fn garbage_payload_is_logged_and_dropped() {
        let mut driver = driver();
        let frame = Frame::new(vec![0xff, 0x00, 0x13]).unwrap();

        let actions =
            driver.process_event(ServerEvent::FrameReceived { connection_id: ALICE, frame }).unwrap();

        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], ServerAction::Log { level: LogLevel::Warn, .. }));
    }

    #[test]
    fn non_owner_join_to_missing_room_gets_notice() {
        let mut driver = driver();

        let actions = visible(send(&mut driver, BOB, join("R1", "Bob", false)));

        assert_eq!(actions, vec![ServerAction::SendToConnection {
            connection_id: BOB,
            message: ServerMessage::ErrorMsg("Session does not exist.".into()),
        }]);
        assert!(driver.sessions().is_empty());
        assert_eq!(driver.connections_in_room("R1").count(), 0);
    }

    #[test]
    fn owner_join_creates_room_and_acknowledges() {
        let mut driver = driver();

        let actions = visible(send(&mut driver, ALICE, join("R1", "Alice", true)));

        assert_eq!(actions.len(), 2);
        match &actions[0] {
            ServerAction::BroadcastToRoom { room_id, message: ServerMessage::UpdatePlayers(p) } => {
                assert_eq!(room_id, "R1");
                assert_eq!(names(p), vec![("Alice", None)]);
                assert!(p[0].is_owner);
            },
            other => panic!("expected updatePlayers, got {other:?}"),
        }
        match &actions[1] {
            ServerAction::SendToConnection {
                connection_id,
                message: ServerMessage::Joined { is_owner, room_id, owner_token },
            } => {
                assert_eq!(*connection_id, ALICE);
                assert!(*is_owner);
                assert_eq!(room_id, "R1");
                assert!(owner_token.is_some());
            },
            other => panic!("expected joined, got {other:?}"),
        }

        let session = driver.sessions().get("R1").unwrap();
        assert_eq!(session.time_limit(), 10);
        assert_eq!(session.owner(), ALICE);
        assert_eq!(driver.connections_in_room("R1").collect::<Vec<_>>(), vec![ALICE]);
    }

    #[test]
    fn full_round_reveals_choices() {
        let mut driver = driver();
        send(&mut driver, ALICE, join("R1", "Alice", true));

        let actions = visible(send(&mut driver, BOB, join("R1", "Bob", false)));
        match &actions[0] {
            ServerAction::BroadcastToRoom { message: ServerMessage::UpdatePlayers(p), .. } => {
                assert_eq!(names(p), vec![("Alice", None), ("Bob", None)]);
            },
            other => panic!("expected updatePlayers, got {other:?}"),
        }

        let set = ClientMessage::SetTimerLimit { room_id: "R1".into(), limit: 5.into() };
        assert_eq!(visible(send(&mut driver, ALICE, set)), vec![ServerAction::BroadcastToRoom {
            room_id: "R1".into(),
            message: ServerMessage::LimitUpdated(5),
        }]);

        let start = ClientMessage::StartTimer("R1".into());
        assert_eq!(visible(send(&mut driver, ALICE, start)), vec![ServerAction::BroadcastToRoom {
            room_id: "R1".into(),
            message: ServerMessage::TimerStarted(5),
        }]);

        assert!(tick(&mut driver, 2).is_empty());
        let choice = ClientMessage::MakeChoice { room_id: "R1".into(), choice: "3".into() };
        assert!(visible(send(&mut driver, BOB, choice)).is_empty());
        assert!(tick(&mut driver, 2).is_empty());

        let reveal = tick(&mut driver, 1);
        match reveal.as_slice() {
            [ServerAction::BroadcastToRoom { room_id, message: ServerMessage::Reveal(p) }] => {
                assert_eq!(room_id, "R1");
                assert_eq!(names(p), vec![("Alice", None), ("Bob", Some("3"))]);
            },
            other => panic!("expected reveal, got {other:?}"),
        }
        assert!(!driver.sessions().get("R1").unwrap().is_timer_active());

        let kick = ClientMessage::KickPlayer { room_id: "R1".into(), player_id: BOB };
        let actions = visible(send(&mut driver, ALICE, kick));
        assert_eq!(actions[0], ServerAction::SendToConnection {
            connection_id: BOB,
            message: ServerMessage::Kicked,
        });
        match &actions[1] {
            ServerAction::BroadcastToRoom { message: ServerMessage::UpdatePlayers(p), .. } => {
                assert_eq!(names(p), vec![("Alice", None)]);
            },
            other => panic!("expected updatePlayers, got {other:?}"),
        }
        assert_eq!(driver.connections_in_room("R1").collect::<Vec<_>>(), vec![ALICE]);
    }

    #[test]
    fn non_owner_commands_are_silent() {
        let mut driver = driver();
        send(&mut driver, ALICE, join("R1", "Alice", true));
        send(&mut driver, BOB, join("R1", "Bob", false));

        let set = ClientMessage::SetTimerLimit { room_id: "R1".into(), limit: 3.into() };
        let start = ClientMessage::StartTimer("R1".into());
        let kick = ClientMessage::KickPlayer { room_id: "R1".into(), player_id: ALICE };

        for request in [set, start, kick] {
            assert!(visible(send(&mut driver, BOB, request)).is_empty());
        }

        let session = driver.sessions().get("R1").unwrap();
        assert_eq!(session.time_limit(), 10);
        assert!(!session.is_timer_active());
        assert_eq!(session.roster().len(), 2);
    }

    #[test]
    fn malformed_limit_falls_back_to_default() {
        let config = DriverConfig { default_time_limit: 12, ..Default::default() };
        let mut driver = driver_with(config);
        send(&mut driver, ALICE, join("R1", "Alice", true));

        let set = ClientMessage::SetTimerLimit { room_id: "R1".into(), limit: "soon".into() };
        let actions = visible(send(&mut driver, ALICE, set));

        assert_eq!(actions, vec![ServerAction::BroadcastToRoom {
            room_id: "R1".into(),
            message: ServerMessage::LimitUpdated(12),
        }]);
    }

    #[test]
    fn roster_updates_hide_choices_mid_round() {
        let mut driver = driver();
        send(&mut driver, ALICE, join("R1", "Alice", true));
        send(&mut driver, BOB, join("R1", "Bob", false));
        send(&mut driver, ALICE, ClientMessage::StartTimer("R1".into()));
        send(&mut driver, BOB, ClientMessage::MakeChoice {
            room_id: "R1".into(),
            choice: "7".into(),
        });

        let actions = visible(send(&mut driver, CAROL, join("R1", "Carol", false)));

        match &actions[0] {
            ServerAction::BroadcastToRoom { message: ServerMessage::UpdatePlayers(p), .. } => {
                assert!(p.iter().all(|v| v.choice.is_none()));
            },
            other => panic!("expected updatePlayers, got {other:?}"),
        }
    }

    #[test]
    fn restart_replaces_running_countdown() {
        let mut driver = driver();
        send(&mut driver, ALICE, join("R1", "Alice", true));
        send(&mut driver, ALICE, ClientMessage::SetTimerLimit {
            room_id: "R1".into(),
            limit: 3.into(),
        });
        send(&mut driver, ALICE, ClientMessage::StartTimer("R1".into()));
        tick(&mut driver, 2);
        send(&mut driver, ALICE, ClientMessage::StartTimer("R1".into()));

        assert!(tick(&mut driver, 2).is_empty());
        assert_eq!(tick(&mut driver, 1).len(), 1);
        assert!(tick(&mut driver, 5).is_empty());
    }

    #[test]
    fn round_started_just_before_a_tick_lasts_its_limit() {
        let mut driver = driver();
        send(&mut driver, ALICE, join("R1", "Alice", true));
        send(&mut driver, ALICE, ClientMessage::SetTimerLimit {
            room_id: "R1".into(),
            limit: 2.into(),
        });

        driver.env.advance(Duration::from_millis(1900));
        send(&mut driver, ALICE, ClientMessage::StartTimer("R1".into()));

        // Ticks at 2s, 3s: the round started at 1.9s is still running.
        assert!(tick_after(&mut driver, Duration::from_millis(100)).is_empty());
        assert!(tick(&mut driver, 1).is_empty());
        assert!(tick_after(&mut driver, Duration::from_millis(800)).is_empty());

        // 3.9s: exactly two seconds in.
        let reveal = tick_after(&mut driver, Duration::from_millis(100));
        assert!(matches!(
            reveal.as_slice(),
            [ServerAction::BroadcastToRoom { message: ServerMessage::Reveal(_), .. }]
        ));
    }

    #[test]
    fn rejoin_keeps_slot_and_choice() {
        let mut driver = driver();
        send(&mut driver, ALICE, join("R1", "Alice", true));
        send(&mut driver, BOB, join("R1", "Bob", false));
        send(&mut driver, ALICE, ClientMessage::StartTimer("R1".into()));
        send(&mut driver, BOB, ClientMessage::MakeChoice {
            room_id: "R1".into(),
            choice: "3".into(),
        });

        send(&mut driver, CAROL, join("R1", "Bob", false));

        let roster = driver.sessions().get("R1").unwrap().roster();
        assert_eq!(roster.len(), 2);
        let bob = roster.find_by_name("Bob").unwrap();
        assert_eq!(bob.connection_id, CAROL);
        assert_eq!(bob.choice.as_deref(), Some("3"));
    }

    #[test]
    fn leave_then_empty_room_is_evicted() {
        let mut driver = driver();
        send(&mut driver, ALICE, join("R1", "Alice", true));
        send(&mut driver, BOB, join("R1", "Bob", false));

        let actions = visible(send(&mut driver, BOB, ClientMessage::LeaveSession("R1".into())));
        match actions.as_slice() {
            [ServerAction::BroadcastToRoom { message: ServerMessage::UpdatePlayers(p), .. }] => {
                assert_eq!(names(p), vec![("Alice", None)]);
            },
            other => panic!("expected updatePlayers, got {other:?}"),
        }
        assert!(driver.connections_in_room("R1").all(|c| c != BOB));

        send(&mut driver, ALICE, ClientMessage::LeaveSession("R1".into()));

        assert!(!driver.sessions().contains("R1"));
        let late = visible(send(&mut driver, BOB, join("R1", "Bob", false)));
        assert_eq!(late, vec![ServerAction::SendToConnection {
            connection_id: BOB,
            message: ServerMessage::ErrorMsg("Session does not exist.".into()),
        }]);
    }

    #[test]
    fn leave_unknown_room_is_noop() {
        let mut driver = driver();

        assert!(visible(send(&mut driver, ALICE, ClientMessage::LeaveSession("nope".into())))
            .is_empty());
    }

    #[test]
    fn disconnect_updates_only_joined_rooms() {
        let mut driver = driver();
        send(&mut driver, ALICE, join("R1", "Alice", true));
        send(&mut driver, CAROL, join("R2", "Carol", true));
        send(&mut driver, BOB, join("R1", "Bob", false));

        let actions = visible(
            driver
                .process_event(ServerEvent::ConnectionClosed {
                    connection_id: BOB,
                    reason: "peer closed".into(),
                })
                .unwrap(),
        );

        match actions.as_slice() {
            [ServerAction::BroadcastToRoom { room_id, message: ServerMessage::UpdatePlayers(p) }] => {
                assert_eq!(room_id, "R1");
                assert_eq!(names(p), vec![("Alice", None)]);
            },
            other => panic!("expected one updatePlayers, got {other:?}"),
        }
        assert_eq!(driver.sessions().get("R2").unwrap().roster().len(), 1);
        assert_eq!(driver.connection_count(), 2);
    }

    #[test]
    fn eviction_cancels_pending_reveal() {
        let mut driver = driver();
        send(&mut driver, ALICE, join("R1", "Alice", true));
        send(&mut driver, ALICE, ClientMessage::StartTimer("R1".into()));
        driver
            .process_event(ServerEvent::ConnectionClosed {
                connection_id: ALICE,
                reason: "peer closed".into(),
            })
            .unwrap();

        assert!(!driver.sessions().contains("R1"));
        assert!(tick(&mut driver, 20).is_empty());
    }

    #[test]
    fn token_policy_rejects_hijack() {
        let config = DriverConfig { owner_claim: OwnerClaimPolicy::Token, ..Default::default() };
        let mut driver = driver_with(config);

        let actions = visible(send(&mut driver, ALICE, join("R1", "Alice", true)));
        let token = match &actions[1] {
            ServerAction::SendToConnection {
                message: ServerMessage::Joined { owner_token: Some(token), .. },
                ..
            } => *token,
            other => panic!("expected joined with token, got {other:?}"),
        };

        let hijack = visible(send(&mut driver, BOB, join("R1", "Bob", true)));
        assert_eq!(hijack, vec![ServerAction::SendToConnection {
            connection_id: BOB,
            message: ServerMessage::ErrorMsg("Ownership claim rejected.".into()),
        }]);
        assert_eq!(driver.sessions().get("R1").unwrap().owner(), ALICE);

        let reclaim = ClientMessage::JoinSession {
            room_id: "R1".into(),
            name: "Alice".into(),
            is_owner: true,
            owner_token: Some(token),
        };
        send(&mut driver, CAROL, reclaim);
        assert_eq!(driver.sessions().get("R1").unwrap().owner(), CAROL);
    }

    #[test]
    fn open_policy_lets_latest_claim_win() {
        let mut driver = driver();
        send(&mut driver, ALICE, join("R1", "Alice", true));
        send(&mut driver, BOB, join("R1", "Bob", true));

        assert_eq!(driver.sessions().get("R1").unwrap().owner(), BOB);
        assert!(visible(send(&mut driver, ALICE, ClientMessage::StartTimer("R1".into())))
            .is_empty());
    }
}
