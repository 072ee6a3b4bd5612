//! Unveil production server.
//!
//! # Architecture
//!
//! The [`ServerDriver`] follows the Sans-IO pattern: it turns connection
//! events and countdown ticks into actions without touching the network.
//! [`Server`] executes those actions over any [`Listener`]: Tokio TCP in
//! production, simulated TCP in the test harness.
//!
//! # Components
//!
//! - [`ServerDriver`]: Action-based event router (pure logic, no I/O)
//! - [`ConnectionRegistry`]: Room subscriptions used for broadcast
//! - [`Server`]: Runtime that executes driver actions
//! - [`SystemEnv`]: Production environment (real time, OS RNG)
//!
//! # Concurrency
//!
//! Each connection gets a reader task and a writer task fed by an unbounded
//! channel. A single tick task delivers [`ServerEvent::Tick`] every
//! `tick_interval`; rounds end on absolute deadlines, so the interval only
//! bounds how late a reveal can land. Every event is processed and its actions executed under
//! one lock, so a broadcast always reaches exactly the room membership left
//! by the event that produced it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod driver;
mod error;
mod registry;
mod server_error;
mod system_env;
mod transport;

use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use bytes::Bytes;
pub use config::{DriverConfig, ServerRuntimeConfig};
pub use driver::{LogLevel, ServerAction, ServerDriver, ServerEvent};
pub use error::RuntimeError;
pub use registry::ConnectionRegistry;
pub use server_error::ServerError;
pub use system_env::SystemEnv;
use tokio::{
    io::AsyncWriteExt,
    sync::{Mutex, mpsc},
    time::MissedTickBehavior,
};
pub use transport::{Listener, bind_tcp, read_frame, write_frame};
use unveil_core::Environment;
use unveil_proto::{ConnectionId, ServerMessage, WireMessage};

/// Driver plus the outbound half of every live connection.
struct SharedState<E: Environment> {
    driver: ServerDriver<E>,
    /// Connection ID → queue drained by that connection's writer task
    outbound: HashMap<ConnectionId, mpsc::UnboundedSender<Bytes>>,
}

type Shared<E> = Arc<Mutex<SharedState<E>>>;

/// Unveil server runtime.
///
/// Wraps [`ServerDriver`] with a stream listener and an environment.
pub struct Server<E, L>
where
    E: Environment,
    L: Listener,
{
    /// The action-based server driver
    driver: ServerDriver<E>,
    /// Accepts inbound connections
    listener: L,
    /// Environment
    env: E,
    /// Interval between countdown ticks
    tick_interval: Duration,
}

impl Server<SystemEnv, tokio::net::TcpListener> {
    /// Create and bind a production TCP server.
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, RuntimeError> {
        let listener = bind_tcp(&config.bind_address).await?;
        Self::new(SystemEnv::new(), listener, &config)
    }
}

impl<E, L> Server<E, L>
where
    E: Environment,
    L: Listener,
{
    /// Create a server over an already bound listener.
    pub fn new(env: E, listener: L, config: &ServerRuntimeConfig) -> Result<Self, RuntimeError> {
        if config.tick_interval.is_zero() {
            return Err(RuntimeError::Config("tick interval must be non-zero".to_string()));
        }

        let driver = ServerDriver::new(env.clone(), config.driver);
        Ok(Self { driver, listener, env, tick_interval: config.tick_interval })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, RuntimeError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the server, accepting connections and ticking countdowns.
    ///
    /// Runs until the listener fails permanently.
    pub async fn run(self) -> Result<(), RuntimeError> {
        tracing::info!("Server starting on {}", self.listener.local_addr()?);

        let Self { driver, listener, env, tick_interval } = self;
        let shared: Shared<E> =
            Arc::new(Mutex::new(SharedState { driver, outbound: HashMap::new() }));

        tokio::spawn(run_ticks(Arc::clone(&shared), tick_interval));

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let shared = Arc::clone(&shared);
                    let env = env.clone();

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, shared, env).await {
                            tracing::debug!("Connection error: {}", e);
                        }
                    });
                },
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                },
            }
        }
    }
}

/// Sample the clock once per `period`, forever.
async fn run_ticks<E: Environment>(shared: Shared<E>, period: Duration) {
    let mut ticks = tokio::time::interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticks.tick().await;

        let mut state = shared.lock().await;
        match state.driver.process_event(ServerEvent::Tick) {
            Ok(actions) => state.execute(actions),
            Err(e) => tracing::warn!("Tick processing error: {}", e),
        }
    }
}

/// Serve one connection until either side closes it.
async fn handle_connection<E, S>(
    stream: S,
    peer: SocketAddr,
    shared: Shared<E>,
    env: E,
) -> Result<(), RuntimeError>
where
    E: Environment,
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let (tx, mut rx) = mpsc::unbounded_channel::<Bytes>();

    let connection_id = {
        let mut state = shared.lock().await;
        let connection_id = loop {
            let candidate = env.random_u64();
            if !state.outbound.contains_key(&candidate) {
                break candidate;
            }
        };
        tracing::debug!("New connection {} from {}", connection_id, peer);

        state.outbound.insert(connection_id, tx);
        let actions =
            state.driver.process_event(ServerEvent::ConnectionAccepted { connection_id })?;
        state.execute(actions);

        // Refused at accept time (connection limit): the writer has been
        // released and the reader is dropped on return.
        if !state.outbound.contains_key(&connection_id) {
            return Ok(());
        }
        connection_id
    };

    tokio::spawn(async move {
        while let Some(bytes) = rx.recv().await {
            if let Err(e) = writer.write_all(&bytes).await {
                tracing::debug!("Write to {} failed: {}", connection_id, e);
                return;
            }
        }
        let _ = writer.shutdown().await;
    });

    let reason = loop {
        let frame = match read_frame(&mut reader).await {
            Ok(Some(frame)) => frame,
            Ok(None) => break "peer closed".to_string(),
            Err(e) => break e.to_string(),
        };

        let mut state = shared.lock().await;
        match state.driver.process_event(ServerEvent::FrameReceived { connection_id, frame }) {
            Ok(actions) => state.execute(actions),
            Err(e) => tracing::warn!("Frame processing error: {}", e),
        }
    };

    let mut state = shared.lock().await;
    state.outbound.remove(&connection_id);
    let actions =
        state.driver.process_event(ServerEvent::ConnectionClosed { connection_id, reason })?;
    state.execute(actions);

    Ok(())
}

impl<E: Environment> SharedState<E> {
    /// Execute server actions.
    ///
    /// Writes are queued on per-connection channels, so execution never
    /// blocks on a slow peer.
    fn execute(&mut self, actions: Vec<ServerAction<E::Instant>>) {
        for action in actions {
            match action {
                ServerAction::SendToConnection { connection_id, message } => {
                    if let Some(bytes) = encode(&message) {
                        self.send(connection_id, bytes);
                    }
                },

                ServerAction::BroadcastToRoom { room_id, message } => {
                    let Some(bytes) = encode(&message) else { continue };
                    let targets: Vec<ConnectionId> =
                        self.driver.connections_in_room(&room_id).collect();
                    for connection_id in targets {
                        self.send(connection_id, bytes.clone());
                    }
                },

                ServerAction::CloseConnection { connection_id, reason } => {
                    tracing::info!("Closing connection {}: {}", connection_id, reason);
                    self.outbound.remove(&connection_id);
                },

                ServerAction::Log { level, message, .. } => log(level, &message),
            }
        }
    }

    fn send(&self, connection_id: ConnectionId, bytes: Bytes) {
        match self.outbound.get(&connection_id) {
            Some(tx) => {
                if tx.send(bytes).is_err() {
                    tracing::debug!("Writer for {} already gone", connection_id);
                }
            },
            None => tracing::debug!("Send to unknown connection {}", connection_id),
        }
    }
}

fn encode(message: &ServerMessage) -> Option<Bytes> {
    match message.to_frame() {
        Ok(frame) => Some(Bytes::from(frame.to_vec())),
        Err(e) => {
            tracing::error!("Failed to encode {}: {}", message.name(), e);
            None
        },
    }
}

fn log(level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => tracing::debug!("{}", message),
        LogLevel::Info => tracing::info!("{}", message),
        LogLevel::Warn => tracing::warn!("{}", message),
        LogLevel::Error => tracing::error!("{}", message),
    }
}
