//! Simulated server host.
//!
//! Runs the production [`Server`] runtime unchanged; only the listener and the
//! environment are swapped for their turmoil counterparts.

use std::{future::Future, io, net::SocketAddr};

use turmoil::net::{TcpListener, TcpStream};
use unveil_server::{Listener, Server, ServerRuntimeConfig};

use crate::SimEnv;

/// Turmoil TCP listener usable by [`Server`].
pub struct SimListener(TcpListener);

impl SimListener {
    /// Bind a simulated TCP listener.
    pub async fn bind(address: &str) -> io::Result<Self> {
        Ok(Self(TcpListener::bind(address).await?))
    }
}

impl Listener for SimListener {
    type Stream = TcpStream;

    fn accept(&self) -> impl Future<Output = io::Result<(Self::Stream, SocketAddr)>> {
        self.0.accept()
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.0.local_addr()
    }
}

/// Bind `config.bind_address` in the current turmoil host and serve forever.
///
/// Meant to be the body of a `sim.host(..)` closure.
pub async fn run_sim_server(
    config: ServerRuntimeConfig,
    seed: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = SimListener::bind(&config.bind_address).await?;
    let server = Server::new(SimEnv::with_seed(seed), listener, &config)?;

    tracing::info!("simulated server listening on {}", server.local_addr()?);
    server.run().await?;

    Ok(())
}
