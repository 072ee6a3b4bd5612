//! Stream transport.
//!
//! Frames travel back to back over a reliable byte stream. A reader pulls the
//! fixed-size header first, validates it, then reads exactly the payload the
//! header announces, so a hostile length can never trigger an oversized
//! allocation.
//!
//! [`Listener`] abstracts the accept loop so the same runtime runs over Tokio
//! TCP in production and over simulated TCP in tests.

use std::{future::Future, io, net::SocketAddr};

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use unveil_proto::{Frame, FrameHeader};

use crate::error::RuntimeError;

/// Source of inbound stream connections.
///
/// Only the accepted streams cross task boundaries; the accept loop itself
/// stays on the task that called [`Server::run`](crate::Server::run).
pub trait Listener: 'static {
    /// Byte stream of one accepted connection.
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Wait for the next connection.
    fn accept(&self) -> impl Future<Output = io::Result<(Self::Stream, SocketAddr)>>;

    /// Address the listener is bound to.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl Listener for tokio::net::TcpListener {
    type Stream = tokio::net::TcpStream;

    fn accept(&self) -> impl Future<Output = io::Result<(Self::Stream, SocketAddr)>> {
        tokio::net::TcpListener::accept(self)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        tokio::net::TcpListener::local_addr(self)
    }
}

/// Bind a Tokio TCP listener.
pub async fn bind_tcp(address: &str) -> Result<tokio::net::TcpListener, RuntimeError> {
    let addr: SocketAddr = address
        .parse()
        .map_err(|e| RuntimeError::Config(format!("invalid bind address '{address}': {e}")))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| RuntimeError::Transport(format!("failed to bind {addr}: {e}")))?;

    tracing::info!("TCP transport bound to {}", addr);
    Ok(listener)
}

/// Read one frame.
///
/// Returns `Ok(None)` when the peer closes cleanly between frames.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>, RuntimeError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::zeroed(FrameHeader::SIZE);

    match reader.read_exact(&mut buf[..]).await {
        Ok(_) => {},
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let payload_size = FrameHeader::from_bytes(&buf)?.payload_size() as usize;

    buf.resize(FrameHeader::SIZE + payload_size, 0);
    reader.read_exact(&mut buf[FrameHeader::SIZE..]).await?;

    Ok(Some(Frame::decode(&buf)?))
}

/// Write one frame and flush.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), RuntimeError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&frame.to_vec()).await?;
    writer.flush().await?;
    Ok(())
}
