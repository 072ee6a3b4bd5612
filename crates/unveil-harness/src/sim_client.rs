//! Protocol client for simulated tests.

use std::{io, time::Duration};

use turmoil::net::TcpStream;
use unveil_proto::{ClientMessage, ServerMessage, WireMessage};
use unveil_server::{read_frame, write_frame};

/// One client connection speaking framed CBOR.
pub struct SimClient {
    stream: TcpStream,
}

impl SimClient {
    /// Connect to `address` (e.g. `"server:3000"`).
    pub async fn connect(address: &str) -> io::Result<Self> {
        Ok(Self { stream: TcpStream::connect(address).await? })
    }

    /// Send one request.
    pub async fn send(&mut self, message: &ClientMessage) -> io::Result<()> {
        let frame = message.to_frame().map_err(io::Error::other)?;
        write_frame(&mut self.stream, &frame).await.map_err(io::Error::other)
    }

    /// Wait for the next event.
    pub async fn recv(&mut self) -> io::Result<ServerMessage> {
        let frame = read_frame(&mut self.stream)
            .await
            .map_err(io::Error::other)?
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        ServerMessage::from_frame(&frame).map_err(io::Error::other)
    }

    /// Wait up to `timeout` of simulated time for an event.
    ///
    /// A timeout that fires mid-frame leaves the stream out of sync, so use
    /// this to assert silence rather than to poll.
    pub async fn recv_within(&mut self, timeout: Duration) -> io::Result<Option<ServerMessage>> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Join a room.
    pub async fn join(&mut self, room_id: &str, name: &str, is_owner: bool) -> io::Result<()> {
        self.send(&ClientMessage::JoinSession {
            room_id: room_id.to_string(),
            name: name.to_string(),
            is_owner,
            owner_token: None,
        })
        .await
    }
}
