use std::io;
use std::net::SocketAddr;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use super::{Framer, Framing, MessageWriter};
use crate::domain::models::ConnectionId;

/// Whether an endpoint keeps the inbound half of its socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointMode {
    /// Outbound messages only; the read half is kept to notice the peer
    /// hanging up, and anything it sends is discarded.
    WriteOnly,
    /// Outbound messages plus a framer over the read half.
    ReadWrite,
}

/// One side's live socket together with its paired writer and (optionally) framer.
///
/// Created once per successful handshake. Dropping it closes the socket;
/// [`ConnectionEndpoint::close`] additionally shuts down the write direction
/// so the peer observes end of stream promptly.
pub struct ConnectionEndpoint {
    connection_id: ConnectionId,
    peer_addr: Option<SocketAddr>,
    writer: MessageWriter<OwnedWriteHalf>,
    framer: Option<Framer<OwnedReadHalf>>,
    hangup: Option<OwnedReadHalf>,
}

impl ConnectionEndpoint {
    /// Wraps an already established stream.
    pub fn from_stream(
        stream: TcpStream,
        connection_id: ConnectionId,
        framing: Framing,
        mode: EndpointMode,
    ) -> Self {
        // Messages are small and latency matters more than packet count.
        if let Err(err) = stream.set_nodelay(true) {
            tracing::debug!(connection_id = %connection_id, error = %err, "Could not disable Nagle");
        }
        let peer_addr = stream.peer_addr().ok();
        let (read_half, write_half) = stream.into_split();
        let (framer, hangup) = match mode {
            EndpointMode::ReadWrite => (Some(Framer::new(read_half, framing)), None),
            EndpointMode::WriteOnly => (None, Some(read_half)),
        };

        Self {
            connection_id,
            peer_addr,
            writer: MessageWriter::new(write_half, framing.delimiter),
            framer,
            hangup,
        }
    }

    /// Client handshake: one outbound connect attempt.
    pub async fn connect(
        address: &str,
        connection_id: ConnectionId,
        framing: Framing,
        mode: EndpointMode,
    ) -> io::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        Ok(Self::from_stream(stream, connection_id, framing, mode))
    }

    /// Server handshake: waits for one inbound connection.
    ///
    /// Server-side endpoints always read: the receiver's job is to pull.
    pub async fn accept(
        listener: &TcpListener,
        connection_id: ConnectionId,
        framing: Framing,
    ) -> io::Result<Self> {
        let (stream, _) = listener.accept().await?;
        Ok(Self::from_stream(
            stream,
            connection_id,
            framing,
            EndpointMode::ReadWrite,
        ))
    }

    /// Id of the logical connection this socket serves.
    pub const fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Remote address, when the OS reported one.
    pub const fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// `ReadWrite` while the endpoint still owns its framer.
    pub const fn mode(&self) -> EndpointMode {
        if self.framer.is_some() {
            EndpointMode::ReadWrite
        } else {
            EndpointMode::WriteOnly
        }
    }

    /// Moves the framer out, leaving a write-only endpoint behind.
    pub fn take_framer(&mut self) -> Option<Framer<OwnedReadHalf>> {
        self.framer.take()
    }

    /// See [`MessageWriter::send`].
    pub async fn send(&mut self, message: &str) -> io::Result<()> {
        self.writer.send(message).await
    }

    /// Resolves with the reason once a write-only endpoint's peer hangs up.
    ///
    /// Never resolves for endpoints without a hangup watch (read-write
    /// endpoints, or ones whose framer was taken). Cancel safe.
    pub async fn hangup(&mut self) -> io::Error {
        let Some(read_half) = self.hangup.as_mut() else {
            return std::future::pending().await;
        };

        let mut discard = [0u8; 256];
        loop {
            match read_half.read(&mut discard).await {
                Ok(0) => {
                    return io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "peer closed the connection",
                    )
                }
                Ok(_) => {}
                Err(err) => return err,
            }
        }
    }

    /// See [`Framer::pull`].
    pub fn pull(&mut self) -> io::Result<Vec<String>> {
        match self.framer.as_mut() {
            Some(framer) => framer.pull(),
            None => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "endpoint has no inbound framer",
            )),
        }
    }

    /// Shuts down the write direction and releases the socket.
    pub async fn close(mut self) {
        if let Err(err) = self.writer.shutdown().await {
            tracing::debug!(
                connection_id = %self.connection_id,
                error = %err,
                "Socket shutdown failed, dropping it anyway"
            );
        }
    }
}

impl std::fmt::Debug for ConnectionEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionEndpoint")
            .field("connection_id", &self.connection_id)
            .field("peer_addr", &self.peer_addr)
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}
