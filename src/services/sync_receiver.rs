//! Server side of a point-to-point connection, driven by the caller.

use std::net::SocketAddr;
use tokio::sync::watch;

use crate::domain::errors::{MessagingError, MessagingResult};
use crate::domain::models::{ConnectionId, ConnectionState, TransportConfig};
use crate::infrastructure::transport::{
    connect_with_retry, ConnectOutcome, ConnectionEndpoint, EndpointFactory, Framing,
    RetryPolicy, TcpAcceptor,
};

/// Accepts one peer and lets the caller poll it for messages.
///
/// There is no background task: [`listen`](Self::listen) waits for a peer
/// on the calling task and [`receive`](Self::receive) never waits at all.
/// Both take `&mut self`, so only one caller can read at a time.
pub struct SyncReceiver {
    connection_id: ConnectionId,
    acceptor: TcpAcceptor,
    policy: RetryPolicy,
    endpoint: Option<ConnectionEndpoint>,
    state: ConnectionState,
}

impl SyncReceiver {
    /// Receiver that will listen on `bind_address` (`host:port`, port 0 picks
    /// a free one). Nothing is bound until [`listen`](Self::listen).
    pub fn new(
        bind_address: impl Into<String>,
        connection_id: ConnectionId,
        transport: &TransportConfig,
    ) -> Self {
        Self {
            connection_id,
            acceptor: TcpAcceptor::new(bind_address, connection_id, Framing::from(transport)),
            policy: RetryPolicy::from(transport),
            endpoint: None,
            state: ConnectionState::Disconnected,
        }
    }

    /// Binds the listening socket without waiting for a peer, so the caller
    /// can learn the port before anyone connects.
    pub async fn bind(&self) -> MessagingResult<SocketAddr> {
        if self.state == ConnectionState::Closed {
            return Err(MessagingError::ShutDown);
        }
        Ok(self.acceptor.bind().await?)
    }

    /// Waits until a peer connects or the connect timeout elapses.
    ///
    /// After the peer goes away (`receive` failed) this may be called again
    /// to wait for a new one.
    ///
    /// # Errors
    ///
    /// `AlreadyStarted` while a peer is attached, `TimedOut` when no peer
    /// came in time (terminal), `ShutDown` after [`close`](Self::close).
    pub async fn listen(&mut self) -> MessagingResult<()> {
        match self.state {
            ConnectionState::Closed => return Err(MessagingError::ShutDown),
            ConnectionState::TimedOut => return Err(MessagingError::TimedOut(self.connection_id)),
            ConnectionState::Connected => return Err(MessagingError::AlreadyStarted),
            ConnectionState::Disconnected | ConnectionState::Connecting => {}
        }

        self.state = ConnectionState::Connecting;
        tracing::debug!(connection_id = %self.connection_id, "Waiting for peer");

        // Never signalled: listen is cancelled by dropping its future.
        let (_shutdown_tx, mut shutdown) = watch::channel(false);
        match connect_with_retry(&self.acceptor, self.policy, &mut shutdown).await {
            ConnectOutcome::Connected(endpoint) => {
                tracing::info!(
                    connection_id = %self.connection_id,
                    peer = ?endpoint.peer_addr(),
                    "Peer connected"
                );
                self.endpoint = Some(endpoint);
                self.state = ConnectionState::Connected;
                Ok(())
            }
            ConnectOutcome::TimedOut => {
                self.acceptor.release();
                self.state = ConnectionState::TimedOut;
                tracing::warn!(
                    connection_id = %self.connection_id,
                    timeout = ?self.policy.timeout,
                    "No peer connected in time"
                );
                Err(MessagingError::TimedOut(self.connection_id))
            }
            ConnectOutcome::Cancelled => {
                self.state = ConnectionState::Disconnected;
                Err(MessagingError::ShutDown)
            }
        }
    }

    /// Non-blocking read of complete messages.
    ///
    /// # Errors
    ///
    /// `NotConnected` unless a peer is attached. An I/O error (including the
    /// peer closing the connection) detaches the peer and moves the receiver
    /// to `Disconnected`.
    pub fn receive(&mut self) -> MessagingResult<Vec<String>> {
        let endpoint = self.connected_endpoint()?;
        match endpoint.pull() {
            Ok(messages) => Ok(messages),
            Err(err) => {
                self.detach(&err);
                Err(err.into())
            }
        }
    }

    /// Writes `message` back to the attached peer, delimiter appended.
    ///
    /// Failures are returned immediately; nothing is retried.
    pub async fn send_reply(&mut self, message: &str) -> MessagingResult<()> {
        let endpoint = self.connected_endpoint()?;
        match endpoint.send(message).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.detach(&err);
                Err(err.into())
            }
        }
    }

    /// Closes the peer connection and the listening socket. Final.
    pub async fn close(&mut self) {
        if let Some(endpoint) = self.endpoint.take() {
            endpoint.close().await;
        }
        self.acceptor.release();
        if self.state != ConnectionState::Closed {
            tracing::info!(connection_id = %self.connection_id, "Receiver closed");
        }
        self.state = ConnectionState::Closed;
    }

    /// Current state of the receiving endpoint.
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Id reported to the listener with every event.
    pub const fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Address of the listening socket once bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.acceptor.local_addr()
    }

    fn connected_endpoint(&mut self) -> MessagingResult<&mut ConnectionEndpoint> {
        match self.state {
            ConnectionState::Closed => Err(MessagingError::ShutDown),
            ConnectionState::Connected => self.endpoint.as_mut().ok_or(MessagingError::NotConnected),
            _ => Err(MessagingError::NotConnected),
        }
    }

    fn detach(&mut self, cause: &std::io::Error) {
        self.endpoint = None;
        self.state = ConnectionState::Disconnected;
        tracing::warn!(
            connection_id = %self.connection_id,
            error = %cause,
            "Peer connection lost"
        );
    }
}

impl std::fmt::Debug for SyncReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncReceiver")
            .field("connection_id", &self.connection_id)
            .field("state", &self.state)
            .field("local_addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}
