//! Endpoint factories: the handshake half of the connection state machine.
//!
//! The reconnect loop does not know whether it is dialling out or waiting
//! for a peer. It asks an [`EndpointFactory`] for one handshake attempt at a
//! time, which keeps the retry and timeout policy identical for clients and
//! servers.
//!
//! - [`TcpConnector`]: outbound connect, write-only endpoints by default
//! - [`DuplexConnector`]: outbound connect whose read side is published into
//!   an [`InboundSlot`] so another caller can pull from the same socket
//! - [`TcpAcceptor`]: binds lazily and accepts one inbound connection

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::task::{Context, Poll};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::{ConnectionEndpoint, EndpointMode, Framer, Framing};
use crate::domain::errors::MessagingResult;
use crate::domain::models::ConnectionId;

/// Produces connection endpoints, one handshake attempt per call.
#[async_trait]
pub trait EndpointFactory: Send + Sync {
    /// Performs a single handshake attempt.
    async fn open(&self) -> io::Result<ConnectionEndpoint>;

    /// Resolves once the endpoint most recently produced is known to be dead
    /// through a path other than its writer (for example a failed read).
    ///
    /// The default never resolves.
    async fn lost(&self) {
        std::future::pending::<()>().await;
    }

    /// Drops any per-socket state the factory keeps outside the endpoint.
    fn release(&self) {}
}

/// Dials `address` for every attempt.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
    connection_id: ConnectionId,
    framing: Framing,
    mode: EndpointMode,
}

impl TcpConnector {
    /// Connector producing write-only endpoints.
    pub fn new(address: impl Into<String>, connection_id: ConnectionId, framing: Framing) -> Self {
        Self {
            address: address.into(),
            connection_id,
            framing,
            mode: EndpointMode::WriteOnly,
        }
    }

    /// Overrides which halves the produced endpoints keep.
    #[must_use]
    pub fn with_mode(mut self, mode: EndpointMode) -> Self {
        self.mode = mode;
        self
    }

    /// The `host:port` dialled on every attempt.
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl EndpointFactory for TcpConnector {
    async fn open(&self) -> io::Result<ConnectionEndpoint> {
        ConnectionEndpoint::connect(&self.address, self.connection_id, self.framing, self.mode).await
    }
}

/// The read side of a duplex connection, shared between the sending worker
/// (which installs a fresh framer per socket) and the receiving caller.
#[derive(Default)]
pub struct InboundSlot {
    framer: Mutex<Option<Framer<OwnedReadHalf>>>,
    read_failed: Notify,
}

impl InboundSlot {
    /// An empty slot; nothing can be pulled until a framer is installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current framer, discarding any partial message it held.
    pub fn install(&self, framer: Framer<OwnedReadHalf>) {
        match self.framer.lock() {
            Ok(mut slot) => *slot = Some(framer),
            Err(poisoned) => *poisoned.into_inner() = Some(framer),
        }
    }

    /// Drops the installed framer together with its socket.
    pub fn clear(&self) {
        match self.framer.lock() {
            Ok(mut slot) => *slot = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    /// True while a framer for a live socket is installed.
    pub fn is_live(&self) -> bool {
        self.framer.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Pulls from the installed framer.
    ///
    /// Returns an empty vector while no connection is installed. A read
    /// failure removes the framer and wakes whoever waits in
    /// [`InboundSlot::failed`].
    pub fn pull(&self) -> MessagingResult<Vec<String>> {
        let mut slot = self.framer.lock()?;
        let Some(framer) = slot.as_mut() else {
            return Ok(Vec::new());
        };

        match framer.pull() {
            Ok(messages) => Ok(messages),
            Err(err) => {
                *slot = None;
                drop(slot);
                self.read_failed.notify_one();
                Err(err.into())
            }
        }
    }

    /// Resolves once a read failure has removed the installed framer.
    pub async fn failed(&self) {
        loop {
            self.read_failed.notified().await;
            if !self.is_live() {
                return;
            }
            // Stale signal from an earlier socket.
        }
    }

    /// Resolves once the installed socket's peer hangs up, whether or not
    /// anybody pulls.
    ///
    /// Data that arrives first is kept in the framer for the next
    /// [`InboundSlot::pull`]. Stays pending while no framer is installed.
    pub async fn closed(&self) -> io::Error {
        std::future::poll_fn(|cx| self.poll_closed(cx)).await
    }

    fn poll_closed(&self, cx: &mut Context<'_>) -> Poll<io::Error> {
        let Ok(mut slot) = self.framer.lock() else {
            return Poll::Pending;
        };
        slot.as_mut()
            .map_or(Poll::Pending, |framer| framer.poll_closed(cx))
    }
}

impl std::fmt::Debug for InboundSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundSlot")
            .field("live", &self.is_live())
            .finish()
    }
}

/// Outbound connector that keeps the inbound half for a separate reader.
pub struct DuplexConnector {
    connector: TcpConnector,
    inbound: std::sync::Arc<InboundSlot>,
}

impl DuplexConnector {
    /// Connector dialling `address` whose read sides are published into
    /// `inbound`.
    pub fn new(
        address: impl Into<String>,
        connection_id: ConnectionId,
        framing: Framing,
        inbound: std::sync::Arc<InboundSlot>,
    ) -> Self {
        Self {
            connector: TcpConnector::new(address, connection_id, framing)
                .with_mode(EndpointMode::ReadWrite),
            inbound,
        }
    }
}

#[async_trait]
impl EndpointFactory for DuplexConnector {
    async fn open(&self) -> io::Result<ConnectionEndpoint> {
        let mut endpoint = self.connector.open().await?;
        if let Some(framer) = endpoint.take_framer() {
            self.inbound.install(framer);
        }
        Ok(endpoint)
    }

    async fn lost(&self) {
        tokio::select! {
            () = self.inbound.failed() => {}
            err = self.inbound.closed() => {
                tracing::debug!(
                    connection_id = %self.connector.connection_id,
                    error = %err,
                    "Peer hung up on duplex connection"
                );
            }
        }
    }

    fn release(&self) {
        self.inbound.clear();
    }
}

/// Accepts one inbound connection per attempt.
///
/// The listening socket is bound on the first attempt and kept until
/// [`EndpointFactory::release`]; a failed bind (port still in use) is an
/// ordinary failed attempt and is retried by the reconnect loop.
pub struct TcpAcceptor {
    bind_address: String,
    connection_id: ConnectionId,
    framing: Framing,
    listener: tokio::sync::Mutex<Option<TcpListener>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl TcpAcceptor {
    /// Acceptor for `bind_address`; nothing is bound until the first attempt
    /// or [`TcpAcceptor::bind`].
    pub fn new(bind_address: impl Into<String>, connection_id: ConnectionId, framing: Framing) -> Self {
        Self {
            bind_address: bind_address.into(),
            connection_id,
            framing,
            listener: tokio::sync::Mutex::new(None),
            local_addr: Mutex::new(None),
        }
    }

    /// Address the listening socket is bound to, once bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.lock().ok().and_then(|addr| *addr)
    }

    /// Binds the listening socket now rather than on the first attempt.
    pub async fn bind(&self) -> io::Result<SocketAddr> {
        let mut listener = self.listener.lock().await;
        self.bind_locked(&mut listener).await
    }

    async fn bind_locked(&self, listener: &mut Option<TcpListener>) -> io::Result<SocketAddr> {
        if let Some(bound) = listener.as_ref() {
            return bound.local_addr();
        }

        let bound = TcpListener::bind(&self.bind_address).await?;
        let addr = bound.local_addr()?;
        if let Ok(mut local) = self.local_addr.lock() {
            *local = Some(addr);
        }
        tracing::debug!(
            connection_id = %self.connection_id,
            local_addr = %addr,
            "Listening for peer"
        );
        *listener = Some(bound);
        Ok(addr)
    }
}

#[async_trait]
impl EndpointFactory for TcpAcceptor {
    async fn open(&self) -> io::Result<ConnectionEndpoint> {
        let mut listener = self.listener.lock().await;
        self.bind_locked(&mut listener).await?;
        match listener.as_ref() {
            Some(bound) => ConnectionEndpoint::accept(bound, self.connection_id, self.framing).await,
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "listener not bound")),
        }
    }

    fn release(&self) {
        if let Ok(mut listener) = self.listener.try_lock() {
            *listener = None;
        }
        if let Ok(mut local) = self.local_addr.lock() {
            *local = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_tcp_connector_produces_write_only_endpoints() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let connector = TcpConnector::new(address, ConnectionId(1), Framing::default());

        let endpoint = connector.open().await.unwrap();
        assert_eq!(endpoint.mode(), EndpointMode::WriteOnly);
        assert_eq!(endpoint.connection_id(), ConnectionId(1));
    }

    #[tokio::test]
    async fn test_duplex_connector_installs_framer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let inbound = Arc::new(InboundSlot::new());
        let connector =
            DuplexConnector::new(address, ConnectionId(1), Framing::new(32, '¬'), inbound.clone());

        assert!(!inbound.is_live());
        assert!(inbound.pull().unwrap().is_empty());

        let endpoint = connector.open().await.unwrap();
        assert_eq!(endpoint.mode(), EndpointMode::WriteOnly);
        assert!(inbound.is_live());

        let (mut peer, _) = listener.accept().await.unwrap();
        peer.write_all("reply¬".as_bytes()).await.unwrap();

        let mut received = Vec::new();
        for _ in 0..200 {
            received.extend(inbound.pull().unwrap());
            if !received.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(received, vec!["reply".to_string()]);

        connector.release();
        assert!(!inbound.is_live());
    }

    #[tokio::test]
    async fn test_inbound_read_failure_wakes_lost() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let inbound = Arc::new(InboundSlot::new());
        let connector =
            DuplexConnector::new(address, ConnectionId(1), Framing::default(), inbound.clone());

        let _endpoint = connector.open().await.unwrap();
        let (peer, _) = listener.accept().await.unwrap();
        drop(peer);

        let mut failed = false;
        for _ in 0..200 {
            if inbound.pull().is_err() {
                failed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(failed, "read on a closed socket should fail");
        assert!(!inbound.is_live());

        tokio::time::timeout(Duration::from_secs(1), connector.lost())
            .await
            .expect("lost() should resolve after a read failure");
    }

    #[tokio::test]
    async fn test_peer_hangup_wakes_lost_without_pull() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let inbound = Arc::new(InboundSlot::new());
        let connector =
            DuplexConnector::new(address, ConnectionId(1), Framing::default(), inbound.clone());

        let _endpoint = connector.open().await.unwrap();
        let (mut peer, _) = listener.accept().await.unwrap();
        peer.write_all("last words¬".as_bytes()).await.unwrap();
        drop(peer);

        tokio::time::timeout(Duration::from_secs(1), connector.lost())
            .await
            .expect("lost() should resolve once the peer hangs up");

        // The watch buffered the reply instead of discarding it.
        assert_eq!(inbound.pull().unwrap(), vec!["last words".to_string()]);
        assert!(inbound.pull().is_err());
    }

    #[tokio::test]
    async fn test_closed_pending_while_peer_is_connected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let inbound = Arc::new(InboundSlot::new());
        let connector =
            DuplexConnector::new(address, ConnectionId(1), Framing::default(), inbound.clone());

        let _endpoint = connector.open().await.unwrap();
        let (_peer, _) = listener.accept().await.unwrap();

        let waited = tokio::time::timeout(Duration::from_millis(100), inbound.closed()).await;
        assert!(waited.is_err(), "a connected peer has not hung up");
        assert!(inbound.is_live());
    }

    #[tokio::test]
    async fn test_acceptor_binds_lazily_and_releases() {
        let acceptor = TcpAcceptor::new("127.0.0.1:0", ConnectionId(5), Framing::default());
        assert!(acceptor.local_addr().is_none());

        let addr = acceptor.bind().await.unwrap();
        assert_eq!(acceptor.local_addr(), Some(addr));

        let dial = tokio::spawn(async move { tokio::net::TcpStream::connect(addr).await });
        let endpoint = acceptor.open().await.unwrap();
        assert_eq!(endpoint.mode(), EndpointMode::ReadWrite);
        assert_eq!(endpoint.connection_id(), ConnectionId(5));
        dial.await.unwrap().unwrap();

        acceptor.release();
        assert!(acceptor.local_addr().is_none());
    }
}
