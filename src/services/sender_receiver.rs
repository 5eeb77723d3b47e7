//! Buffered sender that can also read replies from its own connection.

use std::sync::Arc;
use tokio::sync::watch;

use crate::domain::errors::MessagingResult;
use crate::domain::models::{ConnectionId, ConnectionState, TransportConfig};
use crate::domain::ports::ConnectionListener;
use crate::infrastructure::transport::{DuplexConnector, Framing, InboundSlot};
use crate::services::buffered_sender::BufferedSender;

/// A [`BufferedSender`] over a duplex connection.
///
/// Outbound traffic behaves exactly like the plain sender. [`receive`]
/// pulls whatever the peer wrote back on the same socket. The worker watches
/// that socket even while nobody receives, so a peer hanging up is noticed
/// before the next queued message is written to it. A hangup or failed read
/// is treated as connection loss: the worker reconnects and replies not yet
/// received from the previous socket are dropped.
///
/// [`receive`]: BufferedSenderReceiver::receive
#[derive(Debug)]
pub struct BufferedSenderReceiver {
    sender: BufferedSender,
    inbound: Arc<InboundSlot>,
}

impl BufferedSenderReceiver {
    /// Duplex sender dialling `address` (`host:port`).
    pub fn connect_to(
        address: impl Into<String>,
        connection_id: ConnectionId,
        transport: &TransportConfig,
        listener: Arc<dyn ConnectionListener>,
    ) -> Self {
        let inbound = Arc::new(InboundSlot::new());
        let connector = DuplexConnector::new(
            address,
            connection_id,
            Framing::from(transport),
            inbound.clone(),
        );
        let sender =
            BufferedSender::with_factory(Arc::new(connector), connection_id, transport, listener);

        Self { sender, inbound }
    }

    /// See [`BufferedSender::start`].
    pub fn start(&self) -> MessagingResult<()> {
        self.sender.start()
    }

    /// See [`BufferedSender::send`].
    pub async fn send(&self, message: impl Into<String>) -> MessagingResult<()> {
        self.sender.send(message).await
    }

    /// Non-blocking read of complete replies.
    ///
    /// Returns an empty vector while nothing is available or while the
    /// worker is between connections.
    ///
    /// # Errors
    ///
    /// Usage errors as for [`BufferedSender::send`], or the I/O error that
    /// ended the current connection.
    pub fn receive(&self) -> MessagingResult<Vec<String>> {
        self.sender.ensure_accepting()?;
        self.inbound.pull()
    }

    /// See [`BufferedSender::shutdown`].
    pub async fn shutdown(&self) -> MessagingResult<()> {
        self.sender.shutdown().await
    }

    /// See [`BufferedSender::state`].
    pub fn state(&self) -> ConnectionState {
        self.sender.state()
    }

    /// See [`BufferedSender::subscribe_state`].
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.sender.subscribe_state()
    }

    /// See [`BufferedSender::pending`].
    pub fn pending(&self) -> usize {
        self.sender.pending()
    }

    /// Id reported to the listener with every event.
    pub const fn connection_id(&self) -> ConnectionId {
        self.sender.connection_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::MessagingError;
    use crate::domain::ports::NullConnectionListener;

    #[tokio::test]
    async fn test_receive_requires_start() {
        let duplex = BufferedSenderReceiver::connect_to(
            "127.0.0.1:1",
            ConnectionId(1),
            &TransportConfig::default(),
            Arc::new(NullConnectionListener::new()),
        );

        assert!(matches!(duplex.receive(), Err(MessagingError::NotStarted)));
    }

    #[tokio::test]
    async fn test_receive_before_connection_is_empty() {
        let unused = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = unused.local_addr().unwrap().to_string();
        drop(unused);

        let duplex = BufferedSenderReceiver::connect_to(
            address,
            ConnectionId(1),
            &TransportConfig::default(),
            Arc::new(NullConnectionListener::new()),
        );
        duplex.start().unwrap();

        assert!(duplex.receive().unwrap().is_empty());
        duplex.shutdown().await.unwrap();
        assert!(matches!(duplex.receive(), Err(MessagingError::ShutDown)));
    }
}
