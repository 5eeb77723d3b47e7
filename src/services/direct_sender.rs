//! Unbuffered sender: every call writes straight to the socket.

use crate::domain::errors::{MessagingError, MessagingResult};
use crate::domain::models::{ConnectionId, TransportConfig};
use crate::infrastructure::transport::{ConnectionEndpoint, EndpointMode, Framing};

/// Writes messages synchronously on the caller's task.
///
/// No queue, no worker and no reconnection: a failed write is returned to
/// the caller and the sender must be reconnected explicitly.
#[derive(Debug)]
pub struct DirectSender {
    connection_id: ConnectionId,
    endpoint: Option<ConnectionEndpoint>,
}

impl DirectSender {
    /// Makes a single connection attempt to `address`.
    pub async fn connect(
        address: &str,
        connection_id: ConnectionId,
        transport: &TransportConfig,
    ) -> MessagingResult<Self> {
        let endpoint = ConnectionEndpoint::connect(
            address,
            connection_id,
            Framing::from(transport),
            EndpointMode::WriteOnly,
        )
        .await?;
        tracing::debug!(connection_id = %connection_id, address, "Direct sender connected");

        Ok(Self {
            connection_id,
            endpoint: Some(endpoint),
        })
    }

    /// Writes `message` and its delimiter, then flushes.
    ///
    /// A write failure drops the connection; later calls return `NotConnected`.
    pub async fn send(&mut self, message: &str) -> MessagingResult<()> {
        let endpoint = self.endpoint.as_mut().ok_or(MessagingError::NotConnected)?;
        if let Err(err) = endpoint.send(message).await {
            tracing::warn!(connection_id = %self.connection_id, error = %err, "Direct send failed");
            self.endpoint = None;
            return Err(err.into());
        }
        Ok(())
    }

    /// False after a failed write or [`DirectSender::close`].
    pub const fn is_connected(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Shuts the socket down; a no-op when not connected.
    pub async fn close(&mut self) {
        if let Some(endpoint) = self.endpoint.take() {
            endpoint.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_send_writes_immediately() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let mut sender = DirectSender::connect(&address, ConnectionId(1), &TransportConfig::default())
            .await
            .unwrap();
        let (mut peer, _) = listener.accept().await.unwrap();

        sender.send("now").await.unwrap();
        let mut buf = vec![0u8; 16];
        let n = peer.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], "now¬".as_bytes());

        sender.close().await;
        assert!(!sender.is_connected());
        assert!(matches!(
            sender.send("after").await,
            Err(MessagingError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_connect_failure_is_surfaced() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = DirectSender::connect(&address, ConnectionId(1), &TransportConfig::default()).await;
        assert!(matches!(result, Err(MessagingError::Io(_))));
    }
}
