//! TCP transport: framing, writing and connection establishment.

pub mod connectors;
pub mod endpoint;
pub mod framer;
pub mod reconnect;
pub mod writer;

pub use connectors::{DuplexConnector, EndpointFactory, InboundSlot, TcpAcceptor, TcpConnector};
pub use endpoint::{ConnectionEndpoint, EndpointMode};
pub use framer::Framer;
pub use reconnect::{connect_with_retry, ConnectOutcome, RetryPolicy};
pub use writer::{encode, MessageWriter};

use crate::domain::models::TransportConfig;

/// Framing parameters shared by the reading and writing halves of a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framing {
    /// Maximum characters inspected per pull.
    pub chunk_size: usize,
    pub delimiter: char,
}

impl Framing {
    /// Framing with explicit settings.
    pub const fn new(chunk_size: usize, delimiter: char) -> Self {
        Self {
            chunk_size,
            delimiter,
        }
    }
}

impl Default for Framing {
    fn default() -> Self {
        Self::from(&TransportConfig::default())
    }
}

impl From<&TransportConfig> for Framing {
    fn from(transport: &TransportConfig) -> Self {
        Self::new(transport.chunk_size, transport.delimiter)
    }
}
