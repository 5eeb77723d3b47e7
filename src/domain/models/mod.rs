pub mod config;
pub mod connection;

pub use config::{Config, PeerConfig, TransportConfig};
pub use connection::{ConnectionEvent, ConnectionId, ConnectionState};
