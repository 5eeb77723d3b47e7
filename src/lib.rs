//! Hoogas - point-to-point messaging for application lifecycle orchestration
//!
//! Hoogas components talk to each other over plain TCP. Each message is UTF-8
//! text followed by a single delimiter character (`¬` by default); there is
//! no length prefix, no acknowledgement and no encryption.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): connection vocabulary, configuration
//!   models, errors and the `ConnectionListener` port
//! - **Infrastructure Layer** (`infrastructure`): framing, sockets, the
//!   shared connect-and-retry loop, configuration loading and logging
//! - **Service Layer** (`services`): the buffered sender, the synchronous
//!   receiver and their variants
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hoogas::{BufferedSender, ConnectionId, NullConnectionListener, TransportConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let sender = BufferedSender::connect_to(
//!         "localhost:9000",
//!         ConnectionId(1),
//!         &TransportConfig::default(),
//!         Arc::new(NullConnectionListener::new()),
//!     );
//!     sender.start()?;
//!     sender.send("deploy web-frontend").await?;
//!     sender.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{MessagingError, MessagingResult};
pub use domain::models::{
    Config, ConnectionEvent, ConnectionId, ConnectionState, PeerConfig, TransportConfig,
};
pub use domain::ports::{ConnectionListener, NullConnectionListener};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::transport::{Framer, Framing, MessageWriter};
pub use services::{
    BufferedSender, BufferedSenderReceiver, ChannelListener, DirectSender, SyncReceiver,
};
