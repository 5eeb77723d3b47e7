//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces collaborators implement to take part in
//! the messaging core:
//! - ConnectionListener: receives connection lifecycle notifications
//!
//! The endpoint factory seam lives with the transport adapters because it
//! hands out live sockets.

pub mod connection_listener;
pub mod null_listener;

pub use connection_listener::ConnectionListener;
pub use null_listener::NullConnectionListener;
