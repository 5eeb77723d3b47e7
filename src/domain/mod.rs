//! Domain layer for the Hoogas messaging transport
//!
//! This module contains the connection vocabulary (ids, states, events),
//! the configuration model and the ports that collaborators implement.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{MessagingError, MessagingResult};
