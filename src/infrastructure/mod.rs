//! Infrastructure layer module
//!
//! - TCP transport (framing, endpoints, connection establishment)
//! - Configuration management
//! - Logging infrastructure
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod logging;
pub mod transport;
