//! Null connection listener implementation.
//!
//! Used when the caller does not care about connection events but the
//! sender requires a ConnectionListener.

use crate::domain::models::ConnectionId;
use super::ConnectionListener;

/// A listener that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullConnectionListener;

impl NullConnectionListener {
    pub const fn new() -> Self {
        Self
    }
}

impl ConnectionListener for NullConnectionListener {
    fn on_connection_established(&self, _connection_id: ConnectionId) {}

    fn on_connection_lost(&self, _connection_id: ConnectionId) {}

    fn on_connection_timed_out(&self, _connection_id: ConnectionId) {}
}
