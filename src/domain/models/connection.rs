//! Connection vocabulary shared by every messaging component.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-supplied identifier distinguishing concurrently managed connections.
///
/// Listener callbacks are tagged with it so that one listener can serve
/// many endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u32);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ConnectionId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Lifecycle of a single connection endpoint.
///
/// ```text
/// Disconnected -> Connecting -> Connected
///                  |   ^           |
///                  |   +-- retry   | read/write failure
///                  v               v
///               TimedOut      Disconnected -> Connecting (reconnecting components)
///
/// any state -> Closed (explicit shutdown)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    TimedOut,
    Closed,
}

impl ConnectionState {
    /// `TimedOut` and `Closed` are never left again.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::TimedOut | Self::Closed)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::TimedOut => "timed_out",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification emitted at the connection state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "connection_id", rename_all = "snake_case")]
pub enum ConnectionEvent {
    /// `Connecting -> Connected`.
    Established(ConnectionId),
    /// `Connected -> Disconnected`; the sender keeps retrying.
    Lost(ConnectionId),
    /// `Connecting -> TimedOut`; the endpoint is dead.
    TimedOut(ConnectionId),
}

impl ConnectionEvent {
    pub const fn connection_id(&self) -> ConnectionId {
        match self {
            Self::Established(id) | Self::Lost(id) | Self::TimedOut(id) => *id,
        }
    }
}
