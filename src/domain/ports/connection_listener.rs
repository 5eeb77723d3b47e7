use crate::domain::models::ConnectionId;

/// Receives connection lifecycle notifications from a buffered sender.
///
/// Callbacks run on the sender's worker task, exactly at the transitions of
/// the connection state machine. They must return quickly; anything slow
/// should be handed off (see `ChannelListener`).
///
/// Callers are expected to treat `lost` as "keep waiting, it may recover" and
/// `timed_out` as "this endpoint is dead, construct a new one".
pub trait ConnectionListener: Send + Sync {
    /// `Connecting -> Connected`.
    fn on_connection_established(&self, connection_id: ConnectionId);

    /// A write or read on the live socket failed; reconnection follows.
    fn on_connection_lost(&self, connection_id: ConnectionId);

    /// The connect loop ran out of time. No further sends will be attempted.
    fn on_connection_timed_out(&self, connection_id: ConnectionId);
}
