//! Listener that turns connection callbacks into a stream of events.

use tokio::sync::mpsc;

use crate::domain::models::{ConnectionEvent, ConnectionId};
use crate::domain::ports::ConnectionListener;

/// Forwards every callback as a [`ConnectionEvent`] into an unbounded
/// channel. Events raised after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<ConnectionEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: ConnectionEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!(?event, "Connection event dropped, no subscriber");
        }
    }
}

impl ConnectionListener for ChannelListener {
    fn on_connection_established(&self, connection_id: ConnectionId) {
        self.forward(ConnectionEvent::Established(connection_id));
    }

    fn on_connection_lost(&self, connection_id: ConnectionId) {
        self.forward(ConnectionEvent::Lost(connection_id));
    }

    fn on_connection_timed_out(&self, connection_id: ConnectionId) {
        self.forward(ConnectionEvent::TimedOut(connection_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callbacks_become_events() {
        let (listener, mut rx) = ChannelListener::new();
        listener.on_connection_established(ConnectionId(1));
        listener.on_connection_lost(ConnectionId(1));
        listener.on_connection_timed_out(ConnectionId(2));

        assert_eq!(rx.try_recv().unwrap(), ConnectionEvent::Established(ConnectionId(1)));
        assert_eq!(rx.try_recv().unwrap(), ConnectionEvent::Lost(ConnectionId(1)));
        assert_eq!(rx.try_recv().unwrap(), ConnectionEvent::TimedOut(ConnectionId(2)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (listener, rx) = ChannelListener::new();
        drop(rx);
        listener.on_connection_lost(ConnectionId(3));
    }
}
