//! Domain errors for the Hoogas messaging transport.

use thiserror::Error;

use crate::domain::models::ConnectionId;

/// Errors returned synchronously by the messaging components.
///
/// Transient connection failures never show up here for the buffered sender;
/// they are reported through the `ConnectionListener` instead. What does show
/// up are usage errors (calling an operation in the wrong lifecycle phase),
/// the terminal timeout, and I/O failures of the direct (unbuffered) paths.
#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("Messaging component has not been started")]
    NotStarted,

    #[error("Messaging component has already been started")]
    AlreadyStarted,

    #[error("Messaging component has been shut down")]
    ShutDown,

    #[error("Connection {0} timed out and will not reconnect")]
    TimedOut(ConnectionId),

    #[error("No live connection")]
    NotConnected,

    #[error("No tokio runtime available to run the sending worker")]
    NoRuntime,

    #[error("Lock poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MessagingError {
    /// True for errors caused by calling an operation in the wrong lifecycle phase.
    pub const fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::NotStarted | Self::AlreadyStarted | Self::ShutDown | Self::NotConnected
        )
    }
}

impl<T> From<std::sync::PoisonError<T>> for MessagingError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::LockPoisoned
    }
}

pub type MessagingResult<T> = Result<T, MessagingError>;
