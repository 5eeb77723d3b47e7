//! The `Connecting` phase shared by every endpoint kind.
//!
//! Attempts are repeated at a fixed interval until one succeeds, the phase
//! timeout elapses, or shutdown is requested. The timeout is measured from
//! the start of each phase, so a reconnect gets the full budget again.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use super::{ConnectionEndpoint, EndpointFactory};
use crate::domain::models::TransportConfig;

/// How long a connect phase may last and how often it retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl RetryPolicy {
    /// Policy with a per-phase `timeout` and a fixed retry `interval`.
    pub const fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }
}

impl From<&TransportConfig> for RetryPolicy {
    fn from(transport: &TransportConfig) -> Self {
        Self::new(transport.connect_timeout(), transport.retry_interval())
    }
}

/// Result of one connect phase.
#[derive(Debug)]
#[allow(clippy::large_enum_variant)]
pub enum ConnectOutcome {
    Connected(ConnectionEndpoint),
    /// The phase budget was exhausted without a successful handshake.
    TimedOut,
    /// Shutdown was requested while connecting.
    Cancelled,
}

/// Runs one connect phase against `factory`.
///
/// A single attempt may not run longer than the time left in the phase, but
/// is always given at least one retry interval so that slow handshakes near
/// the deadline still get a chance.
pub async fn connect_with_retry(
    factory: &dyn EndpointFactory,
    policy: RetryPolicy,
    shutdown: &mut watch::Receiver<bool>,
) -> ConnectOutcome {
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        if *shutdown.borrow() {
            return ConnectOutcome::Cancelled;
        }

        attempt = attempt.saturating_add(1);
        let remaining = policy.timeout.saturating_sub(started.elapsed());
        let budget = remaining.max(policy.interval);

        tokio::select! {
            biased;
            () = shutdown_requested(shutdown) => return ConnectOutcome::Cancelled,
            result = tokio::time::timeout(budget, factory.open()) => match result {
                Ok(Ok(endpoint)) => {
                    tracing::debug!(
                        connection_id = %endpoint.connection_id(),
                        attempt,
                        elapsed = ?started.elapsed(),
                        "Handshake succeeded"
                    );
                    return ConnectOutcome::Connected(endpoint);
                }
                Ok(Err(err)) => {
                    tracing::debug!(attempt, error = %err, "Handshake attempt failed");
                }
                Err(_) => {
                    tracing::debug!(attempt, "Handshake attempt did not complete in time");
                }
            }
        }

        tokio::select! {
            biased;
            () = shutdown_requested(shutdown) => return ConnectOutcome::Cancelled,
            () = tokio::time::sleep(policy.interval) => {}
        }

        if started.elapsed() >= policy.timeout {
            tracing::debug!(attempts = attempt, "Connect phase exhausted its budget");
            return ConnectOutcome::TimedOut;
        }
    }
}

/// Resolves once shutdown has been signalled.
///
/// A dropped sender counts as shutdown: nobody is left to keep the
/// endpoint alive.
pub(crate) async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
