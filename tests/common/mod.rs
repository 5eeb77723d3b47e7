//! Common test utilities for integration tests
//!
//! Provides shared fixtures and helpers used across multiple integration
//! test files.

use std::time::Duration;

use hoogas::{SyncReceiver, TransportConfig};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Transport settings with short timings so failure paths finish quickly.
#[allow(dead_code)]
pub fn fast_transport() -> TransportConfig {
    TransportConfig::default()
        .with_connect_timeout(Duration::from_secs(3))
        .with_retry_interval(Duration::from_millis(20))
}

/// Reserves a free loopback port and returns it as `127.0.0.1:port`.
///
/// The port is released again, so something else may grab it in between;
/// good enough for tests.
#[allow(dead_code)]
pub fn free_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener
        .local_addr()
        .expect("local address")
        .to_string()
}

/// Polls `receiver` until `count` messages arrived or `timeout` passed.
#[allow(dead_code)]
pub async fn collect_messages(
    receiver: &mut SyncReceiver,
    count: usize,
    timeout: Duration,
) -> Vec<String> {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut received = Vec::new();
    while received.len() < count && tokio::time::Instant::now() < deadline {
        match receiver.receive() {
            Ok(messages) if messages.is_empty() => {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            Ok(messages) => received.extend(messages),
            Err(_) => break,
        }
    }
    received
}

/// Wait for a condition to be true with timeout
///
/// Polls the predicate every 10ms until it returns true or timeout is reached.
#[allow(dead_code)]
pub async fn wait_for<F>(mut predicate: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    predicate()
}
