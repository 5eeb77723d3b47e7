use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::connection::ConnectionId;

/// Main configuration structure for Hoogas messaging
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Transport tuning shared by senders and receivers
    #[serde(default)]
    pub transport: TransportConfig,

    /// Remote peer used by the command-line tools
    #[serde(default)]
    pub peer: PeerConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json, pretty or compact
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; console only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation policy for file logs: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Transport tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TransportConfig {
    /// How long a connect (or reconnect) phase may last before the endpoint times out
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Pause between failed handshake attempts
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Characters inspected per receive call
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Maximum number of queued, unsent messages per sender
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Message terminator; must never appear inside a message
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

const fn default_connect_timeout_ms() -> u64 {
    10_000
}

const fn default_retry_interval_ms() -> u64 {
    200
}

const fn default_chunk_size() -> usize {
    1000
}

const fn default_queue_capacity() -> usize {
    1000
}

const fn default_delimiter() -> char {
    '¬'
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            retry_interval_ms: default_retry_interval_ms(),
            chunk_size: default_chunk_size(),
            queue_capacity: default_queue_capacity(),
            delimiter: default_delimiter(),
        }
    }
}

impl TransportConfig {
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub const fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Copy with a different connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Copy with a different retry interval.
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Copy with a different chunk size.
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Copy with a different queue capacity.
    pub const fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }
}

/// Remote peer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PeerConfig {
    /// Host of the receiving application
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the receiving application listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Identifier reported with connection events
    #[serde(default)]
    pub connection_id: ConnectionId,
}

fn default_host() -> String {
    "localhost".to_string()
}

const fn default_port() -> u16 {
    9000
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connection_id: ConnectionId::default(),
        }
    }
}

impl PeerConfig {
    /// `host:port` form accepted by the connectors.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
