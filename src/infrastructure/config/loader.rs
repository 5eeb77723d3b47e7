use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid chunk_size: {0}. Must be at least 1")]
    InvalidChunkSize(usize),

    #[error("Invalid queue_capacity: {0}. Must be at least 1")]
    InvalidQueueCapacity(usize),

    #[error("Invalid connect_timeout_ms: {0}. Must be at least 1")]
    InvalidConnectTimeout(u64),

    #[error("Invalid retry_interval_ms: {0}. Must be at least 1")]
    InvalidRetryInterval(u64),

    #[error("Invalid delimiter: the NUL character cannot terminate messages")]
    InvalidDelimiter,

    #[error("Peer host cannot be empty")]
    EmptyHost,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty, compact")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .hoogas/config.yaml (project config)
    /// 3. .hoogas/local.yaml (local overrides, optional)
    /// 4. Environment variables (HOOGAS_* prefix, `__` separates nested keys)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".hoogas/config.yaml"))
            .merge(Yaml::file(".hoogas/local.yaml"))
            .merge(Env::prefixed("HOOGAS_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Environment variables still override the file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("HOOGAS_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let transport = &config.transport;
        if transport.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(transport.chunk_size));
        }

        if transport.queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity(transport.queue_capacity));
        }

        if transport.connect_timeout_ms == 0 {
            return Err(ConfigError::InvalidConnectTimeout(
                transport.connect_timeout_ms,
            ));
        }

        if transport.retry_interval_ms == 0 {
            return Err(ConfigError::InvalidRetryInterval(transport.retry_interval_ms));
        }

        if transport.delimiter == '\0' {
            return Err(ConfigError::InvalidDelimiter);
        }

        if config.peer.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty", "compact"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}
