//! Hoogas CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;

use hoogas::cli::{Cli, Commands};
use hoogas::domain::models::Config;
use hoogas::infrastructure::config::ConfigLoader;
use hoogas::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let (config, _logger) = match bootstrap(&cli) {
        Ok(ready) => ready,
        Err(err) => hoogas::cli::handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Listen(args) => hoogas::cli::commands::listen::execute(args, &config, cli.json).await,
        Commands::Send(args) => hoogas::cli::commands::send::execute(args, &config, cli.json).await,
        Commands::Config(args) => hoogas::cli::commands::config::execute(args, &config, cli.json),
    };

    if let Err(err) = result {
        hoogas::cli::handle_error(err, cli.json);
    }
}

/// Loads configuration and installs the logger. The returned logger must be
/// kept alive for file output to be flushed.
fn bootstrap(cli: &Cli) -> Result<(Config, LoggerImpl)> {
    let config = match cli.config.as_deref() {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    let log_config = LogConfig::try_from(&config.logging).context("Invalid logging configuration")?;
    let logger = LoggerImpl::init(&log_config)?;
    Ok((config, logger))
}
