//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::config::ConfigArgs;
use crate::cli::commands::listen::ListenArgs;
use crate::cli::commands::send::SendArgs;

#[derive(Parser, Debug)]
#[command(name = "hoogas")]
#[command(about = "Hoogas - point-to-point messaging for application lifecycle orchestration", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .hoogas/config.yaml and .hoogas/local.yaml)
    #[arg(short, long, global = true, env = "HOOGAS_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Wait for one peer and print the messages it sends
    Listen(ListenArgs),

    /// Deliver messages to a listening peer, reconnecting as needed
    Send(SendArgs),

    /// Print the effective configuration
    Config(ConfigArgs),
}
