//! Implementation of the `hoogas send` command.

use anyhow::{bail, Context, Result};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, ConnectionEvent, ConnectionId, ConnectionState};
use crate::services::{BufferedSender, ChannelListener};

/// How often the queue is checked while draining.
const DRAIN_POLL: Duration = Duration::from_millis(20);

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Receiver host (defaults to peer.host from the configuration)
    #[arg(long)]
    pub host: Option<String>,

    /// Receiver port (defaults to peer.port from the configuration)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Connection id reported with connection events
    #[arg(long)]
    pub id: Option<u32>,

    /// Messages to send; read line by line from stdin when omitted
    pub messages: Vec<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct SendOutput {
    pub connection_id: ConnectionId,
    pub address: String,
    pub sent: usize,
    pub reconnects: usize,
}

impl CommandOutput for SendOutput {
    fn to_human(&self) -> String {
        let mut summary = format!("Delivered {} message(s) to {}", self.sent, self.address);
        if self.reconnects > 0 {
            summary.push_str(&format!(" ({} reconnect(s))", self.reconnects));
        }
        summary
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: SendArgs, config: &Config, json_mode: bool) -> Result<()> {
    let host = args.host.unwrap_or_else(|| config.peer.host.clone());
    let port = args.port.unwrap_or(config.peer.port);
    let connection_id = args.id.map_or(config.peer.connection_id, ConnectionId);
    let address = format!("{host}:{port}");

    let (listener, mut events) = ChannelListener::new();
    let sender = BufferedSender::connect_to(
        address.clone(),
        connection_id,
        &config.transport,
        Arc::new(listener),
    );
    sender.start().context("Failed to start sender")?;

    let result = enqueue_and_drain(&sender, args.messages).await;
    sender.shutdown().await.context("Failed to shut down sender")?;
    let sent = result?;

    let mut reconnects = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, ConnectionEvent::Lost(_)) {
            reconnects += 1;
        }
    }

    output(
        &SendOutput {
            connection_id,
            address,
            sent,
            reconnects,
        },
        json_mode,
    );
    Ok(())
}

async fn enqueue_and_drain(sender: &BufferedSender, messages: Vec<String>) -> Result<usize> {
    let mut sent = 0;
    if messages.is_empty() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
            sender.send(line).await.context("Failed to queue message")?;
            sent += 1;
        }
    } else {
        for message in messages {
            sender.send(message).await.context("Failed to queue message")?;
            sent += 1;
        }
    }

    drain(sender).await?;
    Ok(sent)
}

/// Waits until every queued message has been written.
async fn drain(sender: &BufferedSender) -> Result<()> {
    loop {
        if sender.state() == ConnectionState::TimedOut {
            bail!(
                "Connection {} timed out with {} message(s) undelivered",
                sender.connection_id(),
                sender.pending()
            );
        }
        if sender.pending() == 0 {
            return Ok(());
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_output_mentions_reconnects() {
        let out = SendOutput {
            connection_id: ConnectionId(1),
            address: "localhost:9000".to_string(),
            sent: 4,
            reconnects: 1,
        };
        assert_eq!(
            out.to_human(),
            "Delivered 4 message(s) to localhost:9000 (1 reconnect(s))"
        );
    }
}
