//! Implementation of the `hoogas listen` command.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use std::time::Duration;

use crate::cli::output::{output_line, CommandOutput};
use crate::domain::models::{Config, ConnectionId};
use crate::services::SyncReceiver;

/// Pause between polls that returned nothing.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Port to listen on (defaults to peer.port from the configuration)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(short, long, default_value = "127.0.0.1")]
    pub bind: String,

    /// Connection id reported in logs (defaults to peer.connection_id)
    #[arg(long)]
    pub id: Option<u32>,

    /// Write every received message back to the sender
    #[arg(short, long)]
    pub echo: bool,

    /// Stop after this many messages
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Debug, serde::Serialize)]
pub struct ReceivedMessage {
    pub connection_id: ConnectionId,
    pub received_at: DateTime<Utc>,
    pub message: String,
}

impl CommandOutput for ReceivedMessage {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ListenSummary {
    pub connection_id: ConnectionId,
    pub received: usize,
    pub echoed: usize,
    pub peer_disconnected: bool,
}

impl CommandOutput for ListenSummary {
    fn to_human(&self) -> String {
        let mut summary = format!("Received {} message(s)", self.received);
        if self.echoed > 0 {
            summary.push_str(&format!(", echoed {}", self.echoed));
        }
        if self.peer_disconnected {
            summary.push_str(" before the peer disconnected");
        }
        summary
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ListenArgs, config: &Config, json_mode: bool) -> Result<()> {
    let port = args.port.unwrap_or(config.peer.port);
    let connection_id = args.id.map_or(config.peer.connection_id, ConnectionId);
    let bind_address = format!("{}:{port}", args.bind);

    let mut receiver = SyncReceiver::new(&bind_address, connection_id, &config.transport);
    let local = receiver
        .bind()
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    tracing::info!(connection_id = %connection_id, local_addr = %local, "Waiting for a peer");

    receiver.listen().await.context("No peer connected")?;

    let mut summary = ListenSummary {
        connection_id,
        received: 0,
        echoed: 0,
        peer_disconnected: false,
    };

    'poll: loop {
        let messages = tokio::select! {
            result = poll(&mut receiver) => result,
            _ = tokio::signal::ctrl_c() => break 'poll,
        };

        let Some(messages) = messages else {
            summary.peer_disconnected = true;
            break;
        };

        for message in messages {
            if args.echo {
                receiver
                    .send_reply(&message)
                    .await
                    .context("Failed to echo message")?;
                summary.echoed += 1;
            }
            output_line(
                &ReceivedMessage {
                    connection_id,
                    received_at: Utc::now(),
                    message,
                },
                json_mode,
            );
            summary.received += 1;

            if args.limit.is_some_and(|limit| summary.received >= limit) {
                break 'poll;
            }
        }
    }

    receiver.close().await;
    output_line(&summary, json_mode);
    Ok(())
}

/// Waits for the next non-empty batch. `None` once the peer is gone.
async fn poll(receiver: &mut SyncReceiver) -> Option<Vec<String>> {
    loop {
        match receiver.receive() {
            Ok(messages) if !messages.is_empty() => return Some(messages),
            Ok(_) => tokio::time::sleep(POLL_INTERVAL).await,
            Err(err) => {
                tracing::debug!(error = %err, "Receive ended");
                return None;
            }
        }
    }
}
