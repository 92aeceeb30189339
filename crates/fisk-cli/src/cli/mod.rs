//! CLI for the FISK tax-authority client.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fisk_core::config;

use commands::{run_config, run_drill, run_queue_add, run_queue_list, run_queue_stats};

/// Top-level CLI for the FISK client.
#[derive(Debug, Parser)]
#[command(name = "fisk")]
#[command(about = "FISK: resilient client for national tax-authority web services", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Show the effective configuration and where it was loaded from.
    Config,

    /// Inspect and edit the persisted request queue.
    Queue {
        #[command(subcommand)]
        command: QueueCommand,
    },

    /// Run the client against a synthetic flaky upstream and report how the
    /// retry loop and circuit breaker behaved.
    Drill {
        /// Number of requests to run.
        #[arg(long, default_value = "20", value_name = "N")]
        requests: u32,
        /// Probability in [0, 1] that a single attempt fails.
        #[arg(long, default_value = "0.5", value_name = "RATE")]
        fail_rate: f64,
    },
}

#[derive(Debug, Subcommand)]
pub enum QueueCommand {
    /// Append a request to the persisted queue.
    Add {
        /// Request type (must match a handler the draining process registers).
        request_type: String,
        /// JSON payload passed to the handler verbatim.
        payload: String,
        /// Dispatch priority: high, medium or low.
        #[arg(long, default_value = "medium")]
        priority: String,
    },

    /// List queued requests.
    List,

    /// Show queue counters.
    Stats,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Config => run_config(&cfg)?,
            CliCommand::Queue { command } => match command {
                QueueCommand::Add {
                    request_type,
                    payload,
                    priority,
                } => run_queue_add(&request_type, &payload, &priority)?,
                QueueCommand::List => run_queue_list()?,
                QueueCommand::Stats => run_queue_stats()?,
            },
            CliCommand::Drill { requests, fail_rate } => {
                run_drill(cfg, requests, fail_rate).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
