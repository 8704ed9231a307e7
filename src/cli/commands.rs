//! CLI command definitions for celery-client.
//!
//! Every command builds one client from the global connection flags, runs
//! a single operation against the broker and prints the outcome on
//! stdout, so the binary composes with shell pipelines.

use std::time::Duration;

use clap::Parser;
use serde_json::Value;
use tracing::info;

use crate::client::CeleryClient;
use crate::config::{
    ClientConfig, ConfigError, DEFAULT_MASTER_NAME, DEFAULT_QUEUE, DEFAULT_URL,
};

/// Celery-protocol task producer and result poller.
#[derive(Parser)]
#[command(name = "celery-client")]
#[command(about = "Submit Celery tasks to a Redis broker and poll for results")]
#[command(version)]
#[command(
    long_about = "celery-client submits Celery v1 protocol tasks to a Redis-backed queue and polls the result backend for completion.\n\nExample usage:\n  celery-client submit tasks.add 2 3\n  celery-client wait 8f14e45f-ceea-4672-9f5b-74a3b2f4d2a1 --timeout-ms 5000"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Redis endpoint URL (can also be set via REDIS_URL env var).
    #[arg(long, env = "REDIS_URL", default_value = DEFAULT_URL, global = true)]
    pub url: String,

    /// Target queue name.
    #[arg(short, long, default_value = DEFAULT_QUEUE, global = true)]
    pub queue: String,

    /// Overall wait timeout in milliseconds.
    #[arg(long, default_value = "30000", global = true)]
    pub timeout_ms: u64,

    /// Interval between result checks in milliseconds.
    #[arg(long, default_value = "50", global = true)]
    pub interval_ms: u64,

    /// Sentinel monitor address (repeatable). Enables failover discovery.
    #[arg(long = "sentinel", global = true)]
    pub sentinel_addrs: Vec<String>,

    /// Sentinel primary-group name.
    #[arg(long, default_value = DEFAULT_MASTER_NAME, global = true)]
    pub master_name: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Submit a task and print its id.
    Submit(SubmitArgs),

    /// Check once whether a task has a stored result.
    Status(StatusArgs),

    /// Wait for a task result until the timeout elapses.
    ///
    /// Prints true/false and exits non-zero when the deadline is reached
    /// without a result.
    Wait(WaitArgs),
}

/// Arguments for `celery-client submit`.
#[derive(Parser, Debug)]
pub struct SubmitArgs {
    /// Task name as registered with the worker fleet.
    pub task: String,

    /// Positional task arguments; each value is parsed as JSON, and bare
    /// words fall back to strings.
    pub args: Vec<String>,
}

/// Arguments for `celery-client status`.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Task id returned by submit.
    pub task_id: String,
}

/// Arguments for `celery-client wait`.
#[derive(Parser, Debug)]
pub struct WaitArgs {
    /// Task id returned by submit.
    pub task_id: String,
}

/// Parses command line arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Runs the parsed CLI command.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let config = build_config(&cli)?;
    let client = CeleryClient::connect(config).await?;

    match cli.command {
        Commands::Submit(args) => {
            let values = args.args.iter().map(|raw| parse_arg(raw)).collect();
            let task_id = client.submit(&args.task, values).await?;
            info!(task = %args.task, queue = client.queue(), "task submitted");
            println!("{task_id}");
        }
        Commands::Status(args) => {
            let completed = client.task_completed(&args.task_id).await?;
            println!("{completed}");
        }
        Commands::Wait(args) => {
            let completed = client.wait_for_completion(&args.task_id).await;
            println!("{completed}");
            if !completed {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Builds a validated client configuration from the global flags.
fn build_config(cli: &Cli) -> Result<ClientConfig, ConfigError> {
    let mut config = ClientConfig::new()
        .with_url(cli.url.clone())
        .with_queue(cli.queue.clone())
        .with_timeout(Duration::from_millis(cli.timeout_ms))
        .with_get_interval(Duration::from_millis(cli.interval_ms))
        .with_sentinel_addrs(cli.sentinel_addrs.clone())
        .with_master_name(cli.master_name.clone());

    config.derive_sentinel_addrs();
    config.validate()?;
    Ok(config)
}

/// Parses one task argument as JSON, falling back to a plain string.
fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
