//! Command-line interface for celery-client.
//!
//! Provides one-shot commands for submitting tasks and checking or
//! waiting on their results.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli};
