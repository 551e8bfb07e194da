//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod batch;
mod resolve;
mod run;
mod status;

pub use batch::BatchArgs;
pub use resolve::ResolveArgs;
pub use run::RunArgs;
pub use status::StatusArgs;

use anyhow::{Context, Result};
use clap::Subcommand;
use relay_core::domain::{InputPair, JobRequest};
use relay_runner::Runner;
use std::path::Path;
use tracing::warn;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Trigger one workflow run and wait for its outcome
    Run(RunArgs),
    /// Trigger a batch of workflow runs from a JSON file
    Batch(BatchArgs),
    /// Show the current status of a run
    Status(StatusArgs),
    /// Find the run created by a dispatch id
    Resolve(ResolveArgs),
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run(args) => run::handle_run(args, config).await,
        Commands::Batch(args) => batch::handle_batch(args, config).await,
        Commands::Status(args) => status::handle_status(args, config).await,
        Commands::Resolve(args) => resolve::handle_resolve(args, config).await,
    }
}

/// Builds a runner whose submissions stop on Ctrl-C
fn interruptible_runner(config: &Config) -> Result<Runner> {
    let runner = Runner::from_config(&config.runner)?;
    let cancel = runner.cancellation_token();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight runs");
            cancel.cancel();
        }
    });

    Ok(runner)
}

/// Parses a `key=value` input flag
fn parse_input(s: &str) -> std::result::Result<InputPair, String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid input '{}', expected key=value", s))?;

    if key.is_empty() {
        return Err(format!("invalid input '{}', key cannot be empty", s));
    }

    Ok(InputPair::new(key, value))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Validates every request before anything is dispatched
fn validate_all(requests: &[JobRequest]) -> Result<()> {
    for (index, request) in requests.iter().enumerate() {
        request
            .validate()
            .with_context(|| format!("Request {} ({}) is invalid", index, request.label()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        let pair = parse_input("message=hello=world").unwrap();
        assert_eq!(pair.key, "message");
        assert_eq!(pair.value, "hello=world");

        assert_eq!(parse_input("empty=").unwrap().value, "");
        assert!(parse_input("novalue").is_err());
        assert!(parse_input("=value").is_err());
    }

    #[test]
    fn test_validate_all_names_offending_request() {
        let requests = vec![
            JobRequest::new("o", "r", "main", "ci.yaml"),
            JobRequest::new("o", "r", "main", "ci.yaml").with_input("dispatch_id", "x"),
        ];

        let err = validate_all(&requests).unwrap_err();
        assert!(err.to_string().contains("Request 1"));
    }
}
