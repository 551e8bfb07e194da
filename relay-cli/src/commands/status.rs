//! Status command handler

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use relay_client::{ActionsClient, GitHubClient};
use relay_core::domain::{RunHandle, RunId};

use crate::config::Config;
use crate::output::{print_json, print_status};

#[derive(Args)]
pub struct StatusArgs {
    /// Organization or user owning the repository
    org: String,

    /// Repository name
    repo: String,

    /// Run identifier
    run_id: i64,
}

/// Handle the status command
pub async fn handle_status(args: StatusArgs, config: &Config) -> Result<()> {
    let github = GitHubClient::new(&config.runner.github_config())?;
    let client = ActionsClient::new(github);

    let handle = RunHandle::new(RunId(args.run_id), args.org, args.repo);
    let status = match client.get_status(&handle).await {
        Err(e) if e.is_not_found() && !config.json => {
            println!(
                "{}",
                format!("Run {} not found in {}/{}.", handle.run_id, handle.org, handle.repo)
                    .yellow()
            );
            return Ok(());
        }
        result => result.with_context(|| format!("Failed to fetch run {}", handle.run_id))?,
    };

    if config.json {
        print_json(&status)?;
    } else {
        print_status(&handle, &status);
    }

    Ok(())
}
