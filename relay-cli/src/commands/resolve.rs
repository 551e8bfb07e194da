//! Resolve command handler
//!
//! Looks up the run that a previous dispatch created, given the dispatch
//! id it was triggered with.

use anyhow::Result;
use clap::Args;
use colored::*;
use relay_client::{ActionsClient, ClientError, GitHubClient};
use relay_core::domain::CorrelationToken;
use serde_json::json;

use crate::config::Config;
use crate::output::print_json;

#[derive(Args)]
pub struct ResolveArgs {
    /// Organization or user owning the repository
    org: String,

    /// Repository name
    repo: String,

    /// Workflow file name
    workflow: String,

    /// Dispatch id the run was triggered with
    dispatch_id: String,

    /// Git ref the run was triggered on
    #[arg(long = "ref", default_value = "main")]
    git_ref: String,
}

/// Handle the resolve command
pub async fn handle_resolve(args: ResolveArgs, config: &Config) -> Result<()> {
    let github = GitHubClient::new(&config.runner.github_config())?;
    let client = ActionsClient::new(github);
    let token = CorrelationToken::from(args.dispatch_id);

    let result = client
        .resolve_run_id(&args.org, &args.repo, &args.workflow, &args.git_ref, &token)
        .await;

    match result {
        Ok(run_id) => {
            if config.json {
                print_json(&json!({ "dispatch_id": token, "run_id": run_id }))?;
            } else {
                println!("{} {} → run {}", "✓".green(), token, run_id.to_string().bold());
            }
            Ok(())
        }
        Err(ClientError::CorrelationNotFound(_)) if !config.json => {
            println!(
                "{}",
                format!("No run of {} mentions dispatch {}.", args.workflow, token).yellow()
            );
            Ok(())
        }
        Err(ClientError::CorrelationNotFound(_)) => {
            print_json(&json!({ "dispatch_id": token, "run_id": null }))
        }
        Err(e) => Err(e.into()),
    }
}
