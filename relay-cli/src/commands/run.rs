//! Run command handler
//!
//! Triggers a single workflow run and waits for its outcome.

use anyhow::{Result, bail};
use clap::Args;
use colored::*;
use relay_core::domain::{InputPair, JobRequest};
use std::path::PathBuf;

use super::{interruptible_runner, parse_input, read_json, validate_all};
use crate::config::Config;
use crate::output::{print_error, print_json, print_outcome};

#[derive(Args)]
pub struct RunArgs {
    /// Organization or user owning the repository
    #[arg(required_unless_present = "file")]
    org: Option<String>,

    /// Repository name
    #[arg(required_unless_present = "file")]
    repo: Option<String>,

    /// Workflow file name (e.g., wait-and-echo.yaml)
    #[arg(required_unless_present = "file")]
    workflow: Option<String>,

    /// Git ref to run the workflow on
    #[arg(long = "ref", default_value = "main")]
    git_ref: String,

    /// Workflow input as key=value (repeatable)
    #[arg(short, long = "input", value_parser = parse_input)]
    inputs: Vec<InputPair>,

    /// Read the request from a JSON file instead
    #[arg(short, long, conflicts_with_all = ["org", "repo", "workflow", "inputs"])]
    file: Option<PathBuf>,
}

impl RunArgs {
    fn into_request(self) -> Result<JobRequest> {
        if let Some(path) = self.file {
            return read_json(&path);
        }

        match (self.org, self.repo, self.workflow) {
            (Some(org), Some(repo), Some(workflow)) => {
                let mut request = JobRequest::new(org, repo, self.git_ref, workflow);
                request.inputs = self.inputs;
                Ok(request)
            }
            _ => bail!("org, repo and workflow are required without --file"),
        }
    }
}

/// Handle the run command
pub async fn handle_run(args: RunArgs, config: &Config) -> Result<()> {
    let request = args.into_request()?;
    validate_all(std::slice::from_ref(&request))?;

    let runner = interruptible_runner(config)?;

    if !config.json {
        println!("{}", format!("Triggering {}", request.label()).bold());
    }

    match runner.submit(&request).await {
        Ok(outcome) => {
            if config.json {
                print_json(&outcome)?;
            } else {
                print_outcome(&request.label(), &outcome);
            }
            Ok(())
        }
        Err(err) => {
            if config.json {
                print_json(&err)?;
            } else {
                print_error(&request.label(), &err);
            }
            bail!("{} did not succeed", request.label())
        }
    }
}
