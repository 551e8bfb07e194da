//! Batch command handler

use anyhow::{Result, bail};
use clap::Args;
use colored::*;
use relay_core::domain::JobRequest;
use relay_runner::BatchMode;
use std::path::PathBuf;

use super::{interruptible_runner, read_json, validate_all};
use crate::config::Config;
use crate::output::{print_error, print_json, print_outcome};

#[derive(Args)]
pub struct BatchArgs {
    /// JSON file holding an array of requests
    file: PathBuf,

    /// Execution mode: sequential or concurrent
    #[arg(short, long, default_value = "sequential")]
    mode: BatchMode,
}

/// Handle the batch command
pub async fn handle_batch(args: BatchArgs, config: &Config) -> Result<()> {
    let requests: Vec<JobRequest> = read_json(&args.file)?;
    validate_all(&requests)?;

    if requests.is_empty() {
        println!("{}", "No requests in batch.".yellow());
        return Ok(());
    }

    let labels: Vec<String> = requests.iter().map(JobRequest::label).collect();
    let runner = interruptible_runner(config)?;

    if !config.json {
        println!(
            "{}",
            format!("Triggering {} run(s) ({:?}):", requests.len(), args.mode).bold()
        );
        println!();
    }

    match runner.submit_batch(requests, args.mode).await {
        Ok(outcomes) => {
            if config.json {
                print_json(&outcomes)?;
            } else {
                for (label, outcome) in labels.iter().zip(&outcomes) {
                    print_outcome(label, outcome);
                }
            }
            Ok(())
        }
        Err(err) => {
            if config.json {
                print_json(&err)?;
            } else {
                let label = labels.get(err.index).map_or("batch", String::as_str);
                println!("{}", format!("Batch member {} failed:", err.index).red());
                print_error(label, &err.error);
            }
            bail!("Batch did not succeed")
        }
    }
}
