//! Terminal output helpers

use anyhow::Result;
use colored::*;
use relay_core::JobError;
use relay_core::domain::{JobOutcome, RunHandle, RunStatus};
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Colorize a run conclusion for display
pub fn colorize_conclusion(conclusion: &str) -> ColoredString {
    match conclusion {
        "success" => conclusion.green(),
        "failure" | "timed_out" => conclusion.red(),
        "cancelled" | "skipped" | "neutral" => conclusion.yellow(),
        "" => "-".dimmed(),
        other => other.normal(),
    }
}

fn colorize_status(status: &str) -> ColoredString {
    match status {
        "completed" => status.green(),
        "queued" | "waiting" | "requested" | "pending" => status.yellow(),
        _ => status.cyan(),
    }
}

pub fn print_outcome(label: &str, outcome: &JobOutcome) {
    let marker = if outcome.is_success() {
        "✓".green()
    } else {
        "•".yellow()
    };

    println!("  {} {}", marker, label.bold());
    println!("    Status:     {}", colorize_status(&outcome.status));
    println!("    Conclusion: {}", colorize_conclusion(&outcome.conclusion));
    println!("    URL:        {}", outcome.url.dimmed());
}

pub fn print_status(handle: &RunHandle, status: &RunStatus) {
    println!(
        "{}",
        format!("Run {} ({}/{})", handle.run_id, handle.org, handle.repo).bold()
    );
    println!("  Status:     {}", colorize_status(&status.status));
    println!("  Conclusion: {}", colorize_conclusion(&status.conclusion));
    println!("  Running:    {}", status.is_running());
    println!("  URL:        {}", status.url.dimmed());
    if !status.html_url.is_empty() {
        println!("  Web:        {}", status.html_url.dimmed());
    }
}

/// Print a job error, including the run outcome when one is attached
pub fn print_error(label: &str, err: &JobError) {
    println!("  {} {}", "✗".red(), label.bold());
    println!("    Error:      {} ({})", err.to_string().red(), err.kind());
    if let Some(outcome) = err.outcome() {
        println!("    Conclusion: {}", colorize_conclusion(&outcome.conclusion));
        println!("    URL:        {}", outcome.url.dimmed());
    }
}
