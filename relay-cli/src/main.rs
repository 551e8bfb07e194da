//! Relay CLI
//!
//! Command-line interface for triggering GitHub Actions workflow runs and
//! waiting for their outcome.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Trigger GitHub Actions workflows and track them to completion", long_about = None)]
struct Cli {
    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL")]
    api_url: Option<String>,

    /// Token used for API requests
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Seconds between status checks of a live run
    #[arg(long, env = "RELAY_POLL_INTERVAL")]
    poll_interval: Option<u64>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config::load(cli.api_url, cli.token, cli.poll_interval, cli.json)?;

    handle_command(cli.command, &config).await
}
