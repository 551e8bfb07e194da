//! Configuration module
//!
//! Merges command-line flags over the runner's environment configuration.

use anyhow::{Context, Result};
use relay_runner::RunnerConfig;
use std::time::Duration;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub runner: RunnerConfig,
    /// Print machine-readable output
    pub json: bool,
}

impl Config {
    /// Loads the environment configuration and applies flag overrides
    pub fn load(
        api_url: Option<String>,
        token: Option<String>,
        poll_interval: Option<u64>,
        json: bool,
    ) -> Result<Self> {
        let mut runner = RunnerConfig::from_env().context("Failed to load configuration")?;

        if let Some(api_url) = api_url {
            runner.github_api_url = api_url.trim_end_matches('/').to_string();
        }
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            runner.github_token = Some(token);
        }
        if let Some(secs) = poll_interval {
            runner.poll_interval = Duration::from_secs(secs);
        }

        runner.validate().context("Invalid configuration")?;

        Ok(Self { runner, json })
    }
}
