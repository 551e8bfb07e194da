//! Runner configuration
//!
//! Connection settings for the Actions API plus the tunable parts of the
//! phase policies.

use relay_client::GitHubConfig;
use relay_client::github::DEFAULT_API_URL;
use relay_core::policy::PhasePolicies;
use std::time::Duration;

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Actions API base URL (e.g., "https://api.github.com")
    pub github_api_url: String,

    /// Bearer token; requests are unauthenticated without one
    pub github_token: Option<String>,

    pub user_agent: String,

    /// Timeout for a single HTTP request
    pub request_timeout: Duration,

    /// How often a live run is re-checked
    pub poll_interval: Duration,

    /// Longest allowed gap between heartbeats while polling
    pub heartbeat_timeout: Duration,

    /// Overall deadline for waiting on a run
    pub completion_timeout: Duration,
}

impl RunnerConfig {
    /// Creates a configuration with defaults for the given API
    pub fn new(github_api_url: String, github_token: Option<String>) -> Self {
        let github = GitHubConfig::default();
        let policies = PhasePolicies::default();

        Self {
            github_api_url,
            github_token,
            user_agent: github.user_agent,
            request_timeout: github.request_timeout,
            poll_interval: policies.poll_interval,
            heartbeat_timeout: policies
                .await_completion
                .heartbeat_timeout
                .unwrap_or(Duration::from_secs(60)),
            completion_timeout: policies.await_completion.schedule_to_close,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - GITHUB_TOKEN (optional)
    /// - GITHUB_API_URL (optional, default: https://api.github.com)
    /// - RELAY_USER_AGENT (optional)
    /// - RELAY_POLL_INTERVAL (optional, seconds, default: 10)
    /// - RELAY_REQUEST_TIMEOUT (optional, seconds, default: 30)
    pub fn from_env() -> anyhow::Result<Self> {
        let github_api_url =
            std::env::var("GITHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let github_token = std::env::var("GITHUB_TOKEN")
            .ok()
            .filter(|token| !token.is_empty());

        let mut config = Self::new(github_api_url, github_token);

        if let Ok(user_agent) = std::env::var("RELAY_USER_AGENT") {
            config.user_agent = user_agent;
        }

        if let Some(secs) = env_secs("RELAY_POLL_INTERVAL")? {
            config.poll_interval = Duration::from_secs(secs);
        }

        if let Some(secs) = env_secs("RELAY_REQUEST_TIMEOUT")? {
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.github_api_url.is_empty() {
            anyhow::bail!("github_api_url cannot be empty");
        }

        if !self.github_api_url.starts_with("http://") && !self.github_api_url.starts_with("https://")
        {
            anyhow::bail!("github_api_url must start with http:// or https://");
        }

        if self.user_agent.is_empty() {
            anyhow::bail!("user_agent cannot be empty");
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if let Err(e) = self.policies().validate() {
            anyhow::bail!("invalid phase policies: {}", e);
        }

        // Heartbeats are at most one poll interval plus one status request apart
        if self.poll_interval + self.request_timeout >= self.heartbeat_timeout {
            anyhow::bail!(
                "poll_interval ({:?}) plus request_timeout ({:?}) must be shorter than heartbeat_timeout ({:?})",
                self.poll_interval,
                self.request_timeout,
                self.heartbeat_timeout
            );
        }

        Ok(())
    }

    /// Settings for the HTTP client
    pub fn github_config(&self) -> GitHubConfig {
        GitHubConfig {
            api_url: self.github_api_url.clone(),
            token: self.github_token.clone(),
            user_agent: self.user_agent.clone(),
            request_timeout: self.request_timeout,
        }
    }

    /// Phase policies with the configured overrides applied
    pub fn policies(&self) -> PhasePolicies {
        let mut policies = PhasePolicies::default().with_poll_interval(self.poll_interval);
        policies.await_completion.heartbeat_timeout = Some(self.heartbeat_timeout);
        policies.await_completion.schedule_to_close = self.completion_timeout;
        policies
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL.to_string(), None)
    }
}

fn env_secs(name: &str) -> anyhow::Result<Option<u64>> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} must be a number of seconds: {}", name, e)),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert_eq!(config.github_api_url, "https://api.github.com");
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(60));
        assert!(config.github_token.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = RunnerConfig::default();

        config.github_api_url = "not-a-url".to_string();
        assert!(config.validate().is_err());

        config.github_api_url = "http://localhost:8080".to_string();
        assert!(config.validate().is_ok());

        // Polling must stay inside the heartbeat window
        config.poll_interval = Duration::from_secs(60);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_slow_status_requests_count_against_heartbeat_window() {
        // 50s poll alone fits a 60s window, but not with a 30s request on top
        let config = RunnerConfig::default().with_poll_interval(Duration::from_secs(50));
        assert!(config.policies().validate().is_ok());
        assert!(config.validate().is_err());

        let mut config = RunnerConfig::default().with_poll_interval(Duration::from_secs(25));
        assert!(config.validate().is_ok());

        config.request_timeout = Duration::from_secs(35);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_policies_carry_overrides() {
        let mut config = RunnerConfig::default().with_poll_interval(Duration::from_secs(2));
        config.completion_timeout = Duration::from_secs(300);

        let policies = config.policies();
        assert_eq!(policies.poll_interval, Duration::from_secs(2));
        assert_eq!(
            policies.await_completion.schedule_to_close,
            Duration::from_secs(300)
        );
        assert_eq!(policies.dispatch, PhasePolicies::default().dispatch);
    }

    #[test]
    fn test_github_config() {
        let config = RunnerConfig::new("http://ghe.local/api/v3".to_string(), Some("t".into()));
        let github = config.github_config();
        assert_eq!(github.api_url, "http://ghe.local/api/v3");
        assert_eq!(github.token.as_deref(), Some("t"));
    }
}
