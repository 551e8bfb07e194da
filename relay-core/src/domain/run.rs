//! Remote run domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Statuses after which a run never changes again
///
/// https://docs.github.com/en/rest/actions/workflow-runs?apiVersion=2022-11-28#list-workflow-runs-for-a-repository
pub const TERMINAL_STATES: &[&str] = &[
    "completed",
    "cancelled",
    "failure",
    "neutral",
    "skipped",
    "success",
    "timed_out",
];

/// Conclusions that count as a failed run
pub const FAILURE_CONCLUSIONS: &[&str] = &["failure", "timed_out"];

/// Platform-assigned run identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub i64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resolved run together with the repository that owns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHandle {
    pub run_id: RunId,
    pub org: String,
    pub repo: String,
}

impl RunHandle {
    pub fn new(run_id: RunId, org: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            run_id,
            org: org.into(),
            repo: repo.into(),
        }
    }
}

/// Point-in-time view of a run, re-fetched on every poll
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    pub status: String,
    /// Empty until the run reaches a terminal status
    #[serde(default)]
    pub conclusion: String,
    /// Canonical API URL of the run
    pub url: String,
    #[serde(default)]
    pub html_url: String,
}

impl RunStatus {
    /// A run is running while its status is not terminal.
    ///
    /// Unknown statuses count as running.
    pub fn is_running(&self) -> bool {
        !TERMINAL_STATES.contains(&self.status.as_str())
    }

    pub fn is_failure(&self) -> bool {
        FAILURE_CONCLUSIONS.contains(&self.conclusion.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: &str, conclusion: &str) -> RunStatus {
        RunStatus {
            status: status.to_string(),
            conclusion: conclusion.to_string(),
            url: "https://api.github.com/repos/o/r/actions/runs/1".to_string(),
            html_url: String::new(),
        }
    }

    #[test]
    fn test_running_statuses() {
        assert!(status("queued", "").is_running());
        assert!(status("in_progress", "").is_running());
        assert!(status("waiting", "").is_running());
        assert!(status("some_future_status", "").is_running());
        assert!(!status("completed", "success").is_running());
        assert!(!status("cancelled", "").is_running());
    }

    #[test]
    fn test_failure_conclusions() {
        assert!(status("completed", "failure").is_failure());
        assert!(status("completed", "timed_out").is_failure());
        assert!(!status("completed", "success").is_failure());
        assert!(!status("completed", "cancelled").is_failure());
        assert!(!status("in_progress", "").is_failure());
    }
}
