//! Terminal outcome and liveness payloads

use serde::{Deserialize, Serialize};

use super::run::{RunId, RunStatus};

/// Final result of a dispatched run
///
/// Only ever built from a terminal [`RunStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub status: String,
    pub conclusion: String,
    pub url: String,
}

impl JobOutcome {
    /// Returns `None` while the run is still running
    pub fn from_terminal(status: &RunStatus) -> Option<Self> {
        if status.is_running() {
            return None;
        }

        Some(Self {
            status: status.status.clone(),
            conclusion: status.conclusion.clone(),
            url: status.url.clone(),
        })
    }

    pub fn is_success(&self) -> bool {
        self.conclusion == "success"
    }
}

/// Liveness signal emitted while waiting on a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub run_id: RunId,
    pub status: String,
    pub conclusion: String,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

impl Heartbeat {
    pub fn observed(run_id: RunId, status: &RunStatus) -> Self {
        Self {
            run_id,
            status: status.status.clone(),
            conclusion: status.conclusion.clone(),
            recorded_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_requires_terminal_status() {
        let mut status = RunStatus {
            status: "in_progress".to_string(),
            conclusion: String::new(),
            url: "u".to_string(),
            html_url: String::new(),
        };
        assert!(JobOutcome::from_terminal(&status).is_none());

        status.status = "completed".to_string();
        status.conclusion = "success".to_string();
        let outcome = JobOutcome::from_terminal(&status).unwrap();
        assert_eq!(outcome.url, "u");
        assert!(outcome.is_success());
    }
}
