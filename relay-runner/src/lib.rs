//! Relay Runner
//!
//! Triggers GitHub Actions workflow runs and follows them to a terminal
//! outcome.
//!
//! Architecture:
//! - Runtime: replay journal, side effects and policy-driven activity execution
//! - Activities: dispatch, correlation lookup and completion polling
//! - Workflow: the per-job state machine and the batch scheduler
//! - Configuration: API settings and phase tuning from the environment
//!
//! [`Runner`] is the caller-facing entry point.

pub mod activities;
pub mod config;
pub mod runtime;
pub mod workflow;

use relay_client::{ConnectActions, GitHubConnector};
use relay_core::JobError;
use relay_core::domain::{JobOutcome, JobRequest};
use relay_core::policy::PhasePolicies;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use activities::Activities;
pub use config::RunnerConfig;
pub use runtime::{ActivityContext, Journal, JournalEntry, WorkflowContext};
pub use workflow::BatchError;

/// How a batch of requests is executed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// One request at a time, stopping at the first error
    #[default]
    Sequential,
    /// All requests at once, outcomes in request order
    Concurrent,
}

impl FromStr for BatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(BatchMode::Sequential),
            "concurrent" => Ok(BatchMode::Concurrent),
            other => Err(format!(
                "unknown batch mode '{}', expected 'sequential' or 'concurrent'",
                other
            )),
        }
    }
}

/// Submits requests and waits for their outcomes
///
/// Every submission is a fresh logical execution with its own journal.
/// Cancelling the runner's token stops all of them.
#[derive(Debug, Clone)]
pub struct Runner {
    activities: Arc<Activities>,
    policies: Arc<PhasePolicies>,
    cancel: CancellationToken,
}

impl Runner {
    pub fn new(connector: Arc<dyn ConnectActions>, policies: PhasePolicies) -> Self {
        Self {
            activities: Arc::new(Activities::from_arc(connector)),
            policies: Arc::new(policies),
            cancel: CancellationToken::new(),
        }
    }

    /// Builds a runner talking to the GitHub API
    pub fn from_config(config: &RunnerConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let connector = GitHubConnector::new(config.github_config());
        Ok(Self::new(Arc::new(connector), config.policies()))
    }

    pub fn policies(&self) -> &PhasePolicies {
        &self.policies
    }

    /// Token that cancels every in-flight submission
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn context(&self) -> WorkflowContext {
        WorkflowContext::with_cancellation(Journal::new(), self.cancel.child_token())
    }

    /// Runs one request to completion
    pub async fn submit(&self, request: &JobRequest) -> Result<JobOutcome, JobError> {
        workflow::run_job(&self.context(), &self.activities, &self.policies, request).await
    }

    /// Runs a batch; outcomes are returned in request order
    pub async fn submit_batch(
        &self,
        requests: Vec<JobRequest>,
        mode: BatchMode,
    ) -> Result<Vec<JobOutcome>, BatchError> {
        info!(count = requests.len(), ?mode, "Submitting batch");
        let ctx = self.context();

        match mode {
            BatchMode::Sequential => {
                workflow::run_sequential(&ctx, &self.activities, &self.policies, &requests).await
            }
            BatchMode::Concurrent => {
                workflow::run_concurrent(
                    &ctx,
                    Arc::clone(&self.activities),
                    Arc::clone(&self.policies),
                    requests,
                )
                .await
            }
        }
    }
}
