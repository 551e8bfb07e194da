//! Job-level operations over the Actions endpoints
//!
//! [`ActionsClient`] adds the correlation search on top of the raw
//! [`ActionsApi`]. None of these operations retry; every error is returned
//! to the caller as-is.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use relay_core::domain::{CorrelationToken, RunHandle, RunId, RunStatus};
use std::collections::BTreeMap;
use std::pin::pin;
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::{ActionsApi, WorkflowJob, WorkflowRun};
use crate::error::{ClientError, Result};
use crate::paginate::paginate;

/// Client for dispatching and tracking workflow runs
#[derive(Clone)]
pub struct ActionsClient {
    api: Arc<dyn ActionsApi>,
}

impl std::fmt::Debug for ActionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionsClient").finish_non_exhaustive()
    }
}

impl ActionsClient {
    pub fn new(api: impl ActionsApi + 'static) -> Self {
        Self { api: Arc::new(api) }
    }

    pub fn from_arc(api: Arc<dyn ActionsApi>) -> Self {
        Self { api }
    }

    /// Fires a workflow dispatch
    ///
    /// Success means the platform accepted the event; the run id is not
    /// known until [`resolve_run_id`](Self::resolve_run_id) finds it.
    pub async fn dispatch(
        &self,
        org: &str,
        repo: &str,
        workflow_file: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<()> {
        self.api
            .dispatch(org, repo, workflow_file, git_ref, inputs)
            .await?;
        info!(org, repo, workflow_file, git_ref, "Dispatched workflow");
        Ok(())
    }

    /// Finds the run whose steps mention `token`
    ///
    /// Walks runs newest first, then each run's jobs, then each job's steps,
    /// and stops at the first step whose name contains the token.
    pub async fn resolve_run_id(
        &self,
        org: &str,
        repo: &str,
        workflow_file: &str,
        git_ref: &str,
        token: &CorrelationToken,
    ) -> Result<RunId> {
        let mut runs = pin!(self.iterate_runs(org, repo, workflow_file));
        let mut scanned = 0usize;

        while let Some(run) = runs.next().await {
            let run = run?;
            scanned += 1;

            let mut jobs = pin!(self.iterate_jobs(org, repo, run.run_id()));
            while let Some(job) = jobs.next().await {
                if job?.has_step_containing(token.as_str()) {
                    info!(
                        org, repo, workflow_file, git_ref, run_id = run.id,
                        "Resolved dispatch {} to run {}", token, run.id
                    );
                    return Ok(run.run_id());
                }
            }
        }

        debug!(org, repo, workflow_file, scanned, "No run carries dispatch {}", token);
        Err(ClientError::CorrelationNotFound(token.to_string()))
    }

    /// Fetches the current status of a run
    pub async fn get_status(&self, handle: &RunHandle) -> Result<RunStatus> {
        let run = self
            .api
            .get_run(&handle.org, &handle.repo, handle.run_id)
            .await?;
        Ok(run.to_status())
    }

    /// Streams the `workflow_dispatch` runs of a workflow file
    pub fn iterate_runs(
        &self,
        org: &str,
        repo: &str,
        workflow_file: &str,
    ) -> impl Stream<Item = Result<WorkflowRun>> + Send + 'static {
        let api = Arc::clone(&self.api);
        let (org, repo, workflow_file) =
            (org.to_string(), repo.to_string(), workflow_file.to_string());

        paginate(move |page| {
            let api = Arc::clone(&api);
            let (org, repo, workflow_file) = (org.clone(), repo.clone(), workflow_file.clone());
            async move { api.list_runs(&org, &repo, &workflow_file, page).await }
        })
    }

    /// Streams the latest jobs of a run
    pub fn iterate_jobs(
        &self,
        org: &str,
        repo: &str,
        run_id: RunId,
    ) -> impl Stream<Item = Result<WorkflowJob>> + Send + 'static {
        let api = Arc::clone(&self.api);
        let (org, repo) = (org.to_string(), repo.to_string());

        paginate(move |page| {
            let api = Arc::clone(&api);
            let (org, repo) = (org.clone(), repo.clone());
            async move { api.list_jobs(&org, &repo, run_id, page).await }
        })
    }
}

/// Opens an [`ActionsClient`] for one request
///
/// A client is created per request; sessions are not shared between
/// concurrent jobs.
#[async_trait]
pub trait ConnectActions: Send + Sync {
    async fn connect(&self, org: &str, repo: &str) -> Result<ActionsClient>;
}
