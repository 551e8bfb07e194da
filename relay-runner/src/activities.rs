//! The three remote phases of a job
//!
//! Each method is one attempt of an activity. They never retry on their own;
//! the runtime re-invokes them according to the phase's options.

use relay_client::{ActionsClient, ConnectActions};
use relay_core::JobError;
use relay_core::domain::{CorrelationToken, Heartbeat, JobOutcome, JobRequest, RunHandle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::runtime::ActivityContext;

/// Activity implementations backed by a connector
#[derive(Clone)]
pub struct Activities {
    connector: Arc<dyn ConnectActions>,
}

impl std::fmt::Debug for Activities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Activities").finish_non_exhaustive()
    }
}

impl Activities {
    pub fn new(connector: impl ConnectActions + 'static) -> Self {
        Self {
            connector: Arc::new(connector),
        }
    }

    pub fn from_arc(connector: Arc<dyn ConnectActions>) -> Self {
        Self { connector }
    }

    async fn connect(&self, request: &JobRequest) -> Result<ActionsClient, JobError> {
        Ok(self.connector.connect(&request.org, &request.repo).await?)
    }

    /// Dispatches the run with the token injected under the reserved key
    ///
    /// A request that already uses the reserved key fails before any
    /// remote call.
    pub async fn trigger(
        &self,
        actx: &ActivityContext,
        request: &JobRequest,
        token: &CorrelationToken,
    ) -> Result<(), JobError> {
        let inputs = request.dispatch_inputs(token)?;
        let client = self.connect(request).await?;

        debug!(attempt = actx.attempt(), "Dispatching {} with token {}", request.label(), token);

        client
            .dispatch(
                &request.org,
                &request.repo,
                &request.workflow_file,
                &request.git_ref,
                &inputs,
            )
            .await?;
        Ok(())
    }

    /// Finds the run created by the dispatch carrying `token`
    pub async fn resolve(
        &self,
        actx: &ActivityContext,
        request: &JobRequest,
        token: &CorrelationToken,
    ) -> Result<RunHandle, JobError> {
        let client = self.connect(request).await?;

        debug!(attempt = actx.attempt(), "Resolving token {} for {}", token, request.label());

        let run_id = client
            .resolve_run_id(
                &request.org,
                &request.repo,
                &request.workflow_file,
                &request.git_ref,
                token,
            )
            .await?;
        Ok(RunHandle::new(run_id, &request.org, &request.repo))
    }

    /// Polls the run until it reaches a terminal state
    ///
    /// Heartbeats after every live observation, then sleeps
    /// `poll_interval`. Heartbeats are therefore at most one poll interval
    /// plus one status request apart. A failure conclusion is returned as
    /// [`JobError::ActionFailed`].
    pub async fn await_completion(
        &self,
        actx: &ActivityContext,
        request: &JobRequest,
        handle: &RunHandle,
        poll_interval: Duration,
    ) -> Result<JobOutcome, JobError> {
        let client = self.connect(request).await?;

        loop {
            let status = client.get_status(handle).await?;

            if let Some(outcome) = JobOutcome::from_terminal(&status) {
                info!(
                    run_id = %handle.run_id,
                    conclusion = %outcome.conclusion,
                    "Run {} finished",
                    handle.run_id
                );
                if status.is_failure() {
                    return Err(JobError::ActionFailed { outcome });
                }
                return Ok(outcome);
            }

            debug!(run_id = %handle.run_id, status = %status.status, "Run still live");
            actx.heartbeat(&Heartbeat::observed(handle.run_id, &status));

            tokio::select! {
                _ = actx.cancelled() => return Err(JobError::cancelled(actx.name())),
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }
    }
}
