//! Completion poller and batch scheduler
//!
//! [`run_job`] drives one request through
//! `Dispatching -> Resolving -> Polling -> Terminal`. The batch functions run
//! several requests either one after another or as concurrent members, each
//! in its own child scope.

use relay_core::domain::{CorrelationToken, JobOutcome, JobRequest, RunHandle};
use relay_core::policy::PhasePolicies;
use relay_core::{ErrorKind, JobError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{Instrument, error, info, info_span};

use crate::activities::Activities;
use crate::runtime::WorkflowContext;

/// Phase of a single job, used for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Dispatching,
    Resolving,
    Polling,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobPhase::Dispatching => "dispatching",
            JobPhase::Resolving => "resolving",
            JobPhase::Polling => "polling",
        };
        f.write_str(name)
    }
}

/// A batch stopped because one of its members failed
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("batch member {index} failed: {error}")]
pub struct BatchError {
    /// Position of the failing request in the batch
    pub index: usize,
    pub error: JobError,
}

impl BatchError {
    pub fn new(index: usize, error: JobError) -> Self {
        Self { index, error }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn outcome(&self) -> Option<&JobOutcome> {
        self.error.outcome()
    }
}

fn log_failure(request: &JobRequest, phase: JobPhase) -> impl Fn(&JobError) + '_ {
    move |e| error!(phase = %phase, "Job {} failed: {}", request.label(), e)
}

/// Runs one request to a terminal outcome
pub async fn run_job(
    ctx: &WorkflowContext,
    activities: &Activities,
    policies: &PhasePolicies,
    request: &JobRequest,
) -> Result<JobOutcome, JobError> {
    let token: CorrelationToken = ctx.side_effect(CorrelationToken::generate)?;
    let token = &token;

    info!(phase = %JobPhase::Dispatching, scope = ctx.scope(), "Dispatching {} ({})", request.label(), token);
    ctx.execute_activity("trigger", &policies.dispatch, |actx| async move {
        activities.trigger(&actx, request, token).await
    })
    .await
    .inspect_err(log_failure(request, JobPhase::Dispatching))?;

    info!(phase = %JobPhase::Resolving, "Resolving run for {}", token);
    let handle: RunHandle = ctx
        .execute_activity("resolve", &policies.resolve, |actx| async move {
            activities.resolve(&actx, request, token).await
        })
        .await
        .inspect_err(log_failure(request, JobPhase::Resolving))?;

    info!(phase = %JobPhase::Polling, run_id = %handle.run_id, "Waiting for run {}", handle.run_id);
    let poll_interval = policies.poll_interval;
    let handle = &handle;
    let outcome = ctx
        .execute_activity("await_completion", &policies.await_completion, |actx| async move {
            activities
                .await_completion(&actx, request, handle, poll_interval)
                .await
        })
        .await
        .inspect_err(log_failure(request, JobPhase::Polling))?;

    info!(
        run_id = %handle.run_id,
        conclusion = %outcome.conclusion,
        "Job {} finished",
        request.label()
    );
    Ok(outcome)
}

/// Runs requests one at a time
///
/// Stops at the first error; later requests are never dispatched and
/// earlier outcomes are discarded.
pub async fn run_sequential(
    ctx: &WorkflowContext,
    activities: &Activities,
    policies: &PhasePolicies,
    requests: &[JobRequest],
) -> Result<Vec<JobOutcome>, BatchError> {
    let mut outcomes = Vec::with_capacity(requests.len());

    for (index, request) in requests.iter().enumerate() {
        let member = ctx.child(index);
        let outcome = run_job(&member, activities, policies, request)
            .instrument(info_span!("member", index))
            .await
            .map_err(|e| BatchError::new(index, e))?;
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

/// Runs all requests at once
///
/// Outcomes are returned in request order. The first error fails the batch
/// and cancels the members still running.
pub async fn run_concurrent(
    ctx: &WorkflowContext,
    activities: Arc<Activities>,
    policies: Arc<PhasePolicies>,
    requests: Vec<JobRequest>,
) -> Result<Vec<JobOutcome>, BatchError> {
    let batch = ctx.child("batch");
    let mut slots: Vec<Option<JobOutcome>> = vec![None; requests.len()];
    let mut members = JoinSet::new();
    let mut task_index = HashMap::new();

    for (index, request) in requests.into_iter().enumerate() {
        let task = members.spawn(run_member(
            batch.child(index),
            Arc::clone(&activities),
            Arc::clone(&policies),
            index,
            request,
        ));
        task_index.insert(task.id(), index);
    }

    while let Some(joined) = members.join_next().await {
        let (index, result) = match joined {
            Ok(member) => member,
            Err(e) => {
                let index = task_index.get(&e.id()).copied().unwrap_or_default();
                (index, Err(JobError::internal(format!("batch member task failed: {e}"))))
            }
        };

        match result {
            Ok(outcome) => slots[index] = Some(outcome),
            Err(e) => {
                error!(index, "Batch member {} failed, cancelling the rest", index);
                batch.cancel();
                members.abort_all();
                return Err(BatchError::new(index, e));
            }
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.ok_or_else(|| {
                BatchError::new(index, JobError::internal("batch member produced no outcome"))
            })
        })
        .collect()
}

async fn run_member(
    ctx: WorkflowContext,
    activities: Arc<Activities>,
    policies: Arc<PhasePolicies>,
    index: usize,
    request: JobRequest,
) -> (usize, Result<JobOutcome, JobError>) {
    let result = run_job(&ctx, &activities, &policies, &request)
        .instrument(info_span!("member", index))
        .await;
    (index, result)
}
