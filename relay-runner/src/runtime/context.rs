//! Workflow-side context
//!
//! A [`WorkflowContext`] is one scope of a logical execution. Side effects
//! and activities take the next sequence number of their scope, so a
//! re-execution that makes the same calls in the same order hits the same
//! journal keys. Concurrent branches each get a [`child`](WorkflowContext::child)
//! scope, which keeps their keys independent of scheduling order.

use relay_core::policy::ActivityOptions;
use relay_core::{JobError, TimeoutKind};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::{self, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::activity::ActivityContext;
use super::journal::{Journal, JournalEntry};

const ROOT_SCOPE: &str = "root";

struct Scope {
    path: String,
    journal: Journal,
    sequence: AtomicU64,
    cancel: CancellationToken,
    /// Heartbeats observed under the root scope and all its children
    heartbeats: Arc<AtomicU64>,
}

/// Handle to one scope of a durable execution
#[derive(Clone)]
pub struct WorkflowContext {
    inner: Arc<Scope>,
}

impl fmt::Debug for WorkflowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowContext")
            .field("scope", &self.inner.path)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl WorkflowContext {
    /// Root context over `journal`
    ///
    /// Passing a journal that already holds entries replays them.
    pub fn new(journal: Journal) -> Self {
        Self::with_cancellation(journal, CancellationToken::new())
    }

    /// Root context cancelled together with `cancel`
    pub fn with_cancellation(journal: Journal, cancel: CancellationToken) -> Self {
        Self {
            inner: Arc::new(Scope {
                path: ROOT_SCOPE.to_string(),
                journal,
                sequence: AtomicU64::new(0),
                cancel,
                heartbeats: Arc::new(AtomicU64::new(0)),
            }),
        }
    }

    /// Nested scope for one branch of a fan-out
    ///
    /// Cancelling the parent cancels the child, not the other way round.
    pub fn child(&self, label: impl fmt::Display) -> Self {
        Self {
            inner: Arc::new(Scope {
                path: format!("{}/{}", self.inner.path, label),
                journal: self.inner.journal.clone(),
                sequence: AtomicU64::new(0),
                cancel: self.inner.cancel.child_token(),
                heartbeats: Arc::clone(&self.inner.heartbeats),
            }),
        }
    }

    pub fn scope(&self) -> &str {
        &self.inner.path
    }

    pub fn journal(&self) -> &Journal {
        &self.inner.journal
    }

    /// Total heartbeats recorded by activities of this execution
    pub fn heartbeat_count(&self) -> u64 {
        self.inner.heartbeats.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    fn next_key(&self, kind: &str) -> String {
        let seq = self.inner.sequence.fetch_add(1, Ordering::SeqCst);
        format!("{}/{}#{}", self.inner.path, kind, seq)
    }

    /// Runs `make` once per logical execution
    ///
    /// The first execution records the value; replays return the recorded
    /// value without calling `make`.
    pub fn side_effect<T, F>(&self, make: F) -> Result<T, JobError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        let key = self.next_key("side_effect");

        if let Some(JournalEntry::SideEffect { value }) = self.journal().get(&key) {
            debug!(key = %key, "Replaying side effect");
            return decode(&key, value);
        }

        let value = serde_json::to_value(make())
            .map_err(|e| JobError::internal(format!("side effect {key}: {e}")))?;
        match self
            .journal()
            .record(&key, JournalEntry::SideEffect { value })
        {
            JournalEntry::SideEffect { value } => decode(&key, value),
            other => Err(JobError::internal(format!(
                "journal key {key} holds {other:?}, expected a side effect"
            ))),
        }
    }

    /// Runs an activity under `options`
    ///
    /// Enforces the overall and per-attempt deadlines and the heartbeat
    /// timeout, retries according to the retry policy, and stops at
    /// cancellation. A completed result is journaled; replays return it
    /// without running the activity again.
    pub async fn execute_activity<T, F, Fut>(
        &self,
        name: &str,
        options: &ActivityOptions,
        activity: F,
    ) -> Result<T, JobError>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(ActivityContext) -> Fut,
        Fut: Future<Output = Result<T, JobError>>,
    {
        let key = self.next_key(&format!("activity:{name}"));

        if let Some(JournalEntry::ActivityCompleted { result, .. }) = self.journal().get(&key) {
            debug!(key = %key, "Replaying completed activity");
            return decode(&key, result);
        }

        let deadline = Instant::now() + options.schedule_to_close;
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            if self.is_cancelled() {
                return Err(JobError::cancelled(name));
            }

            let err = match self.run_attempt(name, attempt, options, deadline, &activity).await {
                Ok(value) => {
                    let result = serde_json::to_value(&value)
                        .map_err(|e| JobError::internal(format!("activity {key}: {e}")))?;
                    self.journal().record(
                        &key,
                        JournalEntry::ActivityCompleted {
                            activity: name.to_string(),
                            result,
                        },
                    );
                    if attempt > 1 {
                        info!(activity = name, attempt, "Activity succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_retryable() || options.retry.non_retryable.contains(&err.kind()) {
                return Err(err);
            }

            if !options.retry.allows_retry(&err, attempt) {
                warn!(activity = name, attempt, "Retry budget exhausted: {}", err);
                return Err(JobError::RetriesExhausted {
                    activity: name.to_string(),
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let delay = options.retry.backoff_for(attempt);
            if Instant::now() + delay >= deadline {
                warn!(activity = name, attempt, "No time left for another attempt: {}", err);
                return Err(JobError::Timeout {
                    activity: name.to_string(),
                    timeout: TimeoutKind::ScheduleToClose,
                });
            }

            warn!(
                activity = name,
                attempt,
                "Attempt failed: {}. Retrying in {:?}",
                err,
                delay
            );

            tokio::select! {
                _ = self.inner.cancel.cancelled() => return Err(JobError::cancelled(name)),
                _ = time::sleep(delay) => {}
            }
        }
    }

    async fn run_attempt<T, F, Fut>(
        &self,
        name: &str,
        attempt: u32,
        options: &ActivityOptions,
        deadline: Instant,
        activity: &F,
    ) -> Result<T, JobError>
    where
        F: Fn(ActivityContext) -> Fut,
        Fut: Future<Output = Result<T, JobError>>,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = self.inner.cancel.child_token();
        let actx = ActivityContext::new(
            name,
            attempt,
            tx,
            Arc::clone(&self.inner.heartbeats),
            cancel.clone(),
        );

        let attempt_deadline = options
            .start_to_close
            .map(|limit| (Instant::now() + limit).min(deadline));

        debug!(activity = name, attempt, "Starting attempt");

        let timeout = |timeout| JobError::Timeout {
            activity: name.to_string(),
            timeout,
        };

        let result = tokio::select! {
            biased;

            _ = cancel.cancelled() => Err(JobError::cancelled(name)),
            result = activity(actx) => result,
            _ = time::sleep_until(deadline) => Err(timeout(TimeoutKind::ScheduleToClose)),
            _ = sleep_until_opt(attempt_deadline) => Err(timeout(TimeoutKind::StartToClose)),
            _ = watch_heartbeats(&mut rx, options.heartbeat_timeout) => Err(timeout(TimeoutKind::Heartbeat)),
        };

        // Abandoned attempts must stop at their next suspension point
        cancel.cancel();
        result
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Completes when no heartbeat arrived within `timeout`
async fn watch_heartbeats(rx: &mut UnboundedReceiver<Value>, timeout: Option<Duration>) {
    let Some(timeout) = timeout else {
        return std::future::pending().await;
    };

    loop {
        match time::timeout(timeout, rx.recv()).await {
            Ok(Some(_)) => continue,
            Ok(None) => return std::future::pending().await,
            Err(_) => return,
        }
    }
}

fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, JobError> {
    serde_json::from_value(value)
        .map_err(|e| JobError::internal(format!("journal entry {key} does not decode: {e}")))
}
