//! Retry and timeout policy
//!
//! Each phase of a job (dispatch, resolve, await completion) runs as one
//! activity under an [`ActivityOptions`]. The runtime that executes the
//! activity enforces these; nothing in the job logic retries on its own.

use std::time::Duration;

use crate::error::{ErrorKind, JobError};

/// How a failed activity attempt is retried
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub initial_interval: Duration,
    /// Multiplier applied to the delay after each retry
    pub backoff_coefficient: f64,
    /// Upper bound on the delay between retries
    pub maximum_interval: Duration,
    /// Total attempts including the first; `None` means unbounded
    pub maximum_attempts: Option<u32>,
    /// Kinds never retried under this policy, in addition to the kinds
    /// that are never retried anywhere
    pub non_retryable: Vec<ErrorKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        let initial_interval = Duration::from_secs(1);
        Self {
            initial_interval,
            backoff_coefficient: 2.0,
            maximum_interval: initial_interval * 100,
            maximum_attempts: None,
            non_retryable: Vec::new(),
        }
    }
}

impl RetryPolicy {
    pub fn with_maximum_interval(mut self, interval: Duration) -> Self {
        self.maximum_interval = interval;
        self
    }

    pub fn with_maximum_attempts(mut self, attempts: u32) -> Self {
        self.maximum_attempts = Some(attempts);
        self
    }

    pub fn with_non_retryable(mut self, kind: ErrorKind) -> Self {
        if !self.non_retryable.contains(&kind) {
            self.non_retryable.push(kind);
        }
        self
    }

    /// Delay before retrying after `attempt` failed (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let factor = self.backoff_coefficient.max(1.0).powi(exponent);
        let delay = self.initial_interval.as_secs_f64() * factor;
        let capped = delay.min(self.maximum_interval.as_secs_f64());

        Duration::from_secs_f64(capped)
    }

    /// Whether `error` from attempt number `attempt` may be retried
    pub fn allows_retry(&self, error: &JobError, attempt: u32) -> bool {
        if !error.is_retryable() || self.non_retryable.contains(&error.kind()) {
            return false;
        }

        match self.maximum_attempts {
            Some(max) => attempt < max,
            None => true,
        }
    }
}

/// Timeouts and retry behaviour of one activity
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityOptions {
    /// Deadline for the whole activity, including retries
    pub schedule_to_close: Duration,
    /// Deadline for a single attempt
    pub start_to_close: Option<Duration>,
    /// Longest allowed gap between heartbeats
    pub heartbeat_timeout: Option<Duration>,
    pub retry: RetryPolicy,
}

impl ActivityOptions {
    /// Options for dispatching the workflow run
    pub fn dispatch() -> Self {
        Self {
            schedule_to_close: Duration::from_secs(45 * 60),
            start_to_close: Some(Duration::from_secs(10 * 60)),
            heartbeat_timeout: None,
            retry: RetryPolicy::default()
                .with_maximum_interval(Duration::from_secs(10))
                .with_maximum_attempts(3)
                .with_non_retryable(ErrorKind::ReservedInputKey),
        }
    }

    /// Options for resolving the correlation token to a run id
    pub fn resolve() -> Self {
        Self {
            schedule_to_close: Duration::from_secs(3 * 60),
            start_to_close: Some(Duration::from_secs(30)),
            heartbeat_timeout: None,
            retry: RetryPolicy::default()
                .with_maximum_interval(Duration::from_secs(10))
                .with_maximum_attempts(3),
        }
    }

    /// Options for polling the run until it finishes
    pub fn await_completion() -> Self {
        Self {
            schedule_to_close: Duration::from_secs(60 * 60),
            start_to_close: None,
            heartbeat_timeout: Some(Duration::from_secs(60)),
            retry: RetryPolicy::default().with_non_retryable(ErrorKind::ActionFailed),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.schedule_to_close.is_zero() {
            return Err("schedule_to_close must be greater than 0".to_string());
        }

        if let Some(attempt) = self.start_to_close {
            if attempt.is_zero() {
                return Err("start_to_close must be greater than 0".to_string());
            }
            if attempt > self.schedule_to_close {
                return Err("start_to_close cannot exceed schedule_to_close".to_string());
            }
        }

        if let Some(heartbeat) = self.heartbeat_timeout {
            if heartbeat.is_zero() {
                return Err("heartbeat_timeout must be greater than 0".to_string());
            }
        }

        if self.retry.maximum_attempts == Some(0) {
            return Err("maximum_attempts must be at least 1".to_string());
        }

        if self.retry.initial_interval > self.retry.maximum_interval {
            return Err("initial_interval cannot exceed maximum_interval".to_string());
        }

        Ok(())
    }
}

/// Policies for all phases of a job plus the poll interval
#[derive(Debug, Clone, PartialEq)]
pub struct PhasePolicies {
    pub dispatch: ActivityOptions,
    pub resolve: ActivityOptions,
    pub await_completion: ActivityOptions,
    /// Time between status checks while the run is live
    pub poll_interval: Duration,
}

impl Default for PhasePolicies {
    fn default() -> Self {
        Self {
            dispatch: ActivityOptions::dispatch(),
            resolve: ActivityOptions::resolve(),
            await_completion: ActivityOptions::await_completion(),
            poll_interval: Duration::from_secs(10),
        }
    }
}

impl PhasePolicies {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Validates every phase and the liveness constraint
    ///
    /// A heartbeat is sent once per poll interval, so the interval must be
    /// shorter than the heartbeat timeout or live runs are declared dead.
    pub fn validate(&self) -> Result<(), String> {
        self.dispatch
            .validate()
            .map_err(|e| format!("dispatch: {e}"))?;
        self.resolve.validate().map_err(|e| format!("resolve: {e}"))?;
        self.await_completion
            .validate()
            .map_err(|e| format!("await_completion: {e}"))?;

        if self.poll_interval.is_zero() {
            return Err("poll_interval must be greater than 0".to_string());
        }

        if let Some(heartbeat) = self.await_completion.heartbeat_timeout {
            if self.poll_interval >= heartbeat {
                return Err(format!(
                    "poll_interval ({:?}) must be shorter than the heartbeat timeout ({:?})",
                    self.poll_interval, heartbeat
                ));
            }
        }

        Ok(())
    }
}
