//! Error taxonomy shared by every phase of a job
//!
//! All failures a caller can observe are variants of [`JobError`]. Each maps
//! onto a closed [`ErrorKind`], which is what retry policies are written
//! against.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::JobOutcome;

/// Closed set of failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller used the reserved correlation input key
    ReservedInputKey,
    /// Request is malformed (empty org, repo, ...)
    InvalidRequest,
    /// Transport or API error from the remote platform
    Remote,
    /// No run carrying the correlation token is visible yet
    CorrelationNotFound,
    /// The run finished with a failure conclusion
    ActionFailed,
    /// A deadline fired
    Timeout,
    /// External cancellation
    Cancelled,
    /// The retry budget ran out
    RetriesExhausted,
    Internal,
}

impl ErrorKind {
    /// Kinds that no retry policy may retry
    pub fn is_non_retryable(self) -> bool {
        matches!(
            self,
            Self::ReservedInputKey
                | Self::InvalidRequest
                | Self::ActionFailed
                | Self::Cancelled
                | Self::RetriesExhausted
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReservedInputKey => "reserved_input_key",
            Self::InvalidRequest => "invalid_request",
            Self::Remote => "remote",
            Self::CorrelationNotFound => "correlation_not_found",
            Self::ActionFailed => "action_failed",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::RetriesExhausted => "retries_exhausted",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which deadline fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutKind {
    /// Overall phase deadline, including retries
    ScheduleToClose,
    /// Single attempt deadline
    StartToClose,
    /// No liveness signal within the heartbeat timeout
    Heartbeat,
}

impl fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ScheduleToClose => "schedule-to-close",
            Self::StartToClose => "start-to-close",
            Self::Heartbeat => "heartbeat",
        };
        f.write_str(s)
    }
}

/// Failure of a job or one of its phases
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobError {
    #[error("dispatch_id input is a reserved input key")]
    ReservedInputKey,

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Remote error{}: {message}", status_suffix(.status))]
    Remote {
        message: String,
        status: Option<u16>,
    },

    #[error("No run found for dispatch id {token}")]
    CorrelationNotFound { token: String },

    #[error("Action concluded with a failure: {}", .outcome.conclusion)]
    ActionFailed { outcome: JobOutcome },

    #[error("{activity} timed out ({timeout})")]
    Timeout {
        activity: String,
        timeout: TimeoutKind,
    },

    #[error("{scope} was cancelled")]
    Cancelled { scope: String },

    #[error("{activity} failed after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        activity: String,
        attempts: u32,
        last: Box<JobError>,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl JobError {
    pub fn remote(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Remote {
            message: message.into(),
            status,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn cancelled(scope: impl Into<String>) -> Self {
        Self::Cancelled {
            scope: scope.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ReservedInputKey => ErrorKind::ReservedInputKey,
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::Remote { .. } => ErrorKind::Remote,
            Self::CorrelationNotFound { .. } => ErrorKind::CorrelationNotFound,
            Self::ActionFailed { .. } => ErrorKind::ActionFailed,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Whether another attempt could succeed, ignoring policy limits
    ///
    /// Attempt-level timeouts are retryable; the overall deadline is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { timeout, .. } => *timeout != TimeoutKind::ScheduleToClose,
            other => !other.kind().is_non_retryable(),
        }
    }

    /// Outcome of a run that finished with a failure, if this error carries one
    pub fn outcome(&self) -> Option<&JobOutcome> {
        match self {
            Self::ActionFailed { outcome } => Some(outcome),
            Self::RetriesExhausted { last, .. } => last.outcome(),
            _ => None,
        }
    }

    /// Innermost error, looking through retry exhaustion
    pub fn root(&self) -> &JobError {
        match self {
            Self::RetriesExhausted { last, .. } => last.root(),
            other => other,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed_outcome() -> JobOutcome {
        JobOutcome {
            status: "completed".to_string(),
            conclusion: "failure".to_string(),
            url: "u".to_string(),
        }
    }

    #[test]
    fn test_non_retryable_kinds() {
        assert!(ErrorKind::ReservedInputKey.is_non_retryable());
        assert!(ErrorKind::ActionFailed.is_non_retryable());
        assert!(ErrorKind::Cancelled.is_non_retryable());
        assert!(!ErrorKind::Remote.is_non_retryable());
        assert!(!ErrorKind::CorrelationNotFound.is_non_retryable());
        assert!(!ErrorKind::Timeout.is_non_retryable());
    }

    #[test]
    fn test_timeout_retry_class_depends_on_deadline() {
        let attempt = JobError::Timeout {
            activity: "resolve".to_string(),
            timeout: TimeoutKind::StartToClose,
        };
        let overall = JobError::Timeout {
            activity: "resolve".to_string(),
            timeout: TimeoutKind::ScheduleToClose,
        };

        assert!(attempt.is_retryable());
        assert!(!overall.is_retryable());
    }

    #[test]
    fn test_outcome_survives_retry_exhaustion() {
        let err = JobError::RetriesExhausted {
            activity: "await_completion".to_string(),
            attempts: 1,
            last: Box::new(JobError::ActionFailed {
                outcome: failed_outcome(),
            }),
        };

        assert_eq!(err.outcome().unwrap().conclusion, "failure");
        assert_eq!(err.root().kind(), ErrorKind::ActionFailed);
    }

    #[test]
    fn test_error_serializes_with_kind_tag() {
        let err = JobError::CorrelationNotFound {
            token: "t".to_string(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "correlation_not_found");

        let back: JobError = serde_json::from_value(json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_remote_display_includes_status() {
        let err = JobError::remote("bad gateway", Some(502));
        assert_eq!(err.to_string(), "Remote error (status 502): bad gateway");
        assert_eq!(JobError::remote("reset", None).to_string(), "Remote error: reset");
    }
}
