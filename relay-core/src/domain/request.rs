//! Job request domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::error::JobError;

/// Input key the runner injects into every dispatch to correlate the run.
///
/// Callers must not use it in their own inputs.
pub const RESERVED_INPUT_KEY: &str = "dispatch_id";

/// A single workflow input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputPair {
    pub key: String,
    pub value: String,
}

impl InputPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Request to run one workflow file on a repository
///
/// Immutable once built; every component reads it by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Organization (or user) that owns the repository
    pub org: String,
    /// Repository name
    pub repo: String,
    /// Git reference the workflow runs on (branch or tag)
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// Workflow definition file, e.g. `wait-and-echo.yaml`
    pub workflow_file: String,
    /// Ordered workflow inputs
    #[serde(default)]
    pub inputs: Vec<InputPair>,
}

impl JobRequest {
    pub fn new(
        org: impl Into<String>,
        repo: impl Into<String>,
        git_ref: impl Into<String>,
        workflow_file: impl Into<String>,
    ) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
            git_ref: git_ref.into(),
            workflow_file: workflow_file.into(),
            inputs: Vec::new(),
        }
    }

    /// Appends an input, keeping insertion order
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs.push(InputPair::new(key, value));
        self
    }

    /// Checks the request before anything is sent to the platform
    pub fn validate(&self) -> Result<(), JobError> {
        let fields = [
            ("org", &self.org),
            ("repo", &self.repo),
            ("ref", &self.git_ref),
            ("workflow_file", &self.workflow_file),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(JobError::invalid_request(format!("{name} cannot be empty")));
            }
        }

        if self.uses_reserved_key() {
            return Err(JobError::ReservedInputKey);
        }

        Ok(())
    }

    /// Whether the caller's inputs already contain the correlation key
    pub fn uses_reserved_key(&self) -> bool {
        self.inputs.iter().any(|i| i.key == RESERVED_INPUT_KEY)
    }

    /// Builds the input map sent with the dispatch
    ///
    /// Later duplicates of a key replace earlier ones. The correlation token is
    /// added under [`RESERVED_INPUT_KEY`].
    pub fn dispatch_inputs(
        &self,
        token: &CorrelationToken,
    ) -> Result<BTreeMap<String, String>, JobError> {
        if self.uses_reserved_key() {
            return Err(JobError::ReservedInputKey);
        }

        let mut inputs: BTreeMap<String, String> = self
            .inputs
            .iter()
            .map(|i| (i.key.clone(), i.value.clone()))
            .collect();
        inputs.insert(RESERVED_INPUT_KEY.to_string(), token.as_str().to_string());

        Ok(inputs)
    }

    /// Short label used in logs, e.g. `my-org/my-repo:ci.yaml@main`
    pub fn label(&self) -> String {
        format!(
            "{}/{}:{}@{}",
            self.org, self.repo, self.workflow_file, self.git_ref
        )
    }
}

/// Opaque value embedded in dispatch inputs to find the run it created
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    /// Generates a fresh random token
    ///
    /// Workflows must not call this directly; it belongs inside a recorded
    /// side effect so replays observe the same value.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CorrelationToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn request() -> JobRequest {
        JobRequest::new("my-org", "my-repo", "main", "wait-and-echo.yaml")
            .with_input("wait_time", "100")
            .with_input("message", "my custom message")
    }

    #[test]
    fn test_dispatch_inputs_inject_token() {
        let token = CorrelationToken::from("abc-123".to_string());
        let inputs = request().dispatch_inputs(&token).unwrap();

        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs.get("wait_time"), Some(&"100".to_string()));
        assert_eq!(inputs.get(RESERVED_INPUT_KEY), Some(&"abc-123".to_string()));
    }

    #[test]
    fn test_dispatch_inputs_later_duplicate_wins() {
        let req = request().with_input("wait_time", "5");
        let inputs = req
            .dispatch_inputs(&CorrelationToken::generate())
            .unwrap();

        assert_eq!(inputs.get("wait_time"), Some(&"5".to_string()));
    }

    #[test]
    fn test_reserved_key_is_rejected() {
        let req = request().with_input(RESERVED_INPUT_KEY, "mine");

        let err = req
            .dispatch_inputs(&CorrelationToken::generate())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReservedInputKey);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let mut req = request();
        assert!(req.validate().is_ok());

        req.git_ref = " ".to_string();
        let err = req.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        assert_ne!(CorrelationToken::generate(), CorrelationToken::generate());
    }

    #[test]
    fn test_request_deserializes_from_json() {
        let json = r#"{
            "org": "my-org",
            "repo": "my-repo",
            "ref": "main",
            "workflow_file": "wait-and-echo.yaml",
            "inputs": [{"key": "message", "value": "hi"}]
        }"#;

        let req: JobRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.git_ref, "main");
        assert_eq!(req.inputs, vec![InputPair::new("message", "hi")]);
        assert_eq!(req.label(), "my-org/my-repo:wait-and-echo.yaml@main");
    }
}
