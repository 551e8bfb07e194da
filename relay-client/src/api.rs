//! Actions API surface
//!
//! [`ActionsApi`] is the raw set of endpoints the job client needs. The
//! GitHub implementation lives in [`crate::github`]; tests substitute
//! in-memory fakes.

use async_trait::async_trait;
use relay_core::domain::{RunId, RunStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::paginate::Page;

/// Raw Actions endpoints
#[async_trait]
pub trait ActionsApi: Send + Sync {
    /// Creates a `workflow_dispatch` event for a workflow file
    ///
    /// The platform answers with no body, so no run id is returned.
    async fn dispatch(
        &self,
        org: &str,
        repo: &str,
        workflow_file: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<()>;

    /// Lists `workflow_dispatch` runs of a workflow file, newest first
    async fn list_runs(
        &self,
        org: &str,
        repo: &str,
        workflow_file: &str,
        page: u32,
    ) -> Result<Page<WorkflowRun>>;

    /// Lists the latest attempt's jobs of a run
    async fn list_jobs(&self, org: &str, repo: &str, run_id: RunId, page: u32)
    -> Result<Page<WorkflowJob>>;

    /// Fetches a single run
    async fn get_run(&self, org: &str, repo: &str, run_id: RunId) -> Result<WorkflowRun>;
}

/// A workflow run as listed by the platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub head_branch: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub html_url: String,
}

impl WorkflowRun {
    pub fn run_id(&self) -> RunId {
        RunId(self.id)
    }

    pub fn to_status(&self) -> RunStatus {
        RunStatus {
            status: self.status.clone().unwrap_or_default(),
            conclusion: self.conclusion.clone().unwrap_or_default(),
            url: self.url.clone(),
            html_url: self.html_url.clone(),
        }
    }
}

/// A job of a workflow run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowJob {
    pub id: i64,
    #[serde(default)]
    pub run_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowJob {
    /// Whether any step's display name mentions `needle`
    pub fn has_step_containing(&self, needle: &str) -> bool {
        self.steps.iter().any(|step| step.name.contains(needle))
    }
}

/// A step of a job; only the display name matters for correlation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub name: String,
    #[serde(default)]
    pub number: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
}

impl WorkflowStep {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Body of `GET .../workflows/{file}/runs`
#[derive(Debug, Deserialize)]
pub(crate) struct WorkflowRunsPage {
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

/// Body of `GET .../runs/{id}/jobs`
#[derive(Debug, Deserialize)]
pub(crate) struct WorkflowJobsPage {
    #[serde(default)]
    pub jobs: Vec<WorkflowJob>,
}

/// Body of `POST .../workflows/{file}/dispatches`
#[derive(Debug, Serialize)]
pub(crate) struct DispatchRequest<'a> {
    #[serde(rename = "ref")]
    pub git_ref: &'a str,
    pub inputs: &'a BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_payload_to_status() {
        let json = r#"{
            "id": 30433642,
            "name": "Build",
            "event": "workflow_dispatch",
            "status": "completed",
            "conclusion": "success",
            "url": "https://api.github.com/repos/octo-org/octo-repo/actions/runs/30433642",
            "html_url": "https://github.com/octo-org/octo-repo/actions/runs/30433642",
            "run_attempt": 1
        }"#;

        let run: WorkflowRun = serde_json::from_str(json).unwrap();
        let status = run.to_status();

        assert_eq!(run.run_id(), RunId(30433642));
        assert_eq!(status.conclusion, "success");
        assert!(!status.is_running());
    }

    #[test]
    fn test_queued_run_has_no_conclusion() {
        let json = r#"{"id": 1, "status": "queued", "conclusion": null, "url": "u"}"#;
        let status = serde_json::from_str::<WorkflowRun>(json).unwrap().to_status();

        assert_eq!(status.conclusion, "");
        assert!(status.is_running());
    }

    #[test]
    fn test_jobs_page_step_names() {
        let json = r#"{
            "total_count": 1,
            "jobs": [{
                "id": 399444496,
                "run_id": 29679449,
                "name": "build",
                "steps": [
                    {"name": "Set up job", "number": 1, "status": "completed", "conclusion": "success"},
                    {"name": "dispatch_id: 5c6e", "number": 2, "status": "completed", "conclusion": "success"}
                ]
            }]
        }"#;

        let page: WorkflowJobsPage = serde_json::from_str(json).unwrap();
        assert!(page.jobs[0].has_step_containing("5c6e"));
        assert!(!page.jobs[0].has_step_containing("ffff"));
    }

    #[test]
    fn test_dispatch_body_shape() {
        let mut inputs = BTreeMap::new();
        inputs.insert("dispatch_id".to_string(), "abc".to_string());
        let body = DispatchRequest {
            git_ref: "main",
            inputs: &inputs,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["ref"], "main");
        assert_eq!(json["inputs"]["dispatch_id"], "abc");
    }
}
