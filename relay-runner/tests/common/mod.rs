//! In-memory Actions platform shared by the runner test suites

#![allow(dead_code)]

use async_trait::async_trait;
use relay_client::api::ActionsApi;
use relay_client::{
    ActionsClient, ClientError, ConnectActions, Page, WorkflowJob, WorkflowRun, WorkflowStep,
};
use relay_core::domain::{JobRequest, RESERVED_INPUT_KEY, RunId};
use relay_core::policy::PhasePolicies;
use relay_runner::Runner;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A dispatch the fake accepted
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub repo: String,
    pub inputs: BTreeMap<String, String>,
}

#[derive(Default)]
struct State {
    next_run_id: i64,
    runs: HashMap<String, Vec<WorkflowRun>>,
    jobs: HashMap<i64, Vec<WorkflowJob>>,
    statuses: HashMap<i64, VecDeque<(String, String)>>,
    dispatched: Vec<Dispatched>,
    dispatch_calls: Vec<String>,
    finished: Vec<String>,
}

/// Fake platform
///
/// Each accepted dispatch creates a run whose only job has a step echoing
/// the correlation token. A run walks through the status script of its
/// repository, one entry per status request, and stays on the last entry.
#[derive(Default)]
pub struct FakeActions {
    scripts: HashMap<String, Vec<(String, String)>>,
    failing_dispatch: HashSet<String>,
    status_delay: Option<Duration>,
    listing_lag: AtomicU32,
    state: Mutex<State>,
}

impl FakeActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status sequence for runs of `repo`
    pub fn with_script(mut self, repo: &str, script: &[(&str, &str)]) -> Self {
        let script = script
            .iter()
            .map(|(status, conclusion)| (status.to_string(), conclusion.to_string()))
            .collect();
        self.scripts.insert(repo.to_string(), script);
        self
    }

    /// Dispatches to `repo` fail with a 502
    pub fn with_failing_dispatch(mut self, repo: &str) -> Self {
        self.failing_dispatch.insert(repo.to_string());
        self
    }

    /// The first `misses` run listings come back empty
    pub fn with_listing_lag(self, misses: u32) -> Self {
        self.listing_lag.store(misses, Ordering::SeqCst);
        self
    }

    /// Status requests never answer
    pub fn with_stalled_status(self) -> Self {
        self.with_status_delay(Duration::from_secs(24 * 60 * 60))
    }

    /// Every status request takes `delay` to answer
    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    pub fn dispatched(&self) -> Vec<Dispatched> {
        self.state.lock().unwrap().dispatched.clone()
    }

    pub fn dispatched_repos(&self) -> Vec<String> {
        self.dispatched().into_iter().map(|d| d.repo).collect()
    }

    /// Every dispatch call, accepted or not
    pub fn dispatch_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().dispatch_calls.clone()
    }

    /// Repositories in the order their runs were observed terminal
    pub fn finished(&self) -> Vec<String> {
        self.state.lock().unwrap().finished.clone()
    }

    fn script_for(&self, repo: &str) -> VecDeque<(String, String)> {
        self.scripts
            .get(repo)
            .cloned()
            .unwrap_or_else(|| vec![("completed".to_string(), "success".to_string())])
            .into()
    }
}

fn page_of<T: Clone>(items: &[T], page: u32) -> Page<T> {
    let index = (page - 1) as usize;
    let item = items.get(index).cloned().into_iter().collect();
    let next = if index + 1 < items.len() { page + 1 } else { 0 };
    Page::new(item, next)
}

fn run_url(org: &str, repo: &str, id: i64) -> String {
    format!("https://api.github.com/repos/{org}/{repo}/actions/runs/{id}")
}

#[async_trait]
impl ActionsApi for FakeActions {
    async fn dispatch(
        &self,
        org: &str,
        repo: &str,
        workflow_file: &str,
        _git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> relay_client::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.dispatch_calls.push(repo.to_string());

        if self.failing_dispatch.contains(repo) {
            return Err(ClientError::api_error(502, "Bad Gateway"));
        }

        state.next_run_id += 1;
        let id = 100 + state.next_run_id;
        let token = inputs.get(RESERVED_INPUT_KEY).cloned().unwrap_or_default();

        let run = WorkflowRun {
            id,
            name: Some(workflow_file.to_string()),
            event: "workflow_dispatch".to_string(),
            status: Some("queued".to_string()),
            url: run_url(org, repo, id),
            ..Default::default()
        };
        state.runs.entry(repo.to_string()).or_default().insert(0, run);
        state.jobs.insert(
            id,
            vec![WorkflowJob {
                id: id * 10,
                run_id: id,
                name: "build".to_string(),
                steps: vec![
                    WorkflowStep::named("Set up job"),
                    WorkflowStep::named(format!("Echo dispatch_id {token}")),
                ],
            }],
        );
        state.statuses.insert(id, self.script_for(repo));
        state.dispatched.push(Dispatched {
            repo: repo.to_string(),
            inputs: inputs.clone(),
        });
        Ok(())
    }

    async fn list_runs(
        &self,
        _org: &str,
        repo: &str,
        _workflow_file: &str,
        page: u32,
    ) -> relay_client::Result<Page<WorkflowRun>> {
        let lagging = self
            .listing_lag
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lagging {
            return Ok(Page::last(Vec::new()));
        }

        let state = self.state.lock().unwrap();
        let runs = state.runs.get(repo).cloned().unwrap_or_default();
        Ok(page_of(&runs, page))
    }

    async fn list_jobs(
        &self,
        _org: &str,
        _repo: &str,
        run_id: RunId,
        page: u32,
    ) -> relay_client::Result<Page<WorkflowJob>> {
        let state = self.state.lock().unwrap();
        let jobs = state.jobs.get(&run_id.0).cloned().unwrap_or_default();
        Ok(page_of(&jobs, page))
    }

    async fn get_run(
        &self,
        org: &str,
        repo: &str,
        run_id: RunId,
    ) -> relay_client::Result<WorkflowRun> {
        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        let script = state
            .statuses
            .get_mut(&run_id.0)
            .ok_or_else(|| ClientError::api_error(404, "Not Found"))?;

        let (status, conclusion) = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
        .unwrap_or_default();

        if status == "completed" {
            state.finished.push(repo.to_string());
        }

        Ok(WorkflowRun {
            id: run_id.0,
            status: Some(status),
            conclusion: Some(conclusion).filter(|c| !c.is_empty()),
            url: run_url(org, repo, run_id.0),
            ..Default::default()
        })
    }
}

/// Hands out clients over one shared fake
pub struct FakeConnector {
    api: Arc<FakeActions>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(api: Arc<FakeActions>) -> Self {
        Self {
            api,
            connects: AtomicUsize::new(0),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectActions for FakeConnector {
    async fn connect(&self, _org: &str, _repo: &str) -> relay_client::Result<ActionsClient> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(ActionsClient::from_arc(self.api.clone()))
    }
}

pub fn request(repo: &str) -> JobRequest {
    JobRequest::new("acme", repo, "main", "wait-and-echo.yaml")
        .with_input("wait_time", "5")
        .with_input("message", format!("hello from {repo}"))
}

pub fn runner(api: &Arc<FakeActions>) -> Runner {
    runner_with(api, PhasePolicies::default())
}

pub fn runner_with(api: &Arc<FakeActions>, policies: PhasePolicies) -> Runner {
    Runner::new(Arc::new(FakeConnector::new(Arc::clone(api))), policies)
}
