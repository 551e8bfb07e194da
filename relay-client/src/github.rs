//! GitHub REST implementation of the Actions endpoints

use async_trait::async_trait;
use relay_core::domain::RunId;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, LINK};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use crate::actions::{ActionsClient, ConnectActions};
use crate::api::{
    ActionsApi, DispatchRequest, WorkflowJob, WorkflowJobsPage, WorkflowRun, WorkflowRunsPage,
};
use crate::error::{ClientError, Result};
use crate::paginate::{Page, next_page_from_link};

/// Public GitHub API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";

/// Connection settings for the GitHub API
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// Base URL (e.g., "https://api.github.com" or a GHES `/api/v3` root)
    pub api_url: String,
    /// Installation or personal access token
    pub token: Option<String>,
    pub user_agent: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            user_agent: concat!("relay/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for the GitHub Actions API
#[derive(Debug, Clone)]
pub struct GitHubClient {
    /// Base URL without trailing slash
    base_url: String,
    token: Option<String>,
    /// HTTP client instance
    client: Client,
}

impl GitHubClient {
    /// Builds a client from connection settings
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(API_VERSION),
        );

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()?;

        let mut github = Self::with_client(config.api_url.clone(), client);
        github.token = config.token.clone();
        Ok(github)
    }

    /// Uses a preconfigured reqwest client (proxies, TLS, ...)
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let path = response.url().path().to_string();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(status.as_u16(), &path, error_text));
        }

        Ok(response)
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Deserializes a listing body and reads the next page from `Link`
    async fn handle_page<B: DeserializeOwned>(response: reqwest::Response) -> Result<(B, u32)> {
        let response = Self::check_status(response).await?;
        let next_page = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(next_page_from_link)
            .unwrap_or(0);

        let body = response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))?;

        Ok((body, next_page))
    }
}

fn status_error(status: u16, path: &str, message: String) -> ClientError {
    match status {
        404 => ClientError::NotFound(path.to_string()),
        _ => ClientError::api_error(status, message),
    }
}

#[async_trait]
impl ActionsApi for GitHubClient {
    async fn dispatch(
        &self,
        org: &str,
        repo: &str,
        workflow_file: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<()> {
        let path = format!("/repos/{org}/{repo}/actions/workflows/{workflow_file}/dispatches");
        let response = self
            .request(Method::POST, &path)
            .json(&DispatchRequest { git_ref, inputs })
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }

    async fn list_runs(
        &self,
        org: &str,
        repo: &str,
        workflow_file: &str,
        page: u32,
    ) -> Result<Page<WorkflowRun>> {
        let path = format!("/repos/{org}/{repo}/actions/workflows/{workflow_file}/runs");
        let response = self
            .request(Method::GET, &path)
            .query(&[("event", "workflow_dispatch")])
            .query(&[("page", page)])
            .send()
            .await?;

        let (body, next): (WorkflowRunsPage, u32) = Self::handle_page(response).await?;
        debug!(org, repo, workflow_file, page, runs = body.workflow_runs.len(), "Listed runs");
        Ok(Page::new(body.workflow_runs, next))
    }

    async fn list_jobs(
        &self,
        org: &str,
        repo: &str,
        run_id: RunId,
        page: u32,
    ) -> Result<Page<WorkflowJob>> {
        let path = format!("/repos/{org}/{repo}/actions/runs/{run_id}/jobs");
        let response = self
            .request(Method::GET, &path)
            .query(&[("filter", "latest")])
            .query(&[("page", page)])
            .send()
            .await?;

        let (body, next): (WorkflowJobsPage, u32) = Self::handle_page(response).await?;
        Ok(Page::new(body.jobs, next))
    }

    async fn get_run(&self, org: &str, repo: &str, run_id: RunId) -> Result<WorkflowRun> {
        let path = format!("/repos/{org}/{repo}/actions/runs/{run_id}");
        let response = self.request(Method::GET, &path).send().await?;

        Self::handle_response(response).await
    }
}

/// Opens one GitHub client per request
#[derive(Debug, Clone, Default)]
pub struct GitHubConnector {
    config: GitHubConfig,
}

impl GitHubConnector {
    pub fn new(config: GitHubConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConnectActions for GitHubConnector {
    async fn connect(&self, org: &str, repo: &str) -> Result<ActionsClient> {
        debug!(org, repo, api_url = %self.config.api_url, "Opening GitHub client");
        let client = GitHubClient::new(&self.config)?;
        Ok(ActionsClient::new(client))
    }
}
