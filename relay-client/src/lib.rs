//! Relay Actions Client
//!
//! A type-safe client for dispatching GitHub Actions workflow runs and
//! following them to completion.
//!
//! The crate is layered:
//! - [`paginate`]: lazy traversal of page-numbered listings
//! - [`api`]: the raw endpoints as an object-safe trait, plus payload types
//! - [`github`]: the reqwest implementation of those endpoints
//! - [`actions`]: dispatch, correlation search and status lookup
//!
//! # Example
//!
//! ```no_run
//! use relay_client::{ActionsClient, GitHubClient, GitHubConfig};
//! use relay_core::domain::CorrelationToken;
//!
//! # async fn example() -> relay_client::Result<()> {
//! let github = GitHubClient::new(&GitHubConfig {
//!     token: Some("ghs_example".to_string()),
//!     ..Default::default()
//! })?;
//! let client = ActionsClient::new(github);
//!
//! let token = CorrelationToken::generate();
//! let run_id = client
//!     .resolve_run_id("my-org", "my-repo", "ci.yaml", "main", &token)
//!     .await?;
//! println!("run {run_id}");
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod api;
pub mod error;
pub mod github;
pub mod paginate;

// Re-export commonly used types
pub use actions::{ActionsClient, ConnectActions};
pub use api::{ActionsApi, WorkflowJob, WorkflowRun, WorkflowStep};
pub use error::{ClientError, Result};
pub use github::{GitHubClient, GitHubConfig, GitHubConnector};
pub use paginate::{Page, paginate};
