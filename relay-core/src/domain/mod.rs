//! Core domain types
//!
//! These types are shared between the remote client (which fills them from
//! platform responses) and the runner (which drives requests to completion).

pub mod outcome;
pub mod request;
pub mod run;

pub use outcome::{Heartbeat, JobOutcome};
pub use request::{CorrelationToken, InputPair, JobRequest, RESERVED_INPUT_KEY};
pub use run::{RunHandle, RunId, RunStatus};
