//! Local durable-execution runtime
//!
//! Workflow code runs against a [`WorkflowContext`]: nondeterministic values
//! go through [`WorkflowContext::side_effect`] and all remote work through
//! [`WorkflowContext::execute_activity`], which applies the phase's
//! [`ActivityOptions`](relay_core::policy::ActivityOptions). Both are recorded
//! in a [`Journal`] so a re-execution replays them.

mod activity;
mod context;
mod journal;

pub use activity::ActivityContext;
pub use context::WorkflowContext;
pub use journal::{Journal, JournalEntry};
