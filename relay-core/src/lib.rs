//! Relay Core
//!
//! Core types and abstractions for dispatching and tracking remote CI runs.
//!
//! This crate contains:
//! - Domain types: requests, run handles, run status and outcomes
//! - Error taxonomy: the closed set of failure kinds and their retry class
//! - Policy: per-phase retry and timeout configuration

pub mod domain;
pub mod error;
pub mod policy;

pub use error::{ErrorKind, JobError, TimeoutKind};
