//! Job orchestration for a batch of conversions.
//!
//! Every Container with a conversion spec gets exactly one `JobRunner`, each on
//! its own task. Jobs run concurrently, optionally capped by
//! `max_concurrent_jobs`. A failing job never touches its siblings; outcomes are
//! collected once everything reached a terminal state.

mod config;
mod monitor;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use monitor::{overall_progress, JobMonitor};
pub use runner::Orchestrator;
pub use types::{AggregateStatus, JobSnapshot, OrchestratorError, RunSummary};
