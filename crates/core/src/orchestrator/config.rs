//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the job orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum conversions running at once (0 = unlimited).
    /// Jobs over the limit stay pending until a slot frees up.
    #[serde(default)]
    pub max_concurrent_jobs: usize,
}

impl OrchestratorConfig {
    pub fn with_max_concurrent_jobs(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max;
        self
    }

    /// The concurrency limit, `None` when unbounded.
    pub fn limit(&self) -> Option<usize> {
        (self.max_concurrent_jobs > 0).then_some(self.max_concurrent_jobs)
    }
}
