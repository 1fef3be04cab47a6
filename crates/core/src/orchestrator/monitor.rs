//! Read-only view over a set of running jobs.

use std::sync::Arc;

use crate::runner::JobHandle;

use super::types::{AggregateStatus, JobSnapshot};

/// Cloneable reader over the jobs started by an orchestrator.
///
/// Holds only state receivers and cancel tokens, never the jobs themselves, so
/// it can be handed to the renderer or a signal task freely.
#[derive(Debug, Clone, Default)]
pub struct JobMonitor {
    jobs: Arc<[JobHandle]>,
}

impl JobMonitor {
    pub fn new(jobs: Vec<JobHandle>) -> Self {
        Self { jobs: jobs.into() }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn handles(&self) -> &[JobHandle] {
        &self.jobs
    }

    /// Latest state of every job, in start order.
    pub fn snapshot(&self) -> Vec<JobSnapshot> {
        self.jobs
            .iter()
            .map(|job| JobSnapshot {
                path: job.path().to_path_buf(),
                label: job.label().to_string(),
                duration: job.duration(),
                state: job.state(),
            })
            .collect()
    }

    pub fn status(&self) -> AggregateStatus {
        let mut status = AggregateStatus::default();
        for job in self.jobs.iter() {
            status.record(&job.state());
        }
        status
    }

    /// Share of the total work that is settled, weighted by source duration.
    ///
    /// Terminal jobs count as complete whatever their outcome.
    pub fn overall_progress(&self) -> f64 {
        overall_progress(&self.snapshot())
    }

    /// Every job is terminal, or was abandoned by its runner.
    pub fn all_terminal(&self) -> bool {
        self.jobs.iter().all(JobHandle::is_done)
    }

    /// Resolves once every job reached a terminal state.
    ///
    /// A job whose runner went away without finishing also counts as done.
    pub async fn wait_all_terminal(&self) {
        for job in self.jobs.iter() {
            job.wait().await;
        }
    }

    /// Requests cancellation of every job that has not finished yet.
    pub fn cancel_all(&self) {
        for job in self.jobs.iter() {
            job.cancel();
        }
    }
}

/// Duration-weighted completion over a set of snapshots.
pub fn overall_progress(jobs: &[JobSnapshot]) -> f64 {
    let mut done = 0.0;
    let mut total = 0.0;
    for job in jobs {
        let weight = job
            .duration
            .map(|d| d.as_secs_f64())
            .filter(|secs| *secs > 0.0)
            .unwrap_or(1.0);
        let fraction = if job.state.is_terminal() {
            1.0
        } else {
            job.state.progress().unwrap_or(0.0)
        };
        done += weight * fraction;
        total += weight;
    }
    if total > 0.0 {
        (done / total).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
