//! Types for the job orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::container::RunState;
use crate::runner::{JobError, JobOutcome};

/// Errors that can occur when handing jobs to the orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A job for this source file is already queued or running.
    #[error("a conversion of {} is already in progress", path.display())]
    DuplicateContainer { path: PathBuf },

    /// Two jobs would write the same file, or one would overwrite another's source.
    #[error("conversion of {} would write {}, which another job also uses", path.display(), output.display())]
    OutputCollision { path: PathBuf, output: PathBuf },
}

/// Counts of jobs per run state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStatus {
    pub pending: usize,
    pub running: usize,
    pub succeeded: usize,
    /// Failures other than cancellation.
    pub failed: usize,
    pub cancelled: usize,
}

impl AggregateStatus {
    pub(crate) fn record(&mut self, state: &RunState) {
        match state {
            RunState::Pending => self.pending += 1,
            RunState::Running { .. } => self.running += 1,
            RunState::Succeeded => self.succeeded += 1,
            RunState::Failed(e) if e.is_cancelled() => self.cancelled += 1,
            RunState::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.running + self.succeeded + self.failed + self.cancelled
    }

    /// Jobs in `Succeeded` or `Failed`.
    pub fn terminal(&self) -> usize {
        self.succeeded + self.failed + self.cancelled
    }

    pub fn all_terminal(&self) -> bool {
        self.terminal() == self.total()
    }
}

impl fmt::Display for AggregateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pending, {} running, {} succeeded, {} failed, {} cancelled",
            self.pending, self.running, self.succeeded, self.failed, self.cancelled
        )
    }
}

/// Point-in-time view of one job, as read by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub path: PathBuf,
    pub label: String,
    pub duration: Option<Duration>,
    pub state: RunState,
}

/// Outcomes of every job of a run, in start order.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<JobOutcome>,
    /// Set when the run was cut short by an interrupt.
    pub interrupted: bool,
}

impl RunSummary {
    pub fn succeeded(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    /// Jobs that failed for a reason other than cancellation.
    pub fn failed(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_success() && !o.is_cancelled())
    }

    pub fn cancelled(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|o| o.is_cancelled())
    }

    /// Every job succeeded and nothing interrupted the run.
    pub fn is_success(&self) -> bool {
        !self.interrupted && self.outcomes.iter().all(JobOutcome::is_success)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} succeeded, {} failed, {} cancelled",
            self.succeeded().count(),
            self.failed().count(),
            self.cancelled().count()
        )?;
        for outcome in &self.outcomes {
            match &outcome.result {
                Ok(()) => writeln!(
                    f,
                    "  ✓ {} -> {}",
                    outcome.label,
                    outcome.output_path.display()
                )?,
                Err(JobError::Cancelled) => writeln!(f, "  - {}: cancelled", outcome.label)?,
                Err(e) => {
                    writeln!(f, "  ✗ {}: {}", outcome.label, e)?;
                    if let Some(detail) = e.detail() {
                        for line in detail.lines() {
                            writeln!(f, "      {}", line)?;
                        }
                    }
                }
            }
        }
        if self.interrupted {
            writeln!(f, "interrupted")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn outcome(label: &str, result: Result<(), JobError>) -> JobOutcome {
        let now = Utc::now();
        JobOutcome {
            path: PathBuf::from(format!("/media/{}", label)),
            label: label.to_string(),
            output_path: PathBuf::from(format!("/media/{}.mp4", label)),
            result,
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn test_aggregate_status_counts() {
        let mut status = AggregateStatus::default();
        status.record(&RunState::Pending);
        status.record(&RunState::Running { progress: 0.3 });
        status.record(&RunState::Succeeded);
        status.record(&RunState::Failed(JobError::Cancelled));
        status.record(&RunState::Failed(JobError::process(Some(1), "")));
        assert_eq!(
            status,
            AggregateStatus {
                pending: 1,
                running: 1,
                succeeded: 1,
                failed: 1,
                cancelled: 1,
            }
        );
        assert_eq!(status.total(), 5);
        assert!(!status.all_terminal());
        assert!(AggregateStatus::default().all_terminal());
    }

    #[test]
    fn test_summary_counts_and_display() {
        let summary = RunSummary {
            outcomes: vec![
                outcome("a.mkv", Ok(())),
                outcome("b.mkv", Err(JobError::process(Some(1), "moov atom not found"))),
                outcome("c.mkv", Ok(())),
            ],
            interrupted: false,
        };
        assert_eq!(summary.succeeded().count(), 2);
        assert_eq!(summary.failed().count(), 1);
        assert_eq!(summary.cancelled().count(), 0);
        assert!(!summary.is_success());

        let text = summary.to_string();
        assert!(text.starts_with("2 succeeded, 1 failed, 0 cancelled\n"));
        assert!(text.contains("✗ b.mkv: ffmpeg exited with code 1"));
        assert!(text.contains("      moov atom not found"));
    }

    #[test]
    fn test_interrupted_summary_is_not_success() {
        let summary = RunSummary {
            outcomes: vec![outcome("a.mkv", Err(JobError::Cancelled))],
            interrupted: true,
        };
        assert!(!summary.is_success());
        assert_eq!(summary.cancelled().count(), 1);
        assert!(summary.to_string().ends_with("interrupted\n"));
    }

    #[test]
    fn test_error_display() {
        let err = OrchestratorError::DuplicateContainer {
            path: PathBuf::from("/media/a.mkv"),
        };
        assert_eq!(
            err.to_string(),
            "a conversion of /media/a.mkv is already in progress"
        );
    }
}
