//! Observable run state of a Container.
//!
//! The state lives in a `watch` channel. The sending half is owned by the
//! Container and is only ever driven by the `JobRunner` that owns it, which makes
//! the runner the single writer. Any number of readers (orchestrator queries,
//! the progress renderer) hold receivers and see the latest value.

use std::fmt;

use tokio::sync::watch;
use tracing::debug;

use crate::runner::JobError;

/// Lifecycle of a conversion: `Pending -> Running -> {Succeeded, Failed}`.
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Pending,
    Running {
        /// Completion fraction in `0.0..=1.0`, non-decreasing.
        progress: f64,
    },
    Succeeded,
    Failed(JobError),
}

impl RunState {
    /// Progress fraction, meaningful only while running or after success.
    pub fn progress(&self) -> Option<f64> {
        match self {
            Self::Running { progress } => Some(*progress),
            Self::Succeeded => Some(1.0),
            Self::Pending | Self::Failed(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Failed(e) if e.is_cancelled())
    }

    /// Lowercase name used in logs and line output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running { .. } => "running",
            Self::Succeeded => "succeeded",
            Self::Failed(e) if e.is_cancelled() => "cancelled",
            Self::Failed(_) => "failed",
        }
    }

    fn can_transition_to(&self, next: &RunState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running { .. })
                | (Self::Running { .. }, Self::Succeeded)
                | (Self::Running { .. }, Self::Failed(_))
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running { progress } => write!(f, "running ({:.0}%)", progress * 100.0),
            Self::Failed(e) => write!(f, "{}: {}", self.name(), e),
            _ => f.write_str(self.name()),
        }
    }
}

/// Read handle on a Container's run state.
pub type StateReceiver = watch::Receiver<RunState>;

/// The single writer of a Container's run state.
///
/// Every method refuses illegal transitions and returns whether the state
/// actually changed.
#[derive(Debug)]
pub(crate) struct StateWriter {
    tx: watch::Sender<RunState>,
}

impl StateWriter {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(RunState::Pending);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> StateReceiver {
        self.tx.subscribe()
    }

    pub(crate) fn current(&self) -> RunState {
        self.tx.borrow().clone()
    }

    fn transition(&self, next: RunState) -> bool {
        self.tx.send_if_modified(|state| {
            if state.can_transition_to(&next) {
                debug!(from = state.name(), to = next.name(), "run state transition");
                *state = next;
                true
            } else {
                false
            }
        })
    }

    /// `Pending -> Running` at 0%.
    pub(crate) fn begin(&self) -> bool {
        self.transition(RunState::Running { progress: 0.0 })
    }

    /// Raises the progress fraction. Lower values, NaN and calls outside
    /// `Running` are ignored; values above 1.0 are clamped.
    pub(crate) fn advance(&self, fraction: f64) -> bool {
        if !fraction.is_finite() {
            return false;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        self.tx.send_if_modified(|state| match state {
            RunState::Running { progress } if fraction > *progress => {
                *progress = fraction;
                true
            }
            _ => false,
        })
    }

    pub(crate) fn succeed(&self) -> bool {
        self.transition(RunState::Succeeded)
    }

    pub(crate) fn fail(&self, error: JobError) -> bool {
        self.transition(RunState::Failed(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let writer = StateWriter::new();
        assert_eq!(writer.current(), RunState::Pending);
        assert!(writer.begin());
        assert_eq!(writer.current(), RunState::Running { progress: 0.0 });
        assert!(writer.succeed());
        assert_eq!(writer.current(), RunState::Succeeded);
        assert_eq!(writer.current().progress(), Some(1.0));
    }

    #[test]
    fn test_no_reverse_or_skipping_transitions() {
        let writer = StateWriter::new();
        assert!(!writer.succeed());
        assert!(!writer.fail(JobError::Cancelled));
        assert_eq!(writer.current(), RunState::Pending);

        writer.begin();
        assert!(!writer.begin());
        writer.fail(JobError::Cancelled);
        assert!(!writer.succeed());
        assert!(!writer.begin());
        assert!(writer.current().is_cancelled());
    }

    #[test]
    fn test_progress_is_monotonic_and_clamped() {
        let writer = StateWriter::new();
        assert!(!writer.advance(0.5));
        writer.begin();
        assert!(writer.advance(0.25));
        assert!(!writer.advance(0.1));
        assert!(!writer.advance(f64::NAN));
        assert_eq!(writer.current().progress(), Some(0.25));
        assert!(writer.advance(1.7));
        assert_eq!(writer.current().progress(), Some(1.0));
    }

    #[test]
    fn test_terminal_state_ignores_progress() {
        let writer = StateWriter::new();
        writer.begin();
        writer.advance(0.3);
        writer.fail(JobError::process(Some(1), "boom"));
        assert!(!writer.advance(0.9));
        assert_eq!(writer.current().progress(), None);
        assert_eq!(writer.current().name(), "failed");
    }

    #[tokio::test]
    async fn test_receivers_observe_latest_state() {
        let writer = StateWriter::new();
        let mut rx = writer.subscribe();
        writer.begin();
        writer.advance(0.4);
        writer.advance(0.6);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().progress(), Some(0.6));
        writer.succeed();
        let state = rx.wait_for(RunState::is_terminal).await.unwrap().clone();
        assert_eq!(state, RunState::Succeeded);
    }

    #[test]
    fn test_display() {
        assert_eq!(RunState::Running { progress: 0.5 }.to_string(), "running (50%)");
        assert_eq!(
            RunState::Failed(JobError::Cancelled).to_string(),
            "cancelled: conversion cancelled"
        );
    }
}
