//! Error types for the runner module.

use std::path::PathBuf;
use thiserror::Error;

use crate::container::Container;

/// Why a conversion job ended in `Failed`.
///
/// Kept `Clone` so it can live inside the observable run state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// FFmpeg could not be started.
    #[error("failed to start {program}: {reason}")]
    Spawn { program: PathBuf, reason: String },

    /// FFmpeg exited unsuccessfully; `detail` holds the tail of its stderr.
    #[error("ffmpeg {}", exit_description(*code))]
    Process { code: Option<i32>, detail: String },

    /// The job was stopped by a cancel request.
    #[error("conversion cancelled")]
    Cancelled,
}

fn exit_description(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

impl JobError {
    /// Creates a process failure with captured error output.
    pub fn process(code: Option<i32>, detail: impl Into<String>) -> Self {
        Self::Process {
            code,
            detail: detail.into(),
        }
    }

    /// Whether this is a cancellation rather than a genuine failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Captured tool output, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Process { detail, .. } if !detail.is_empty() => Some(detail),
            Self::Spawn { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Returned by `JobRunner::new` when the container has nothing to convert.
/// Hands the container back to the caller.
#[derive(Debug, Error)]
#[error("no conversion spec attached to {}", .0.path().display())]
pub struct MissingSpec(pub Container);
