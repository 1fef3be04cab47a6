//! Error types for the probe module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while extracting stream metadata.
///
/// A probe failure makes the file unusable; it is reported once and the file
/// is dropped from further processing.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {tool}")]
    ToolNotFound { tool: PathBuf, path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// FFprobe exited non-zero.
    #[error("Unable to probe {path}: {stderr}")]
    Failed { path: PathBuf, stderr: String },

    /// FFprobe output could not be parsed into stream descriptors.
    #[error("Failed to parse media info for {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// The file reports no usable duration, so progress cannot be tracked.
    #[error("{path} has no duration")]
    NoDuration { path: PathBuf },

    /// I/O error while running ffprobe.
    #[error("I/O error probing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProbeError {
    /// The file this error is about.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::ToolNotFound { path, .. }
            | Self::InputNotFound { path }
            | Self::Failed { path, .. }
            | Self::Parse { path, .. }
            | Self::NoDuration { path }
            | Self::Io { path, .. } => path,
        }
    }

    pub(crate) fn parse(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}
