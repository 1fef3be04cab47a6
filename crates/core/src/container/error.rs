//! Error types for the container module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while preparing a Container for conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// Stream metadata may only be populated once.
    #[error("{path} has already been probed")]
    AlreadyProbed { path: PathBuf },

    /// A conversion spec needs stream metadata.
    #[error("{path} has not been probed")]
    NotProbed { path: PathBuf },

    #[error("this container does not contain a stream with index {index}")]
    UnknownStream { index: u32 },

    #[error("cannot output stream {index} of type {kind}")]
    UnsupportedStream { index: u32, kind: String },

    #[error("no streams selected for {path}")]
    EmptySelection { path: PathBuf },

    /// The computed output path would overwrite the source.
    #[error("output path {path} is the source file")]
    OutputIsSource { path: PathBuf },
}
