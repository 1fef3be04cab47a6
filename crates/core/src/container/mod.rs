//! The Container: one source file's conversion job.
//!
//! A Container starts out as a bare path, gains stream metadata once from a
//! probe, receives a [`ConversionSpec`] from whoever selects what to convert,
//! and finally moves into a `JobRunner`, which becomes the only writer of its
//! [`RunState`].
//!
//! # Example
//!
//! ```ignore
//! use filmalize_core::container::{Container, ConversionDefaults, Selection};
//!
//! let report = prober.probe(path).await?;
//! let mut container = Container::from_probe(path, report);
//! container.configure(&ConversionDefaults::default(), &Selection::default())?;
//! let state = container.subscribe();
//! ```

mod error;
mod spec;
mod state;
mod types;

use std::path::{Path, PathBuf};
use std::time::Duration;

pub use error::ContainerError;
pub use spec::{
    default_streams, ConversionDefaults, ConversionSpec, Selection, StreamOverride,
    StreamTarget, SubtitleFile, TargetCodec, TargetKind,
};
pub(crate) use state::StateWriter;
pub use state::{RunState, StateReceiver};
pub use types::{ContainerLabel, ProbeReport, Stream, StreamKind, StreamLabel};

/// One media file and its conversion job.
#[derive(Debug)]
pub struct Container {
    path: PathBuf,
    probe: Option<ProbeReport>,
    spec: Option<ConversionSpec>,
    state: StateWriter,
}

impl Container {
    /// Creates an unprobed container for a discovered file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            probe: None,
            spec: None,
            state: StateWriter::new(),
        }
    }

    /// Creates a container with its stream metadata already known.
    pub fn from_probe(path: impl Into<PathBuf>, report: ProbeReport) -> Self {
        let mut container = Self::new(path);
        container.probe = Some(report);
        container
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used as the display label.
    pub fn label(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Stream descriptors; empty until probed.
    pub fn streams(&self) -> &[Stream] {
        self.probe
            .as_ref()
            .map(|p| p.streams.as_slice())
            .unwrap_or_default()
    }

    /// Total source duration, known once probed.
    pub fn duration(&self) -> Option<Duration> {
        self.probe.as_ref().map(|p| p.duration)
    }

    pub fn labels(&self) -> Option<&ContainerLabel> {
        self.probe.as_ref().map(|p| &p.labels)
    }

    pub fn is_probed(&self) -> bool {
        self.probe.is_some()
    }

    /// Stores probe results. Stream metadata is immutable once set.
    pub fn attach_probe(&mut self, report: ProbeReport) -> Result<(), ContainerError> {
        if self.probe.is_some() {
            return Err(ContainerError::AlreadyProbed {
                path: self.path.clone(),
            });
        }
        self.probe = Some(report);
        Ok(())
    }

    /// Builds and attaches a conversion spec. May be called again to replace
    /// it until the container is handed to a runner.
    pub fn configure(
        &mut self,
        defaults: &ConversionDefaults,
        selection: &Selection,
    ) -> Result<&ConversionSpec, ContainerError> {
        let Some(probe) = &self.probe else {
            return Err(ContainerError::NotProbed {
                path: self.path.clone(),
            });
        };
        let spec = ConversionSpec::build(&self.path, &probe.streams, defaults, selection)?;
        Ok(self.spec.insert(spec))
    }

    /// Attaches a spec that was built elsewhere.
    pub fn set_spec(&mut self, spec: ConversionSpec) {
        self.spec = Some(spec);
    }

    pub fn spec(&self) -> Option<&ConversionSpec> {
        self.spec.as_ref()
    }

    /// Snapshot of the current run state.
    pub fn state(&self) -> RunState {
        self.state.current()
    }

    /// Subscribes to run state updates.
    pub fn subscribe(&self) -> StateReceiver {
        self.state.subscribe()
    }

    pub(crate) fn state_writer(&self) -> &StateWriter {
        &self.state
    }
}
