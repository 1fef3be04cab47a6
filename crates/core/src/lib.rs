pub mod config;
pub mod container;
pub mod orchestrator;
pub mod probe;
pub mod render;
pub mod runner;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, Config, ConfigError,
};
pub use container::{
    Container, ContainerError, ConversionDefaults, ConversionSpec, ProbeReport, RunState,
    Selection, Stream, StreamKind,
};
pub use orchestrator::{
    AggregateStatus, JobMonitor, Orchestrator, OrchestratorConfig, OrchestratorError, RunSummary,
};
pub use probe::{build_containers, FfprobeProber, ProbeError, Prober};
pub use render::{ProgressRenderer, RenderMode, RendererConfig};
pub use runner::{ConverterConfig, FfmpegCommand, JobError, JobHandle, JobOutcome, JobRunner};
