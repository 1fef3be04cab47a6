//! Running ffmpeg for one Container: command construction, progress parsing
//! and process supervision.

mod command;
mod config;
mod error;
mod job;
mod progress;

pub use command::FfmpegCommand;
pub use config::ConverterConfig;
pub use error::{JobError, MissingSpec};
pub use job::{JobHandle, JobOutcome, JobRunner};
pub use progress::{fraction, parse_progress_line, ProgressLine};
