//! Configuration for launching and supervising ffmpeg.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the ffmpeg/ffprobe tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,

    /// Arguments placed before everything else on the ffmpeg command line.
    #[serde(default)]
    pub global_args: Vec<String>,

    /// Additional arguments placed right before the output path.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,

    /// How many trailing stderr lines are kept as failure detail.
    #[serde(default = "default_error_tail_lines")]
    pub error_tail_lines: usize,

    /// Time ffmpeg is given to exit after SIGTERM before it is killed.
    #[serde(default = "default_grace_period")]
    pub cancel_grace_period_ms: u64,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_log_level() -> String {
    "error".to_string()
}

fn default_error_tail_lines() -> usize {
    10
}

fn default_grace_period() -> u64 {
    5000
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            ffmpeg_log_level: default_log_level(),
            global_args: Vec::new(),
            extra_ffmpeg_args: Vec::new(),
            error_tail_lines: default_error_tail_lines(),
            cancel_grace_period_ms: default_grace_period(),
        }
    }
}

impl ConverterConfig {
    /// Creates a new config with custom ffmpeg/ffprobe paths.
    pub fn with_paths(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            ..Default::default()
        }
    }

    /// Sets the arguments placed before everything else.
    pub fn with_global_args(mut self, args: Vec<String>) -> Self {
        self.global_args = args;
        self
    }

    /// Sets the cancellation grace period in milliseconds.
    pub fn with_grace_period(mut self, grace_ms: u64) -> Self {
        self.cancel_grace_period_ms = grace_ms;
        self
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_period_ms)
    }
}
