//! Renderer configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How progress is shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Bars on a wide enough terminal, plain lines otherwise.
    #[default]
    Auto,
    /// Bars whenever stderr is a terminal.
    Bars,
    /// One status line per change.
    Lines,
}

/// Configuration for the progress renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Redraw interval (milliseconds).
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_ms: u64,

    #[serde(default)]
    pub mode: RenderMode,

    /// Terminals narrower than this get line output in `auto` mode.
    #[serde(default = "default_min_bar_columns")]
    pub min_bar_columns: u16,
}

fn default_refresh_interval() -> u64 {
    200
}

fn default_min_bar_columns() -> u16 {
    40
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval(),
            mode: RenderMode::default(),
            min_bar_columns: default_min_bar_columns(),
        }
    }
}

impl RendererConfig {
    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }
}
