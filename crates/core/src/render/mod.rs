//! Live progress display for a batch of conversions.
//!
//! Bars are drawn with `indicatif` when stderr is a terminal wide enough for
//! them; otherwise, or when the terminal shrinks mid-run, output falls back to
//! one plain line per status change.

mod bars;
mod config;
mod lines;
mod renderer;

pub use bars::BarDisplay;
pub use config::{RenderMode, RendererConfig};
pub use lines::LineReporter;
pub use renderer::ProgressRenderer;
