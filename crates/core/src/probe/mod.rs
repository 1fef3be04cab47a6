//! Probe module: stream metadata extraction.
//!
//! The default implementation shells out to ffprobe and parses its JSON
//! output. Files that cannot be probed are reported as [`ProbeError`] and are
//! never offered for conversion.

mod error;
mod ffprobe;
mod traits;

pub use error::ProbeError;
pub use ffprobe::{parse_probe_output, FfprobeProber};
pub use traits::{build_containers, Prober};
