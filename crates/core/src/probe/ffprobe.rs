//! FFprobe-based prober implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::error::ProbeError;
use super::traits::Prober;
use crate::container::{ContainerLabel, ProbeReport, Stream, StreamKind, StreamLabel};
use crate::runner::ConverterConfig;

/// Runs `ffprobe -show_format -show_streams -of json` and parses the result.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: PathBuf,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(config.ffprobe_path.clone())
    }
}

#[derive(Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
    format_long_name: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Deserialize)]
struct ProbeStream {
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    coded_width: Option<u32>,
    coded_height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    channel_layout: Option<String>,
    bit_rate: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    disposition: HashMap<String, i64>,
}

impl ProbeStream {
    fn into_stream(self) -> Stream {
        let kind = match self.codec_type.as_deref() {
            Some("video") => StreamKind::Video {
                width: self.width.or(self.coded_width).filter(|w| *w > 0),
                height: self.height.or(self.coded_height).filter(|h| *h > 0),
                frame_rate: self
                    .avg_frame_rate
                    .as_deref()
                    .and_then(parse_rational)
                    .or_else(|| self.r_frame_rate.as_deref().and_then(parse_rational)),
            },
            Some("audio") => StreamKind::Audio {
                sample_rate: self.sample_rate.as_deref().and_then(|r| r.parse().ok()),
                channels: self.channels,
            },
            Some("subtitle") => StreamKind::Subtitle,
            other => StreamKind::Other {
                codec_type: other.unwrap_or("unknown").to_string(),
            },
        };

        Stream {
            index: self.index,
            codec: self.codec_name.unwrap_or_default(),
            kind,
            labels: StreamLabel {
                title: self.tags.get("title").cloned(),
                language: self.tags.get("language").cloned(),
                bitrate_bps: self.bit_rate.as_deref().and_then(|b| b.parse().ok()),
                channel_layout: self.channel_layout,
                default: self.disposition.get("default").copied().unwrap_or(0) != 0,
            },
        }
    }
}

/// Parses a frame rate like "24000/1001" or "25". "0/0" yields `None`.
fn parse_rational(value: &str) -> Option<f64> {
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Parses ffprobe JSON output into a [`ProbeReport`].
pub fn parse_probe_output(path: &Path, output: &str) -> Result<ProbeReport, ProbeError> {
    let probe: ProbeOutput = serde_json::from_str(output)
        .map_err(|e| ProbeError::parse(path, format!("invalid ffprobe output: {}", e)))?;

    let duration = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .and_then(|d| Duration::try_from_secs_f64(d).ok())
        .ok_or_else(|| ProbeError::NoDuration {
            path: path.to_path_buf(),
        })?;

    let labels = ContainerLabel {
        title: probe.format.tags.get("title").cloned(),
        size_bytes: probe.format.size.as_deref().and_then(|s| s.parse().ok()),
        bitrate_bps: probe.format.bit_rate.as_deref().and_then(|b| b.parse().ok()),
        format_long_name: probe.format.format_long_name,
    };

    let mut streams: Vec<Stream> = probe
        .streams
        .into_iter()
        .map(ProbeStream::into_stream)
        .collect();
    streams.sort_by_key(|s| s.index);

    Ok(ProbeReport {
        duration,
        streams,
        labels,
    })
}

#[async_trait]
impl Prober for FfprobeProber {
    fn name(&self) -> &str {
        "ffprobe"
    }

    async fn probe(&self, path: &Path) -> Result<ProbeReport, ProbeError> {
        if !path.exists() {
            return Err(ProbeError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        debug!("Probing {}", path.display());
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-show_format", "-show_streams", "-of", "json"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ProbeError::ToolNotFound {
                        tool: self.ffprobe_path.clone(),
                        path: path.to_path_buf(),
                    }
                } else {
                    ProbeError::Io {
                        path: path.to_path_buf(),
                        source: e,
                    }
                }
            })?;

        if !output.status.success() {
            return Err(ProbeError::Failed {
                path: path.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_probe_output(path, &stdout)
    }
}
