//! Stream descriptors and informational labels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The kind of a stream plus its kind-specific attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamKind {
    Video {
        #[serde(skip_serializing_if = "Option::is_none")]
        width: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        height: Option<u32>,
        /// Frames per second.
        #[serde(skip_serializing_if = "Option::is_none")]
        frame_rate: Option<f64>,
    },
    Audio {
        #[serde(skip_serializing_if = "Option::is_none")]
        sample_rate: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        channels: Option<u32>,
    },
    Subtitle,
    /// Data, attachment and anything else ffprobe reports (`codec_type` kept).
    Other { codec_type: String },
}

impl StreamKind {
    /// Short name as used by ffprobe's `codec_type`.
    pub fn name(&self) -> &str {
        match self {
            Self::Video { .. } => "video",
            Self::Audio { .. } => "audio",
            Self::Subtitle => "subtitle",
            Self::Other { codec_type } => codec_type,
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video { .. })
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, Self::Audio { .. })
    }

    /// Whether the stream can be written to an output file.
    pub fn is_convertible(&self) -> bool {
        !matches!(self, Self::Other { .. })
    }
}

/// Display-only metadata for a stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamLabel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Bitrate in bits per second.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_bps: Option<u64>,
    /// Channel layout such as "stereo" or "5.1(side)".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_layout: Option<String>,
    #[serde(default)]
    pub default: bool,
}

/// A single stream of a media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    /// Index as reported by ffprobe (used in `-map 0:<index>`).
    pub index: u32,
    /// Source codec name, e.g. "h264". Empty when ffprobe omits it.
    pub codec: String,
    #[serde(flatten)]
    pub kind: StreamKind,
    #[serde(default)]
    pub labels: StreamLabel,
}

impl Stream {
    /// Resolution as "WxH" when both dimensions are known.
    pub fn resolution(&self) -> Option<String> {
        match self.kind {
            StreamKind::Video {
                width: Some(w),
                height: Some(h),
                ..
            } => Some(format!("{}x{}", w, h)),
            _ => None,
        }
    }

    /// Source bitrate in kbit/s, rounded.
    pub fn bitrate_kbps(&self) -> Option<u32> {
        self.labels
            .bitrate_bps
            .map(|bps| ((bps as f64) / 1000.0).round() as u32)
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} {}", self.index, self.kind.name(), self.codec)?;
        match &self.kind {
            StreamKind::Video { frame_rate, .. } => {
                if let Some(res) = self.resolution() {
                    write!(f, " {}", res)?;
                }
                if let Some(fps) = frame_rate {
                    write!(f, " {:.3}fps", fps)?;
                }
            }
            StreamKind::Audio {
                sample_rate,
                channels,
            } => {
                if let Some(rate) = sample_rate {
                    write!(f, " {}Hz", rate)?;
                }
                match (&self.labels.channel_layout, channels) {
                    (Some(layout), _) => write!(f, " {}", layout)?,
                    (None, Some(n)) => write!(f, " {}ch", n)?,
                    (None, None) => {}
                }
            }
            _ => {}
        }
        if let Some(kbps) = self.bitrate_kbps() {
            write!(f, " {}kb/s", kbps)?;
        }
        if let Some(ref lang) = self.labels.language {
            write!(f, " [{}]", lang)?;
        }
        if let Some(ref title) = self.labels.title {
            write!(f, " \"{}\"", title)?;
        }
        if self.labels.default {
            write!(f, " (default)")?;
        }
        Ok(())
    }
}

/// Display-only metadata for a whole file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerLabel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_bps: Option<u64>,
    /// e.g. "Matroska / WebM"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_long_name: Option<String>,
}

/// Everything a probe learns about a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    /// Total source duration; always non-zero.
    pub duration: Duration,
    pub streams: Vec<Stream>,
    #[serde(default)]
    pub labels: ContainerLabel,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio_stream() -> Stream {
        Stream {
            index: 1,
            codec: "ac3".to_string(),
            kind: StreamKind::Audio {
                sample_rate: Some(48000),
                channels: Some(6),
            },
            labels: StreamLabel {
                language: Some("eng".to_string()),
                bitrate_bps: Some(448_000),
                channel_layout: Some("5.1(side)".to_string()),
                default: true,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_stream_kind_names() {
        assert_eq!(StreamKind::Subtitle.name(), "subtitle");
        let other = StreamKind::Other {
            codec_type: "attachment".to_string(),
        };
        assert_eq!(other.name(), "attachment");
        assert!(!other.is_convertible());
        assert!(StreamKind::Subtitle.is_convertible());
    }

    #[test]
    fn test_stream_display_audio() {
        let text = audio_stream().to_string();
        assert_eq!(text, "#1 audio ac3 48000Hz 5.1(side) 448kb/s [eng] (default)");
    }

    #[test]
    fn test_stream_display_video() {
        let stream = Stream {
            index: 0,
            codec: "hevc".to_string(),
            kind: StreamKind::Video {
                width: Some(3840),
                height: Some(2160),
                frame_rate: Some(24000.0 / 1001.0),
            },
            labels: StreamLabel::default(),
        };
        assert_eq!(stream.resolution().as_deref(), Some("3840x2160"));
        assert_eq!(stream.to_string(), "#0 video hevc 3840x2160 23.976fps");
    }

    #[test]
    fn test_stream_serializes_kind_inline() {
        let json = serde_json::to_value(audio_stream()).unwrap();
        assert_eq!(json["kind"], "audio");
        assert_eq!(json["sample_rate"], 48000);
        assert_eq!(json["codec"], "ac3");
    }
}
