//! Conversion specs: what each selected stream becomes in the output file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::error::ContainerError;
use super::types::{Stream, StreamKind};

/// Encoding choices applied when the user does not override them.
///
/// A stream already in the target codec is copied; anything else is
/// transcoded with the configured encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionDefaults {
    /// Output file extension, without the dot.
    #[serde(default = "default_extension")]
    pub target_extension: String,

    /// Video codec that may be copied as-is.
    #[serde(default = "default_video_codec")]
    pub video_codec: String,
    #[serde(default = "default_video_encoder")]
    pub video_encoder: String,
    #[serde(default = "default_preset")]
    pub video_preset: String,
    #[serde(default = "default_crf")]
    pub crf: u8,
    #[serde(default = "default_pix_fmt")]
    pub pix_fmt: String,

    /// Audio codec that may be copied as-is; also the encoder used otherwise.
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    /// Fallback bitrate when the source stream does not report one.
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate_kbps: u32,

    #[serde(default = "default_subtitle_codec")]
    pub subtitle_codec: String,
}

fn default_extension() -> String {
    "mp4".to_string()
}

fn default_video_codec() -> String {
    "h264".to_string()
}

fn default_video_encoder() -> String {
    "libx264".to_string()
}

fn default_preset() -> String {
    "medium".to_string()
}

fn default_crf() -> u8 {
    18
}

fn default_pix_fmt() -> String {
    "yuv420p".to_string()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> u32 {
    384
}

fn default_subtitle_codec() -> String {
    "mov_text".to_string()
}

impl Default for ConversionDefaults {
    fn default() -> Self {
        Self {
            target_extension: default_extension(),
            video_codec: default_video_codec(),
            video_encoder: default_video_encoder(),
            video_preset: default_preset(),
            crf: default_crf(),
            pix_fmt: default_pix_fmt(),
            audio_codec: default_audio_codec(),
            audio_bitrate_kbps: default_audio_bitrate(),
            subtitle_codec: default_subtitle_codec(),
        }
    }
}

/// Which kind of output stream a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Video,
    Audio,
    Subtitle,
}

impl TargetKind {
    /// Stream specifier letter used by ffmpeg (`-c:v:0`).
    pub fn specifier(&self) -> char {
        match self {
            Self::Video => 'v',
            Self::Audio => 'a',
            Self::Subtitle => 's',
        }
    }
}

/// Codec and options for one output stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TargetCodec {
    Copy,
    Video {
        encoder: String,
        preset: String,
        crf: u8,
        pix_fmt: String,
    },
    Audio {
        encoder: String,
        bitrate_kbps: u32,
    },
    Subtitle {
        encoder: String,
    },
}

impl TargetCodec {
    /// One-line description, e.g. "transcode -> libx264, crf=18".
    pub fn summary(&self) -> String {
        match self {
            Self::Copy => "copy".to_string(),
            Self::Video { encoder, crf, .. } => format!("transcode -> {}, crf={}", encoder, crf),
            Self::Audio {
                encoder,
                bitrate_kbps,
            } => format!("transcode -> {}, bitrate={}kb/s", encoder, bitrate_kbps),
            Self::Subtitle { encoder } => format!("transcode -> {}", encoder),
        }
    }
}

/// A selected source stream and what it becomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamTarget {
    /// Source stream index.
    pub index: u32,
    pub kind: TargetKind,
    pub codec: TargetCodec,
}

/// An external subtitle file muxed into the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleFile {
    pub path: PathBuf,
    /// Character encoding passed to `-sub_charenc`.
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

fn default_encoding() -> String {
    "UTF-8".to_string()
}

impl SubtitleFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            encoding: default_encoding(),
        }
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }
}

/// Per-stream choices that force a transcode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamOverride {
    pub crf: Option<u8>,
    pub bitrate_kbps: Option<u32>,
}

/// What the user picked for one file.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Source stream indexes; `None` selects the first video and first audio stream.
    pub streams: Option<Vec<u32>>,
    pub overrides: BTreeMap<u32, StreamOverride>,
    /// Output file name (placed next to the source).
    pub output_name: Option<String>,
    pub subtitle_files: Vec<SubtitleFile>,
}

impl Selection {
    pub fn with_streams(mut self, streams: Vec<u32>) -> Self {
        self.streams = Some(streams);
        self
    }

    pub fn with_crf(mut self, index: u32, crf: u8) -> Self {
        self.overrides.entry(index).or_default().crf = Some(crf);
        self
    }

    pub fn with_bitrate(mut self, index: u32, bitrate_kbps: u32) -> Self {
        self.overrides.entry(index).or_default().bitrate_kbps = Some(bitrate_kbps);
        self
    }

    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    pub fn with_subtitle_file(mut self, file: SubtitleFile) -> Self {
        self.subtitle_files.push(file);
        self
    }
}

/// The complete conversion request for one Container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionSpec {
    pub output_path: PathBuf,
    /// Ordered by source index.
    pub streams: Vec<StreamTarget>,
    #[serde(default)]
    pub subtitle_files: Vec<SubtitleFile>,
}

impl ConversionSpec {
    /// Builds a spec for `source` from its streams, the defaults and a selection.
    pub fn build(
        source: &Path,
        streams: &[Stream],
        defaults: &ConversionDefaults,
        selection: &Selection,
    ) -> Result<Self, ContainerError> {
        let mut indexes = match &selection.streams {
            Some(explicit) => explicit.clone(),
            None => default_streams(streams),
        };
        indexes.sort_unstable();
        indexes.dedup();

        if indexes.is_empty() && selection.subtitle_files.is_empty() {
            return Err(ContainerError::EmptySelection {
                path: source.to_path_buf(),
            });
        }

        let targets = indexes
            .into_iter()
            .map(|index| {
                let stream = streams
                    .iter()
                    .find(|s| s.index == index)
                    .ok_or(ContainerError::UnknownStream { index })?;
                let overrides = selection.overrides.get(&index).copied().unwrap_or_default();
                target_for(stream, defaults, overrides)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output_path = output_path(source, defaults, selection.output_name.as_deref());
        if output_path == source {
            return Err(ContainerError::OutputIsSource { path: output_path });
        }

        Ok(Self {
            output_path,
            streams: targets,
            subtitle_files: selection.subtitle_files.clone(),
        })
    }
}

/// First video stream and first audio stream, in index order.
pub fn default_streams(streams: &[Stream]) -> Vec<u32> {
    let video = streams.iter().find(|s| s.kind.is_video()).map(|s| s.index);
    let audio = streams.iter().find(|s| s.kind.is_audio()).map(|s| s.index);
    let mut selected: Vec<u32> = video.into_iter().chain(audio).collect();
    selected.sort_unstable();
    selected
}

fn target_for(
    stream: &Stream,
    defaults: &ConversionDefaults,
    overrides: StreamOverride,
) -> Result<StreamTarget, ContainerError> {
    let target = match &stream.kind {
        StreamKind::Video { .. } => {
            let codec = if overrides.crf.is_some() || stream.codec != defaults.video_codec {
                TargetCodec::Video {
                    encoder: defaults.video_encoder.clone(),
                    preset: defaults.video_preset.clone(),
                    crf: overrides.crf.unwrap_or(defaults.crf),
                    pix_fmt: defaults.pix_fmt.clone(),
                }
            } else {
                TargetCodec::Copy
            };
            StreamTarget {
                index: stream.index,
                kind: TargetKind::Video,
                codec,
            }
        }
        StreamKind::Audio { .. } => {
            let codec =
                if overrides.bitrate_kbps.is_some() || stream.codec != defaults.audio_codec {
                    TargetCodec::Audio {
                        encoder: defaults.audio_codec.clone(),
                        bitrate_kbps: overrides
                            .bitrate_kbps
                            .or_else(|| stream.bitrate_kbps())
                            .unwrap_or(defaults.audio_bitrate_kbps),
                    }
                } else {
                    TargetCodec::Copy
                };
            StreamTarget {
                index: stream.index,
                kind: TargetKind::Audio,
                codec,
            }
        }
        StreamKind::Subtitle => {
            let codec = if stream.codec == defaults.subtitle_codec {
                TargetCodec::Copy
            } else {
                TargetCodec::Subtitle {
                    encoder: defaults.subtitle_codec.clone(),
                }
            };
            StreamTarget {
                index: stream.index,
                kind: TargetKind::Subtitle,
                codec,
            }
        }
        StreamKind::Other { codec_type } => {
            return Err(ContainerError::UnsupportedStream {
                index: stream.index,
                kind: codec_type.clone(),
            })
        }
    };
    Ok(target)
}

fn output_path(source: &Path, defaults: &ConversionDefaults, name: Option<&str>) -> PathBuf {
    let file_name = match name {
        Some(name) => name.to_string(),
        None => {
            let stem = source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "output".to_string());
            format!(
                "{}.{}",
                stem,
                defaults.target_extension.trim_start_matches('.')
            )
        }
    };
    match source.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}
