//! Builds the ffmpeg command line for a conversion spec.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::config::ConverterConfig;
use crate::container::{ConversionSpec, TargetCodec, TargetKind};

/// A fully built ffmpeg invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl FfmpegCommand {
    /// Builds the command converting `source` according to `spec`.
    ///
    /// Progress goes to stdout (`-progress pipe:1`); stderr only carries
    /// ffmpeg's own messages at the configured log level.
    pub fn build(config: &ConverterConfig, source: &Path, spec: &ConversionSpec) -> Self {
        let mut args: Vec<String> = config.global_args.clone();

        args.extend([
            "-nostdin".to_string(),
            "-nostats".to_string(),
            "-progress".to_string(),
            "pipe:1".to_string(),
            "-v".to_string(),
            config.ffmpeg_log_level.clone(),
            "-y".to_string(),
            "-i".to_string(),
            source.to_string_lossy().to_string(),
        ]);

        for subtitle in &spec.subtitle_files {
            args.extend([
                "-sub_charenc".to_string(),
                subtitle.encoding.clone(),
                "-i".to_string(),
                subtitle.path.to_string_lossy().to_string(),
            ]);
        }

        for target in &spec.streams {
            args.extend(["-map".to_string(), format!("0:{}", target.index)]);
        }
        for input in 1..=spec.subtitle_files.len() {
            args.extend(["-map".to_string(), format!("{}:0", input)]);
        }

        // Output streams are numbered per kind, in mapping order.
        let mut numbers: HashMap<TargetKind, usize> = HashMap::new();
        let mut next_number = |kind: TargetKind| {
            let n = numbers.entry(kind).or_insert(0);
            let current = *n;
            *n += 1;
            format!("{}:{}", kind.specifier(), current)
        };

        for target in &spec.streams {
            let stream = next_number(target.kind);
            args.extend(codec_args(&stream, &target.codec));
        }
        if let Some(subtitle_encoder) = subtitle_encoder(spec) {
            for _ in &spec.subtitle_files {
                let stream = next_number(TargetKind::Subtitle);
                args.extend([format!("-c:{}", stream), subtitle_encoder.clone()]);
            }
        }

        args.extend(config.extra_ffmpeg_args.iter().cloned());
        args.push(spec.output_path.to_string_lossy().to_string());

        Self {
            program: config.ffmpeg_path.clone(),
            args,
        }
    }
}

/// External subtitle files are always encoded, using the same encoder as
/// transcoded subtitle streams, or mov_text when none is selected.
fn subtitle_encoder(spec: &ConversionSpec) -> Option<String> {
    if spec.subtitle_files.is_empty() {
        return None;
    }
    let encoder = spec
        .streams
        .iter()
        .find_map(|t| match &t.codec {
            TargetCodec::Subtitle { encoder } => Some(encoder.clone()),
            _ => None,
        })
        .unwrap_or_else(|| "mov_text".to_string());
    Some(encoder)
}

fn codec_args(stream: &str, codec: &TargetCodec) -> Vec<String> {
    match codec {
        TargetCodec::Copy => vec![format!("-c:{}", stream), "copy".to_string()],
        TargetCodec::Video {
            encoder,
            preset,
            crf,
            pix_fmt,
        } => vec![
            format!("-c:{}", stream),
            encoder.clone(),
            format!("-preset:{}", stream),
            preset.clone(),
            format!("-crf:{}", stream),
            crf.to_string(),
            format!("-pix_fmt:{}", stream),
            pix_fmt.clone(),
        ],
        TargetCodec::Audio {
            encoder,
            bitrate_kbps,
        } => vec![
            format!("-c:{}", stream),
            encoder.clone(),
            format!("-b:{}", stream),
            format!("{}k", bitrate_kbps),
        ],
        TargetCodec::Subtitle { encoder } => vec![format!("-c:{}", stream), encoder.clone()],
    }
}

impl fmt::Display for FfmpegCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program.to_string_lossy()))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,+@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
