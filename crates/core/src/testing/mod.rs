//! Testing utilities: a mock prober, a scripted ffmpeg stand-in and fixtures.
//!
//! # Example
//!
//! ```rust,ignore
//! use filmalize_core::testing::{fixtures, FakeFfmpeg, MockProber};
//!
//! let prober = MockProber::new();
//! prober.set_report("/media/a.mkv", fixtures::movie_report(60));
//!
//! let fake = FakeFfmpeg::new(dir.path()).progress_secs(&[30, 60]);
//! let orchestrator = Orchestrator::new(OrchestratorConfig::default(), Arc::new(fake.config()));
//! ```

mod fake_ffmpeg;
mod mock_prober;

pub use fake_ffmpeg::FakeFfmpeg;
pub use mock_prober::MockProber;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;
    use std::time::Duration;

    use crate::container::{
        Container, ContainerLabel, ConversionDefaults, ProbeReport, Selection, Stream,
        StreamKind, StreamLabel,
    };

    /// An h264 video stream.
    pub fn video_stream(index: u32) -> Stream {
        Stream {
            index,
            codec: "h264".to_string(),
            kind: StreamKind::Video {
                width: Some(1920),
                height: Some(1080),
                frame_rate: Some(23.976),
            },
            labels: StreamLabel::default(),
        }
    }

    /// A 5.1 AC-3 audio stream at 448 kb/s.
    pub fn audio_stream(index: u32, language: &str) -> Stream {
        Stream {
            index,
            codec: "ac3".to_string(),
            kind: StreamKind::Audio {
                sample_rate: Some(48000),
                channels: Some(6),
            },
            labels: StreamLabel {
                language: Some(language.to_string()),
                bitrate_bps: Some(448_000),
                channel_layout: Some("5.1(side)".to_string()),
                default: index == 1,
                ..Default::default()
            },
        }
    }

    pub fn subtitle_stream(index: u32, codec: &str, language: &str) -> Stream {
        Stream {
            index,
            codec: codec.to_string(),
            kind: StreamKind::Subtitle,
            labels: StreamLabel {
                language: Some(language.to_string()),
                ..Default::default()
            },
        }
    }

    /// Probe report of a feature film: one h264 video and one AC-3 audio stream.
    pub fn movie_report(duration_secs: u64) -> ProbeReport {
        ProbeReport {
            duration: Duration::from_secs(duration_secs),
            streams: vec![video_stream(0), audio_stream(1, "eng")],
            labels: ContainerLabel {
                title: Some("Test Movie".to_string()),
                size_bytes: Some(duration_secs * 1_000_000),
                bitrate_bps: Some(8_000_000),
                format_long_name: Some("Matroska / WebM".to_string()),
            },
        }
    }

    /// A probed container with the default selection and conversion defaults:
    /// video copied, audio transcoded to AAC, output next to the source as `.mp4`.
    pub fn configured_container(path: impl AsRef<Path>, duration_secs: u64) -> Container {
        let mut container = Container::from_probe(path.as_ref(), movie_report(duration_secs));
        container
            .configure(&ConversionDefaults::default(), &Selection::default())
            .expect("fixture report is convertible");
        container
    }
}
