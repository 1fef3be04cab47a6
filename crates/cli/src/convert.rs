//! The `display` and `convert` commands.

use anyhow::{Context, Result};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

use filmalize_core::container::{Selection, StreamKind};
use filmalize_core::{
    build_containers, Config, Container, FfmpegCommand, FfprobeProber, Orchestrator,
    ProbeError, ProgressRenderer, RenderMode, RunSummary,
};

use crate::args::ConvertArgs;
use crate::display::{container_report, conversion_plan};
use crate::signal::shutdown_signal;

/// Exit status after an interrupt, as a shell reports SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

pub async fn display(config: &Config, files: Vec<PathBuf>) -> Result<ExitCode> {
    let containers = probe(config, files).await;
    for container in &containers {
        println!("{}", container_report(container));
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn convert(config: &Config, files: Vec<PathBuf>, args: &ConvertArgs) -> Result<ExitCode> {
    let mut containers = probe(config, files).await;
    containers.retain_mut(|container| {
        let selection = selection_for(container, args);
        match container.configure(&config.defaults, &selection).map(|_| ()) {
            Ok(()) => true,
            Err(e) => {
                warn_user(&format!("skipping {}: {}", container.label(), e));
                false
            }
        }
    });

    if containers.is_empty() {
        println!("Nothing to convert.");
        return Ok(ExitCode::SUCCESS);
    }

    if args.dry_run {
        for container in &containers {
            if let Some(spec) = container.spec() {
                let command = FfmpegCommand::build(&config.converter, container.path(), spec);
                println!("{}", conversion_plan(container, &command));
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut orchestrator_config = config.orchestrator.clone();
    if let Some(jobs) = args.jobs {
        orchestrator_config.max_concurrent_jobs = jobs;
    }
    let mut renderer_config = config.renderer.clone();
    if args.plain {
        renderer_config.mode = RenderMode::Lines;
    }

    let mut orchestrator =
        Orchestrator::new(orchestrator_config, Arc::new(config.converter.clone()));
    orchestrator
        .start(containers)
        .context("Failed to start conversions")?;

    let renderer = tokio::spawn(ProgressRenderer::new(renderer_config).run(orchestrator.monitor()));
    let summary = orchestrator.wait_all_or_interrupt(shutdown_signal()).await;
    if let Err(e) = renderer.await {
        warn!("Progress display stopped unexpectedly: {}", e);
    }

    print!("{}", summary);
    Ok(exit_code(&summary))
}

async fn probe(config: &Config, files: Vec<PathBuf>) -> Vec<Container> {
    let prober = FfprobeProber::from_config(&config.converter);
    info!("Probing {} file(s)", files.len());
    let (containers, errors) = build_containers(&prober, files).await;
    for error in &errors {
        report_probe_error(error);
    }
    containers
}

fn report_probe_error(error: &ProbeError) {
    warn_user(&format!("unable to process {}", error.path().display()));
    eprintln!("{}", error);
}

fn warn_user(message: &str) {
    eprintln!("{}", style(format!("Warning: {}", message)).red());
}

/// Applies the command-line choices to one container's streams.
fn selection_for(container: &Container, args: &ConvertArgs) -> Selection {
    let mut selection = Selection::default();
    if let Some(streams) = &args.streams {
        selection = selection.with_streams(streams.0.clone());
    }

    let chosen: Vec<u32> = match &args.streams {
        Some(streams) => streams.0.clone(),
        None => filmalize_core::container::default_streams(container.streams()),
    };
    for stream in container.streams().iter().filter(|s| chosen.contains(&s.index)) {
        match (&stream.kind, args.crf, args.bitrate) {
            (StreamKind::Video { .. }, Some(crf), _) => {
                selection = selection.with_crf(stream.index, crf);
            }
            (StreamKind::Audio { .. }, _, Some(kbps)) => {
                selection = selection.with_bitrate(stream.index, kbps);
            }
            _ => {}
        }
    }
    selection
}

pub fn exit_code(summary: &RunSummary) -> ExitCode {
    if summary.interrupted {
        ExitCode::from(EXIT_INTERRUPTED)
    } else if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::StreamList;
    use filmalize_core::testing::fixtures;

    fn args() -> ConvertArgs {
        ConvertArgs {
            streams: None,
            crf: None,
            bitrate: None,
            jobs: None,
            plain: false,
            dry_run: false,
        }
    }

    fn movie() -> Container {
        let mut report = fixtures::movie_report(60);
        report.streams.push(fixtures::audio_stream(2, "fre"));
        Container::from_probe("/media/movie.mkv", report)
    }

    #[test]
    fn test_default_selection_has_no_overrides() {
        let selection = selection_for(&movie(), &args());
        assert_eq!(selection.streams, None);
        assert!(selection.overrides.is_empty());
    }

    #[test]
    fn test_overrides_apply_to_selected_streams_of_matching_kind() {
        let args = ConvertArgs {
            streams: Some(StreamList(vec![0, 2])),
            crf: Some(22),
            bitrate: Some(192),
            ..args()
        };
        let selection = selection_for(&movie(), &args);
        assert_eq!(selection.streams, Some(vec![0, 2]));
        assert_eq!(selection.overrides[&0].crf, Some(22));
        assert_eq!(selection.overrides[&2].bitrate_kbps, Some(192));
        assert!(!selection.overrides.contains_key(&1));
    }

    #[test]
    fn test_exit_codes() {
        let summary = RunSummary::default();
        assert_eq!(exit_code(&summary), ExitCode::SUCCESS);
        let interrupted = RunSummary {
            interrupted: true,
            ..Default::default()
        };
        assert_eq!(exit_code(&interrupted), ExitCode::from(130));
    }
}
