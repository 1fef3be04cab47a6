//! Human-readable views of containers and planned conversions.

use console::style;
use std::fmt::Write as _;
use std::time::Duration;

use filmalize_core::{Container, FfmpegCommand};

pub fn container_report(container: &Container) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        style(format!("*** File: {} ***", container.label())).magenta()
    );

    if let Some(labels) = container.labels() {
        if let Some(title) = &labels.title {
            let _ = writeln!(out, "{}", style(format!("Title: {}", title)).cyan());
        }
        let mut facts = Vec::new();
        if let Some(duration) = container.duration() {
            facts.push(format!("Length: {}", clock(duration)));
        }
        if let Some(size) = labels.size_bytes {
            facts.push(format!("Size: {:.1}MiB", size as f64 / (1024.0 * 1024.0)));
        }
        if let Some(bps) = labels.bitrate_bps {
            facts.push(format!("Bitrate: {:.2}Mb/s", bps as f64 / 1_000_000.0));
        }
        if let Some(format) = &labels.format_long_name {
            facts.push(format!("Container: {}", format));
        }
        if !facts.is_empty() {
            let _ = writeln!(out, "{}", facts.join(" | "));
        }
    }

    for stream in container.streams() {
        let _ = writeln!(out, "  {}", stream);
    }
    out
}

/// What will happen to a configured container.
pub fn conversion_plan(container: &Container, command: &FfmpegCommand) -> String {
    let mut out = container_report(container);
    let Some(spec) = container.spec() else {
        return out;
    };

    let _ = writeln!(out, "{}", style("Filmalize Actions:").cyan().bold());
    for target in &spec.streams {
        let _ = writeln!(
            out,
            "{} {}",
            style(format!("Stream {}:", target.index)).green().bold(),
            style(target.codec.summary()).yellow()
        );
    }
    for subtitle in &spec.subtitle_files {
        let _ = writeln!(
            out,
            "{} {}",
            style(format!("{}:", subtitle.path.display())).green().bold(),
            style(format!("subtitles ({})", subtitle.encoding)).yellow()
        );
    }
    let _ = writeln!(
        out,
        "{}",
        style(format!("Output File: {}", spec.output_path.display())).magenta()
    );
    let _ = writeln!(out, "{}", style("Command:").cyan().bold());
    let _ = writeln!(out, "{}", command);
    out
}

fn clock(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60)
}
