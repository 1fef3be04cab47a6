use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// A simple tool for converting video files.
///
/// By default filmalize operates on every file in the current directory. An
/// individual file or another directory may be given instead; directory
/// operation may be recursive.
#[derive(Debug, Parser)]
#[command(name = "filmalize", version)]
pub struct Cli {
    /// Operate on a single file.
    #[arg(short, long, conflicts_with_all = ["directory", "recursive"])]
    pub file: Option<PathBuf>,

    /// Operate on the files of a directory.
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// Descend into subdirectories.
    #[arg(short, long)]
    pub recursive: bool,

    /// Configuration file.
    #[arg(short, long, env = "FILMALIZE_CONFIG")]
    pub config: Option<PathBuf>,

    /// More log output (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Display information about video file(s)
    Display,

    /// Convert video file(s)
    Convert(ConvertArgs),
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Stream indexes to keep, e.g. "0 1" (default: first video and first audio).
    #[arg(long, value_parser = parse_streams)]
    pub streams: Option<StreamList>,

    /// Re-encode selected video streams with this CRF.
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=51))]
    pub crf: Option<u8>,

    /// Re-encode selected audio streams at this bitrate (kbit/s).
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub bitrate: Option<u32>,

    /// Maximum simultaneous conversions (0 = unlimited).
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Print status lines instead of progress bars.
    #[arg(long)]
    pub plain: bool,

    /// Print the ffmpeg commands without running them.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamList(pub Vec<u32>);

fn parse_streams(value: &str) -> Result<StreamList, String> {
    let streams = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map_err(|_| format!("'{}' is not a stream index", s))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if streams.is_empty() {
        return Err("no stream indexes given".to_string());
    }
    Ok(StreamList(streams))
}
