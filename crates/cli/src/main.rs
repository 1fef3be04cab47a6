mod args;
mod convert;
mod discover;
mod display;
mod signal;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use filmalize_core::{load_config, load_default_config, validate_config, Config};

use args::{Cli, Command};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    // Quiet by default so log lines do not tear through the progress bars.
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load(&cli)?;
    let files = discover::discover(cli.file.as_deref(), cli.directory.as_deref(), cli.recursive)?;
    info!("Found {} file(s)", files.len());

    match &cli.command {
        Command::Display => convert::display(&config, files).await,
        Command::Convert(args) => convert::convert(&config, files, args).await,
    }
}

fn load(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None => load_default_config().context("Failed to load configuration")?,
    };
    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}
