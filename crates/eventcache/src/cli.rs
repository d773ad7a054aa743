//! Exposes the command line application.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use eventcache_service::config::Config;
use eventcache_service::{logging, metrics};

use crate::server;

/// Eventcache commands.
#[derive(Subcommand)]
enum Command {
    /// Run the cache service.
    Run,
}

/// Command line interface parser.
#[derive(Parser)]
#[command(bin_name = "eventcache", version)]
struct Cli {
    /// Path to your configuration file.
    #[arg(long = "config", short = 'c', global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    /// Returns the path to the configuration file.
    fn config(&self) -> Option<&Path> {
        self.config.as_deref()
    }
}

/// Runs the main application.
pub fn execute() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::get(cli.config()).context("failed loading config")?;

    // SAFETY: The runtime has not started yet, no other threads exist.
    unsafe { logging::init_logging(&config) };

    if let Some(ref statsd) = config.metrics.statsd {
        metrics::configure_statsd(
            &config.metrics.prefix,
            statsd,
            config.metrics.custom_tags.clone(),
        );
    }

    match cli.command {
        Command::Run => server::run(config).context("failed to start the service")?,
    }

    Ok(())
}
