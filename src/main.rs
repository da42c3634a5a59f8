mod calendar;
mod config;
mod engine;
mod growth;
mod manager;
mod maturity;
mod model;
mod mortality;
mod recruitment;
mod sampling;
mod stats;
mod traits;

use crate::manager::Manager;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Individual-based fish population simulator.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Directory holding `config.toml` and the run directories.
    #[arg(long)]
    sim_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the configuration without running it.
    Check,

    /// Simulate a new run.
    Run {
        /// Seed overriding the configured one.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Delete every run directory.
    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = Cli::parse();
    log::debug!("{args:#?}");

    let mgr = Manager::new(&args.sim_dir)
        .with_context(|| format!("failed to load simulation in {:?}", args.sim_dir))?;

    match args.command {
        Command::Check => mgr.check_sim(),
        Command::Run { seed } => mgr.create_run(seed),
        Command::Clean => mgr.clean_sim(),
    }
}
