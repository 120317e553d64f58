//! TaskWeave command-line front end.
//!
//! # Responsibility
//! - Resolve configuration from file, environment and flags.
//! - Run one lifecycle command against the configured backend.
//!
//! # Invariants
//! - Every failure is printed to stderr and yields a non-zero exit code.

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use commands::CliError;
use std::process::ExitCode;
use taskweave_core::{init_logging, AppConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = AppConfig::load(cli.config.as_deref(), &cli.overrides())?;
    init_logging(&config.logging)?;
    let service = commands::build_service(&config)?;
    commands::run(&service, cli.command).await
}
