mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    info!("ASMC CLI v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    if let Some(num_threads) = cli.threads {
        info!("Setting Rayon global thread pool to {} threads.", num_threads);
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| {
                CliError::Other(anyhow::anyhow!("Failed to build global thread pool: {}", e))
            })?;
    }

    let progress = if cli.quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };

    let result = match cli.command {
        Commands::Extract(args) => {
            info!("Dispatching to 'extract' command.");
            commands::extract::run(args, &progress)
        }
        Commands::Cluster(args) => {
            info!("Dispatching to 'cluster' command.");
            commands::cluster::run(args, &progress)
        }
        Commands::Sweep(args) => {
            info!("Dispatching to 'sweep' command.");
            commands::sweep::run(args, &progress)
        }
    };

    match &result {
        Ok(()) => {
            let failures = progress.failures();
            if failures.is_empty() {
                info!("Command completed successfully.");
            } else {
                info!(
                    failed = failures.len(),
                    "Command completed; some targets failed: {}",
                    failures.join(", ")
                );
            }
        }
        Err(e) => error!("Command failed: {}", e),
    }
    result
}
