//! uavrelay CLI entry point

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tokio::time::Duration;
use tracing::info;

use uavrelay_cli::{
    cli::{Cli, Commands},
    config::AppConfig,
    simulate::run_simulation,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    setup_logging(cli.verbose);

    // Load configuration
    let mut config = AppConfig::load(cli.config.as_deref().map(Path::new))
        .context("failed to load configuration")?;

    match cli.command {
        Commands::CheckConfig => {
            info!("configuration is valid");
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Simulate { seconds, frames } => {
            if let Some(frames) = frames {
                config.simulation.frames_per_side = frames;
            }
            let report = run_simulation(&config, Duration::from_secs(seconds))
                .await
                .context("simulation failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
