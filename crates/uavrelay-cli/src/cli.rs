//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path (layered over uavrelay.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate the configuration and print the effective values as JSON
    CheckConfig,
    /// Run the router over in-memory loopback ports and print link statistics
    Simulate {
        /// How long to let the router run
        #[arg(short, long, default_value_t = 2)]
        seconds: u64,
        /// Frames injected on each side
        #[arg(short, long)]
        frames: Option<u8>,
    },
}
