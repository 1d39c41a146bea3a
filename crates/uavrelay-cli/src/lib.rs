//! uavrelay CLI library
//!
//! Command-line front end: layered configuration loading, a configuration
//! checker and a loopback simulation built from the harness collaborators.

pub mod cli;
pub mod config;
pub mod error;
pub mod simulate;

pub use cli::{Cli, Commands};
pub use config::{AppConfig, SimulationConfig};
pub use error::{CliError, Result};
pub use simulate::{run_simulation, LinkReport, SimulationReport};
