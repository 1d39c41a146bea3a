//! Error handling for the uavrelay CLI

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Router error: {0}")]
    Relay(#[from] uavrelay_core::RelayError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Simulation failed: {0}")]
    Simulation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        CliError::Config(err.to_string())
    }
}

impl From<uavrelay_core::PortError> for CliError {
    fn from(err: uavrelay_core::PortError) -> Self {
        CliError::Simulation(err.to_string())
    }
}

impl From<uavrelay_core::TransportError> for CliError {
    fn from(err: uavrelay_core::TransportError) -> Self {
        CliError::Relay(err.into())
    }
}
