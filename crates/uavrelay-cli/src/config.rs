//! Layered configuration for the uavrelay CLI
//!
//! Priority, lowest first: built-in defaults, `uavrelay.toml` in the working
//! directory, the file passed with `--config`, then `UAVRELAY_*` environment
//! variables (nested keys separated by `__`, e.g.
//! `UAVRELAY_ROUTER__RETRY__TIMEOUT_MS=100`).

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use uavrelay_core::RouterConfig;

use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Everything the CLI can be configured with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Router configuration, passed to the runtime unchanged
    pub router: RouterConfig,
    /// Loopback simulation parameters
    pub simulation: SimulationConfig,
}

/// Parameters for `uavrelay simulate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Frames injected from each remote end
    pub frames_per_side: u8,
    /// Drive a poller with a swept receiver input
    pub poll: bool,
    /// Number of receiver channels in each polled sample
    pub channels: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            frames_per_side: 5,
            poll: true,
            channels: 8,
        }
    }
}

impl AppConfig {
    /// Load defaults, `uavrelay.toml`, an optional explicit file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Self::default()))
            // Working-directory file if it exists
            .merge(Toml::file("uavrelay.toml"));
        if let Some(path) = path {
            if !path.exists() {
                return Err(CliError::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }
        let figment = figment.merge(Env::prefixed("UAVRELAY_").split("__"));

        let config: AppConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.router.validate()?;
        if self.simulation.poll && self.simulation.channels == 0 {
            return Err(CliError::Config(
                "simulation.channels must be at least 1 when polling".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uavrelay_core::LinkId;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.router.link(LinkId::GROUND).queue_capacity, 20);
        assert_eq!(config.router.retry.max_retries, 2);
        assert_eq!(config.router.retry.timeout_ms, 250);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("uavrelay-cli-test-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[router.retry]\nmax_retries = 4\ntimeout_ms = 100\n\n[simulation]\nframes_per_side = 9\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.router.retry.max_retries, 4);
        assert_eq!(config.router.retry.timeout_ms, 100);
        assert_eq!(config.simulation.frames_per_side, 9);
        assert!(config.simulation.poll);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("uavrelay-cli-test-missing.toml");
        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_router_config_rejected() {
        let mut config = AppConfig::default();
        config.router.links[1].queue_capacity = 0;
        assert!(matches!(config.validate(), Err(CliError::Relay(_))));
    }
}
