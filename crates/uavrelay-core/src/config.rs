//! Centralized Configuration Management
//!
//! All router knobs live here: per-link queue sizing, the retry policy, the
//! receiver's read/idle timing and the optional poller. Durations are stored
//! as integer milliseconds so configuration files stay plain.

use crate::errors::{ConfigError, RelayResult};
use crate::types::{LinkId, ObjectRef};
use core::time::Duration;
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Retry Policy
// ----------------------------------------------------------------------------

/// Bounded retry policy applied to each dispatched transport operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Upper bound for a single attempt, in milliseconds
    pub timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            timeout_ms: 250,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, timeout: Duration) -> Self {
        Self {
            max_retries,
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Total attempts the dispatcher will make for one event
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ----------------------------------------------------------------------------
// Link Configuration
// ----------------------------------------------------------------------------

/// Static settings for one link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSettings {
    /// Human-readable name used in logs
    pub name: String,
    /// Capacity of the link's event queue
    pub queue_capacity: usize,
}

impl LinkSettings {
    pub fn new<T: Into<String>>(name: T, queue_capacity: usize) -> Self {
        Self {
            name: name.into(),
            queue_capacity,
        }
    }
}

// ----------------------------------------------------------------------------
// Receiver Configuration
// ----------------------------------------------------------------------------

/// Timing for the per-link receiver task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RxConfig {
    /// Bound on a single blocking read
    pub read_timeout_ms: u64,
    /// Sleep increment while the port is disabled
    pub idle_interval_ms: u64,
    /// Maximum bytes pulled from the port per read
    pub read_chunk: usize,
}

impl Default for RxConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 500,
            idle_interval_ms: 5,
            read_chunk: 1,
        }
    }
}

impl RxConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }
}

// ----------------------------------------------------------------------------
// Poller Configuration
// ----------------------------------------------------------------------------

/// Settings for the periodic input poller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Sampling period
    pub period_ms: u64,
    /// Link whose queue receives the poll ticks
    pub link: LinkId,
    /// Object the sampled values are committed to
    pub object: ObjectRef,
    /// Emit a diagnostic report every N ticks (0 disables)
    pub diagnostic_every: u32,
    /// Channel delta above which a diagnostic report flags a channel as moved
    pub diagnostic_threshold: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            period_ms: 50,
            link: LinkId::OUTPUT,
            object: ObjectRef::new(0),
            diagnostic_every: 20,
            diagnostic_threshold: 20,
        }
    }
}

impl PollerConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

// ----------------------------------------------------------------------------
// Router Configuration
// ----------------------------------------------------------------------------

/// Complete router configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Settings for [`LinkId::GROUND`] and [`LinkId::OUTPUT`], in that order
    pub links: [LinkSettings; 2],
    pub retry: RetryPolicy,
    pub rx: RxConfig,
    pub poller: Option<PollerConfig>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            links: [
                LinkSettings::new("gcs", 20),  // ground-station telemetry
                LinkSettings::new("out", 20),  // secondary radio
            ],
            retry: RetryPolicy::default(),
            rx: RxConfig::default(),
            poller: None,
        }
    }
}

impl RouterConfig {
    /// Settings for one link
    pub fn link(&self, id: LinkId) -> &LinkSettings {
        &self.links[id.index()]
    }

    /// Small queues for memory-constrained targets
    pub fn low_memory() -> Self {
        Self {
            links: [LinkSettings::new("gcs", 8), LinkSettings::new("out", 8)],
            ..Self::default()
        }
    }

    /// Short timeouts so tests do not wait on real-time bounds
    pub fn testing() -> Self {
        Self {
            links: [LinkSettings::new("a", 16), LinkSettings::new("b", 16)],
            retry: RetryPolicy {
                max_retries: 2,
                timeout_ms: 20,
            },
            rx: RxConfig {
                read_timeout_ms: 10,
                idle_interval_ms: 1,
                read_chunk: 1,
            },
            poller: None,
        }
    }

    /// Attach a poller
    pub fn with_poller(mut self, poller: PollerConfig) -> Self {
        self.poller = Some(poller);
        self
    }

    /// Reject configurations the router cannot run with
    pub fn validate(&self) -> RelayResult<()> {
        for id in LinkId::ALL {
            if self.link(id).queue_capacity == 0 {
                return Err(ConfigError::InvalidQueueCapacity { link: id }.into());
            }
        }
        if self.retry.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout {
                field: "retry.timeout_ms",
            }
            .into());
        }
        if self.rx.read_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout {
                field: "rx.read_timeout_ms",
            }
            .into());
        }
        if self.rx.idle_interval_ms == 0 {
            return Err(ConfigError::InvalidTimeout {
                field: "rx.idle_interval_ms",
            }
            .into());
        }
        if self.rx.read_chunk == 0 {
            return Err(ConfigError::Invalid {
                reason: "rx.read_chunk must be at least 1".to_string(),
            }
            .into());
        }
        if let Some(poller) = &self.poller {
            if poller.period_ms == 0 {
                return Err(ConfigError::InvalidPeriod.into());
            }
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
