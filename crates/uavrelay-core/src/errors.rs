//! Error types for the uavrelay router
//!
//! Specific error enums for each collaborator boundary (transport session,
//! byte port, object store, configuration) plus the `RelayError` type that
//! unifies them. None of these are fatal: the router counts and drops.

use crate::types::{LinkId, ObjectRef};

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Errors reported by a transport session for a single send attempt
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Transport timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
    #[error("Port is disabled")]
    PortDisabled,
    #[error("Remote side did not acknowledge object {object}")]
    Nack { object: ObjectRef },
    #[error("Send rejected: {reason}")]
    Rejected { reason: String },
    #[error("Port I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a byte-stream port
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Port is disabled")]
    Disabled,
    #[error("Port closed")]
    Closed,
    #[error("Port I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by the object store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unknown object {object}")]
    UnknownObject { object: ObjectRef },
    #[error("Object {object} is read-only")]
    AccessDenied { object: ObjectRef },
}

/// Errors raised while validating router configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Queue capacity for {link} must be at least 1")]
    InvalidQueueCapacity { link: LinkId },
    #[error("Timeout `{field}` must be non-zero")]
    InvalidTimeout { field: &'static str },
    #[error("Poll period must be non-zero")]
    InvalidPeriod,
    #[error("{reason}")]
    Invalid { reason: String },
}

// ----------------------------------------------------------------------------
// Relay Error
// ----------------------------------------------------------------------------

/// Core error type for the uavrelay router
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Port error: {0}")]
    Port(#[from] PortError),

    #[error("Object store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Producer could not enqueue because the link queue is at capacity
    #[error("Event queue for {link} is full")]
    QueueFull { link: LinkId },

    /// The link's sender task is gone
    #[error("Event queue for {link} is closed")]
    QueueClosed { link: LinkId },

    /// Task join or spawn failure
    #[error("Task error: {message}")]
    Task { message: String },
}

// ----------------------------------------------------------------------------
// Convenience Error Constructors
// ----------------------------------------------------------------------------

impl RelayError {
    /// Create a configuration error with a reason
    pub fn config_error<T: Into<String>>(reason: T) -> Self {
        RelayError::Configuration(ConfigError::Invalid {
            reason: reason.into(),
        })
    }

    /// Create a task error with a message
    pub fn task_error<T: Into<String>>(message: T) -> Self {
        RelayError::Task {
            message: message.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, RelayError>;
pub type RelayResult<T> = Result<T>;
