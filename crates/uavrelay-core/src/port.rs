//! Byte-stream port abstraction
//!
//! Serial drivers are outside the router; a link only needs to read bytes
//! from its port with a bounded wait. Sessions write through the same port.

use alloc::sync::Arc;
use async_trait::async_trait;
use core::fmt;
use core::time::Duration;

use crate::errors::PortError;

/// A byte-stream endpoint (serial port, USB CDC, radio modem, ...)
#[async_trait]
pub trait BytePort: Send + Sync {
    /// Read up to `buf.len()` bytes, waiting at most `timeout`.
    ///
    /// Returns `Ok(0)` when the wait elapsed with nothing to read.
    async fn read(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, PortError>;

    /// Write bytes without blocking on the far end; returns bytes accepted
    async fn write(&self, bytes: &[u8]) -> Result<usize, PortError>;

    /// Name used in logs
    fn name(&self) -> &str;
}

/// Port handle held by a link; `Disabled` makes the link inert
#[derive(Clone, Default)]
pub enum Port {
    #[default]
    Disabled,
    Enabled(Arc<dyn BytePort>),
}

impl Port {
    pub fn enabled(port: Arc<dyn BytePort>) -> Self {
        Port::Enabled(port)
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Port::Disabled)
    }

    /// The underlying port, if any
    pub fn get(&self) -> Option<&Arc<dyn BytePort>> {
        match self {
            Port::Disabled => None,
            Port::Enabled(port) => Some(port),
        }
    }
}

impl fmt::Debug for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Disabled => write!(f, "Port(disabled)"),
            Port::Enabled(port) => write!(f, "Port({})", port.name()),
        }
    }
}
