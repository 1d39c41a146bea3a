//! In-memory byte port
//!
//! `MemoryPort::pair` returns two ports wired back to back: bytes written on
//! one are read from the other. Tests can also inject inbound bytes directly
//! and inspect everything a port wrote.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::time::{self, Duration};
use uavrelay_core::{BytePort, PortError};

use tracing::trace;

struct Inbound {
    receiver: mpsc::UnboundedReceiver<Vec<u8>>,
    pending: VecDeque<u8>,
}

/// Byte port backed by unbounded channels
pub struct MemoryPort {
    name: String,
    injector: mpsc::UnboundedSender<Vec<u8>>,
    inbound: AsyncMutex<Inbound>,
    remote: Option<mpsc::UnboundedSender<Vec<u8>>>,
    written: Mutex<Vec<u8>>,
    closed: AtomicBool,
}

impl MemoryPort {
    /// Standalone port: writes are only recorded
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        let (injector, receiver) = mpsc::unbounded_channel();
        Arc::new(Self::with_channels(name.into(), injector, receiver, None))
    }

    /// Two ports connected to each other
    pub fn pair(a: impl Into<String>, b: impl Into<String>) -> (Arc<Self>, Arc<Self>) {
        let (to_a, from_a) = mpsc::unbounded_channel();
        let (to_b, from_b) = mpsc::unbounded_channel();
        let port_a = Self::with_channels(a.into(), to_a.clone(), from_a, Some(to_b.clone()));
        let port_b = Self::with_channels(b.into(), to_b, from_b, Some(to_a));
        (Arc::new(port_a), Arc::new(port_b))
    }

    fn with_channels(
        name: String,
        injector: mpsc::UnboundedSender<Vec<u8>>,
        receiver: mpsc::UnboundedReceiver<Vec<u8>>,
        remote: Option<mpsc::UnboundedSender<Vec<u8>>>,
    ) -> Self {
        Self {
            name,
            injector,
            inbound: AsyncMutex::new(Inbound {
                receiver,
                pending: VecDeque::new(),
            }),
            remote,
            written: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Make `bytes` readable from this port
    pub fn inject(&self, bytes: &[u8]) {
        let _ = self.injector.send(bytes.to_vec());
    }

    /// Everything written to this port so far
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().clone()
    }

    /// Further reads and writes fail with `PortError::Closed`
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn ensure_open(&self) -> Result<(), PortError> {
        if self.closed.load(Ordering::Acquire) {
            Err(PortError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BytePort for MemoryPort {
    async fn read(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, PortError> {
        self.ensure_open()?;
        let mut inbound = self.inbound.lock().await;
        if inbound.pending.is_empty() {
            match time::timeout(timeout, inbound.receiver.recv()).await {
                Err(_) => return Ok(0),
                Ok(None) => return Err(PortError::Closed),
                Ok(Some(chunk)) => inbound.pending.extend(chunk),
            }
        }

        let count = buf.len().min(inbound.pending.len());
        for (slot, byte) in buf.iter_mut().zip(inbound.pending.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }

    async fn write(&self, bytes: &[u8]) -> Result<usize, PortError> {
        self.ensure_open()?;
        trace!(port = %self.name, len = bytes.len(), "write");
        self.written.lock().extend_from_slice(bytes);
        if let Some(remote) = &self.remote {
            remote.send(bytes.to_vec()).map_err(|_| PortError::Closed)?;
        }
        Ok(bytes.len())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_carries_bytes_across() {
        let (a, b) = MemoryPort::pair("a", "b");
        a.write(&[1, 2, 3]).await.unwrap();

        let mut buf = [0u8; 2];
        assert_eq!(b.read(&mut buf, Duration::from_millis(10)).await.unwrap(), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(b.read(&mut buf, Duration::from_millis(10)).await.unwrap(), 1);
        assert_eq!(buf[0], 3);
        assert_eq!(a.written(), vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_times_out_with_zero() {
        let port = MemoryPort::new("idle");
        let mut buf = [0u8; 4];
        assert_eq!(port.read(&mut buf, Duration::from_millis(500)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_closed_port_errors() {
        let port = MemoryPort::new("closed");
        port.close();
        let mut buf = [0u8; 1];
        assert!(matches!(
            port.read(&mut buf, Duration::from_millis(1)).await,
            Err(PortError::Closed)
        ));
        assert!(matches!(port.write(&[0]).await, Err(PortError::Closed)));
    }
}
