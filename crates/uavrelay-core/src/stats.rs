//! Per-link diagnostic counters
//!
//! Counters only ever increase and never gate routing decisions. They are
//! atomics so any task may bump them without further locking.

use core::sync::atomic::{AtomicU64, Ordering};
use serde::{Deserialize, Serialize};

/// Running statistics for one link
#[derive(Debug, Default)]
pub struct LinkStats {
    retries: AtomicU64,
    errors: AtomicU64,
    sent: AtomicU64,
    forwarded: AtomicU64,
    forward_dropped: AtomicU64,
    decode_errors: AtomicU64,
    enqueue_dropped: AtomicU64,
}

impl LinkStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts beyond the first for a dispatched operation
    pub fn record_retries(&self, count: u64) {
        if count > 0 {
            self.retries.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Event dropped after exhausting its attempts (or on a disabled port)
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Event dispatched successfully
    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Packet decoded on this link and accepted by the peer's queue
    pub fn record_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Packet decoded on this link but refused by the peer's full queue
    pub fn record_forward_dropped(&self) {
        self.forward_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// This link's queue refused an event
    pub fn record_enqueue_dropped(&self) {
        self.enqueue_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Read-only copy for telemetry
    pub fn snapshot(&self) -> LinkStatsSnapshot {
        LinkStatsSnapshot {
            retries: self.retries.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            forward_dropped: self.forward_dropped.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            enqueue_dropped: self.enqueue_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`LinkStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStatsSnapshot {
    pub retries: u64,
    pub errors: u64,
    pub sent: u64,
    pub forwarded: u64,
    pub forward_dropped: u64,
    pub decode_errors: u64,
    pub enqueue_dropped: u64,
}
