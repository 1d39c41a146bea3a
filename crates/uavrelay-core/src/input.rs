//! Poller collaborators: input sources and the diagnostic side channel

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{LinkId, Sample};

/// Something the poller can sample once per period (e.g. receiver channels)
pub trait InputSource: Send {
    fn sample(&mut self) -> Sample;
}

/// Periodic diagnostic report emitted by the poller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollDiagnostics {
    /// Tick counter at the time of the report
    pub tick: u64,
    /// Link the samples are queued on
    pub link: LinkId,
    /// Latest sampled channel values
    pub channels: Vec<u32>,
    /// Per channel: moved by more than the configured threshold since the last report
    pub moved: Vec<bool>,
    /// Free slots in the link's event queue
    pub queue_free: usize,
}

impl PollDiagnostics {
    /// Render as `ch=value` pairs, using `---` for channels that did not move
    pub fn summary(&self) -> String {
        self.channels
            .iter()
            .zip(self.moved.iter())
            .map(|(value, moved)| {
                if *moved {
                    format!("{:x}", value)
                } else {
                    "---".to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Receives the poller's diagnostic reports; not part of the routing contract
pub trait DebugSink: Send + Sync {
    fn emit(&self, report: &PollDiagnostics);
}

/// Default sink: a debug-level tracing event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDebugSink;

impl DebugSink for TracingDebugSink {
    fn emit(&self, report: &PollDiagnostics) {
        debug!(
            link = %report.link,
            tick = report.tick,
            queue_free = report.queue_free,
            "rcvr: {}",
            report.summary()
        );
    }
}
