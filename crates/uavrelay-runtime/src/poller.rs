//! Periodic input poller
//!
//! Samples an input source (typically receiver channels) at a fixed period
//! and queues the sample on a designated link. Enqueue never blocks: when the
//! queue is full the sample is dropped, the next tick supersedes it anyway.

use std::sync::Arc;
use tokio::time::{self, MissedTickBehavior};
use uavrelay_core::{
    DebugSink, Event, InputSource, PollDiagnostics, PollerConfig, RelayResult, Sample,
};

use crate::link::LinkHandle;

use tracing::{info, trace};

/// Periodic sampler feeding `PollTick` events into one link
pub struct Poller {
    config: PollerConfig,
    link: LinkHandle,
    source: Box<dyn InputSource>,
    sink: Arc<dyn DebugSink>,
    tick: u64,
    last_report: Vec<u32>,
}

impl Poller {
    pub fn new(
        config: PollerConfig,
        link: LinkHandle,
        source: Box<dyn InputSource>,
        sink: Arc<dyn DebugSink>,
    ) -> Self {
        Self {
            config,
            link,
            source,
            sink,
            tick: 0,
            last_report: Vec::new(),
        }
    }

    pub async fn run(&mut self) -> RelayResult<()> {
        info!(
            link = %self.link.id(),
            object = %self.config.object,
            period_ms = self.config.period_ms,
            "poller starting"
        );

        let mut interval = time::interval(self.config.period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            self.tick_once();
        }
    }

    /// Sample once and queue the result; returns whether the sample was queued
    pub fn tick_once(&mut self) -> bool {
        self.tick += 1;
        let sample = self.source.sample();

        if self.config.diagnostic_every > 0 && self.tick % u64::from(self.config.diagnostic_every) == 0 {
            self.report(&sample);
        }

        let queued = self.link.enqueue(Event::PollTick {
            object: self.config.object,
            sample,
        });
        if !queued {
            trace!(link = %self.link.id(), tick = self.tick, "queue full, sample dropped");
        }
        queued
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    fn report(&mut self, sample: &Sample) {
        let threshold = self.config.diagnostic_threshold;
        let moved = sample
            .channels
            .iter()
            .enumerate()
            .map(|(i, value)| match self.last_report.get(i) {
                Some(previous) => value.abs_diff(*previous) > threshold,
                None => true,
            })
            .collect();

        let report = PollDiagnostics {
            tick: self.tick,
            link: self.link.id(),
            channels: sample.channels.to_vec(),
            moved,
            queue_free: self.link.queue_free(),
        };
        self.sink.emit(&report);
        self.last_report = report.channels;
    }
}
