//! Scripted input source and a diagnostics sink that keeps what it is given

use parking_lot::Mutex;
use std::collections::VecDeque;
use uavrelay_core::{DebugSink, InputSource, PollDiagnostics, Sample};

/// Returns queued samples in order, then repeats the last one
#[derive(Debug, Default)]
pub struct ScriptedInput {
    queued: VecDeque<Sample>,
    last: Sample,
    taken: u64,
}

impl ScriptedInput {
    pub fn new(samples: impl IntoIterator<Item = Sample>) -> Self {
        Self {
            queued: samples.into_iter().collect(),
            last: Sample::default(),
            taken: 0,
        }
    }

    /// The same channel values forever
    pub fn constant(channels: &[u32]) -> Self {
        Self {
            queued: VecDeque::new(),
            last: Sample::new(channels),
            taken: 0,
        }
    }

    /// Channel 0 sweeps through `values`, the rest stay at `rest`
    pub fn sweep(values: impl IntoIterator<Item = u32>, rest: &[u32]) -> Self {
        Self::new(values.into_iter().map(|value| {
            let mut channels = Vec::with_capacity(rest.len() + 1);
            channels.push(value);
            channels.extend_from_slice(rest);
            Sample::new(&channels)
        }))
    }

    pub fn taken(&self) -> u64 {
        self.taken
    }
}

impl InputSource for ScriptedInput {
    fn sample(&mut self) -> Sample {
        self.taken += 1;
        if let Some(next) = self.queued.pop_front() {
            self.last = next;
        }
        self.last.clone()
    }
}

/// Keeps every diagnostic report
#[derive(Debug, Default)]
pub struct RecordingDebugSink {
    reports: Mutex<Vec<PollDiagnostics>>,
}

impl RecordingDebugSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<PollDiagnostics> {
        self.reports.lock().clone()
    }
}

impl DebugSink for RecordingDebugSink {
    fn emit(&self, report: &PollDiagnostics) {
        self.reports.lock().push(report.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeats_last_sample() {
        let mut input = ScriptedInput::sweep([1000, 1500], &[7]);
        assert_eq!(input.sample(), Sample::new(&[1000, 7]));
        assert_eq!(input.sample(), Sample::new(&[1500, 7]));
        assert_eq!(input.sample(), Sample::new(&[1500, 7]));
        assert_eq!(input.taken(), 3);
    }
}
