//! Test scheduler that records instead of running.

use blocksim_core::{EventKind, EventScheduler};
use blocksim_types::VirtualTime;

#[derive(Debug, Default)]
pub(crate) struct RecordingScheduler {
    pub now: VirtualTime,
    pub events: Vec<(VirtualTime, EventKind)>,
}

impl RecordingScheduler {
    pub fn at(micros: u64) -> Self {
        Self {
            now: VirtualTime::from_micros(micros),
            events: Vec::new(),
        }
    }

    /// Names and times of the recorded events, in scheduling order.
    pub fn names(&self) -> Vec<(u64, &'static str)> {
        self.events
            .iter()
            .map(|(t, k)| (t.as_micros(), k.name()))
            .collect()
    }

    pub fn take(&mut self) -> Vec<(VirtualTime, EventKind)> {
        std::mem::take(&mut self.events)
    }
}

impl EventScheduler for RecordingScheduler {
    fn now(&self) -> VirtualTime {
        self.now
    }

    fn schedule(&mut self, at: VirtualTime, kind: EventKind) {
        assert!(at >= self.now, "scheduled {} in the past", kind.name());
        self.events.push((at, kind));
    }
}
