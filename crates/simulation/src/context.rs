//! Scheduling from inside the scheduler thread.

use crate::event_queue::EventQueue;
use blocksim_core::{Event, EventKind, EventScheduler};
use blocksim_types::VirtualTime;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::error;

/// Handed to consume behavior while an event is processed.
///
/// Schedules straight into the queue without locking. The sequence counter
/// is shared with the injection path so that creation order is global.
pub struct SimContext<'a> {
    now: VirtualTime,
    queue: &'a mut EventQueue,
    sequence: &'a AtomicU64,
}

impl<'a> SimContext<'a> {
    pub fn new(now: VirtualTime, queue: &'a mut EventQueue, sequence: &'a AtomicU64) -> Self {
        Self {
            now,
            queue,
            sequence,
        }
    }
}

impl EventScheduler for SimContext<'_> {
    fn now(&self) -> VirtualTime {
        self.now
    }

    fn schedule(&mut self, at: VirtualTime, kind: EventKind) {
        if at < self.now {
            error!(
                kind = kind.name(),
                at = %at,
                now = %self.now,
                "event scheduled in the past"
            );
            panic!("{} scheduled at {} before now ({})", kind.name(), at, self.now);
        }
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.queue.push(Event::new(at, sequence, kind));
    }
}
