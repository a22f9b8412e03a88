//! Process-wide id and live-instance counters.

use blocksim_types::MessageId;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::error;

/// Mints message ids and tracks how many instances are alive.
pub(crate) struct InstanceCounter {
    next_id: AtomicU64,
    live: AtomicU64,
}

impl InstanceCounter {
    pub(crate) const fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            live: AtomicU64::new(0),
        }
    }

    /// Allocate a fresh id for a new instance.
    pub(crate) fn mint(&self) -> MessageId {
        self.live.fetch_add(1, Ordering::Relaxed);
        MessageId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Record that an instance was dropped.
    pub(crate) fn release(&self, id: MessageId) {
        let released = self
            .live
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
        if released.is_err() {
            error!(%id, "message released with a live count of zero");
        }
    }

    pub(crate) fn live(&self) -> u64 {
        self.live.load(Ordering::Relaxed)
    }
}
