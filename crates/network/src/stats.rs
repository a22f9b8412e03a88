//! Statistics sinks.

use serde::Serialize;

/// Per-block counters, owned by the block and updated by its interfaces.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BlockStats {
    /// Messages currently waiting in the block's P2P outgoing queues.
    pub outgoing_queue_size: u64,
    /// Highest value `outgoing_queue_size` reached.
    pub max_outgoing_queue_size: u64,
    pub sent_messages: u64,
    pub received_messages: u64,
    pub wireless_sent: u64,
    pub wireless_received: u64,
}

impl BlockStats {
    pub fn inc_outgoing_message_queue_size(&mut self) {
        self.outgoing_queue_size += 1;
        self.max_outgoing_queue_size = self.max_outgoing_queue_size.max(self.outgoing_queue_size);
    }

    pub fn dec_outgoing_message_queue_size(&mut self) {
        self.outgoing_queue_size = self.outgoing_queue_size.saturating_sub(1);
    }

    pub fn inc_sent_message_count(&mut self) {
        self.sent_messages += 1;
    }

    pub fn inc_received_message_count(&mut self) {
        self.received_messages += 1;
    }

    pub fn inc_wireless_sent_count(&mut self) {
        self.wireless_sent += 1;
    }

    pub fn inc_wireless_received_count(&mut self) {
        self.wireless_received += 1;
    }
}

/// World-wide counters.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkStats {
    /// P2P transmissions started.
    pub messages_sent: u64,
    /// P2P messages handed to block code.
    pub messages_delivered: u64,
    /// Wireless transmissions started.
    pub wireless_sent: u64,
    /// Signals that reached an interface above its sensitivity.
    pub wireless_receptions: u64,
    /// Signals too weak to even be sensed.
    pub wireless_below_sensitivity: u64,
    /// Receptions lost to a collision.
    pub wireless_collisions: u64,
    /// Receptions sensed but too weak to decode.
    pub wireless_below_threshold: u64,
    /// Receptions decoded but addressed to another block.
    pub wireless_not_addressed: u64,
    /// Wireless messages handed to block code.
    pub wireless_delivered: u64,
}

impl NetworkStats {
    /// Wireless receptions that ended without delivery.
    pub fn wireless_dropped(&self) -> u64 {
        self.wireless_collisions + self.wireless_below_threshold + self.wireless_not_addressed
    }

    /// Fraction of sensed wireless receptions that were delivered.
    pub fn wireless_delivery_rate(&self) -> f64 {
        let total = self.wireless_delivered + self.wireless_dropped();
        if total == 0 {
            1.0
        } else {
            self.wireless_delivered as f64 / total as f64
        }
    }
}
