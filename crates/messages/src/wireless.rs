//! Broadcast message.

use crate::counter::InstanceCounter;
use crate::payload::Payload;
use crate::DEFAULT_MESSAGE_SIZE;
use blocksim_types::{BlockId, InterfaceId, MessageId};

static WIRELESS_MESSAGES: InstanceCounter = InstanceCounter::new();

/// A message sent on the shared wireless medium.
///
/// Ids come from a counter separate from [`Message`](crate::Message), so
/// the two kinds are numbered independently.
///
/// Every receiver in range gets its own clone; `destination` filters which
/// of them hand the message to block code (`None` means everyone).
#[derive(Debug)]
pub struct WirelessMessage {
    id: MessageId,
    type_tag: u32,
    size: u32,
    payload: Payload,
    destination: Option<BlockId>,
    /// Wireless interface that transmitted this message.
    pub source: Option<InterfaceId>,
}

impl WirelessMessage {
    /// Create a message addressed to every block in range.
    pub fn broadcast(type_tag: u32, payload: Payload) -> Self {
        Self::build(type_tag, payload, None)
    }

    /// Create a message addressed to a single block.
    pub fn to_block(type_tag: u32, payload: Payload, destination: BlockId) -> Self {
        Self::build(type_tag, payload, Some(destination))
    }

    fn build(type_tag: u32, payload: Payload, destination: Option<BlockId>) -> Self {
        Self {
            id: WIRELESS_MESSAGES.mint(),
            type_tag,
            size: DEFAULT_MESSAGE_SIZE,
            payload,
            destination,
            source: None,
        }
    }

    /// Override the virtual size, in bytes.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn type_tag(&self) -> u32 {
        self.type_tag
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn destination(&self) -> Option<BlockId> {
        self.destination
    }

    /// Whether `block` should hand this message to its code.
    pub fn is_addressed_to(&self, block: BlockId) -> bool {
        self.destination.map_or(true, |d| d == block)
    }

    pub fn name(&self) -> &'static str {
        "generic wireless message"
    }

    /// Number of `WirelessMessage` instances currently alive in the process.
    pub fn live_count() -> u64 {
        WIRELESS_MESSAGES.live()
    }
}

impl Clone for WirelessMessage {
    fn clone(&self) -> Self {
        Self {
            id: WIRELESS_MESSAGES.mint(),
            type_tag: self.type_tag,
            size: self.size,
            payload: self.payload.clone(),
            destination: self.destination,
            source: self.source,
        }
    }
}

impl Drop for WirelessMessage {
    fn drop(&mut self) {
        WIRELESS_MESSAGES.release(self.id);
    }
}
