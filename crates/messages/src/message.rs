//! Point-to-point message.

use crate::counter::InstanceCounter;
use crate::payload::Payload;
use crate::DEFAULT_MESSAGE_SIZE;
use blocksim_types::{InterfaceId, MessageId};

static MESSAGES: InstanceCounter = InstanceCounter::new();

/// A message sent over a point-to-point link.
///
/// `source` and `destination` are bound by the sending interface when the
/// transmission starts; before that they are `None`.
///
/// Cloning produces an independent instance with a fresh id. Type tag,
/// size, payload and current bindings are copied; later rebinding of one
/// copy never affects the other.
#[derive(Debug)]
pub struct Message {
    id: MessageId,
    type_tag: u32,
    size: u32,
    payload: Payload,
    /// Interface that transmitted this message.
    pub source: Option<InterfaceId>,
    /// Interface this message is being delivered to.
    pub destination: Option<InterfaceId>,
}

impl Message {
    /// Create a message with the default size.
    pub fn new(type_tag: u32, payload: Payload) -> Self {
        Self {
            id: MESSAGES.mint(),
            type_tag,
            size: DEFAULT_MESSAGE_SIZE,
            payload,
            source: None,
            destination: None,
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

    /// Virtual size in bytes. Drives transmission duration.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Take the payload out of the message.
    pub fn into_payload(mut self) -> Payload {
        std::mem::take(&mut self.payload)
    }

    /// Human-readable name for traces.
    pub fn name(&self) -> &'static str {
        "generic message"
    }

    /// Number of `Message` instances currently alive in the process.
    pub fn live_count() -> u64 {
        MESSAGES.live()
    }
}

impl Clone for Message {
    fn clone(&self) -> Self {
        Self {
            id: MESSAGES.mint(),
            type_tag: self.type_tag,
            size: self.size,
            payload: self.payload.clone(),
            source: self.source,
            destination: self.destination,
        }
    }
}

impl Drop for Message {
    fn drop(&mut self) {
        MESSAGES.release(self.id);
    }
}
