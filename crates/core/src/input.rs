//! Inputs delivered to block code.

use blocksim_messages::{Message, WirelessMessage};

/// Everything a block's behavioral code can be told.
#[derive(Debug)]
pub enum BlockInput {
    /// The simulation started; the block may begin sending.
    Start,

    /// A point-to-point message arrived on the block's `interface`-th port.
    MessageReceived { interface: usize, message: Message },

    /// A wireless message was decoded.
    WirelessMessageReceived {
        message: WirelessMessage,
        /// Received power in dBm.
        power_dbm: f64,
    },

    /// The user tapped the block.
    Tap { face: Option<u8> },

    /// A timer set with [`BlockAction::SetTimer`](crate::BlockAction::SetTimer) fired.
    TimerFired { id: u64 },
}

impl BlockInput {
    pub fn type_name(&self) -> &'static str {
        match self {
            BlockInput::Start => "Start",
            BlockInput::MessageReceived { .. } => "MessageReceived",
            BlockInput::WirelessMessageReceived { .. } => "WirelessMessageReceived",
            BlockInput::Tap { .. } => "Tap",
            BlockInput::TimerFired { .. } => "TimerFired",
        }
    }
}
