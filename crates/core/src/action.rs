//! Actions requested by block code.

use blocksim_messages::{Message, WirelessMessage};

/// Outputs of [`BlockCode::handle`](crate::BlockCode::handle).
///
/// The world executes these in order, at the virtual time of the input
/// that produced them.
#[derive(Debug)]
pub enum BlockAction {
    /// Send a message on the block's `interface`-th point-to-point port.
    Send { interface: usize, message: Message },

    /// Broadcast on the block's wireless interface.
    Broadcast { message: WirelessMessage },

    /// Fire [`BlockInput::TimerFired`](crate::BlockInput::TimerFired) after
    /// `delay` virtual microseconds.
    SetTimer { delay: u64, id: u64 },
}

impl BlockAction {
    pub fn type_name(&self) -> &'static str {
        match self {
            BlockAction::Send { .. } => "Send",
            BlockAction::Broadcast { .. } => "Broadcast",
            BlockAction::SetTimer { .. } => "SetTimer",
        }
    }
}
