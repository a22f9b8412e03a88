//! Simulated events.

use blocksim_messages::{Message, WirelessMessage};
use blocksim_types::{BlockId, InterfaceId, MessageId, VirtualTime};

/// Every kind of work the scheduler can perform.
///
/// Each variant carries its own target and, where a message moves, owns
/// that message. Consuming the event moves the message onward.
#[derive(Debug)]
pub enum EventKind {
    // ═══════════════════════════════════════════════════════════════════════
    // Block lifecycle
    // ═══════════════════════════════════════════════════════════════════════
    /// Start a block's behavioral code.
    CodeStart { block: BlockId },

    /// User tapped a block, optionally on a given face.
    Tap { block: BlockId, face: Option<u8> },

    /// A timer set by block code fired.
    Timer { block: BlockId, id: u64 },

    // ═══════════════════════════════════════════════════════════════════════
    // Topology
    // ═══════════════════════════════════════════════════════════════════════
    /// Link two P2P interfaces, or tear `interface`'s link down when `peer`
    /// is `None`.
    Connect {
        interface: InterfaceId,
        peer: Option<InterfaceId>,
    },

    /// Tear down every P2P link of a block.
    DisconnectBlock { block: BlockId },

    // ═══════════════════════════════════════════════════════════════════════
    // Point-to-point pipeline
    // ═══════════════════════════════════════════════════════════════════════
    /// Append a message to an interface's outgoing queue.
    EnqueueOutgoing {
        interface: InterfaceId,
        message: Message,
    },

    /// Begin transmitting the head of the outgoing queue.
    StartTransmitting { interface: InterfaceId },

    /// The in-flight message has left the interface.
    StopTransmitting { interface: InterfaceId },

    /// Hand a message to the receiving interface's block.
    ReceiveMessage {
        interface: InterfaceId,
        message: Message,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Wireless pipeline
    // ═══════════════════════════════════════════════════════════════════════
    /// Append a message to a wireless interface's outgoing queue.
    WirelessEnqueueOutgoing {
        interface: InterfaceId,
        message: WirelessMessage,
    },

    /// Begin broadcasting the head of the wireless queue.
    WirelessStartTransmitting { interface: InterfaceId },

    /// The broadcast has ended.
    WirelessStopTransmitting { interface: InterfaceId },

    /// A signal reaches a wireless interface.
    WirelessStartReceive {
        interface: InterfaceId,
        message: WirelessMessage,
        /// Received power in dBm.
        power_dbm: f64,
        /// Airtime in virtual microseconds.
        airtime: u64,
    },

    /// The signal identified by `message` has finished arriving.
    WirelessStopReceive {
        interface: InterfaceId,
        message: MessageId,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Control
    // ═══════════════════════════════════════════════════════════════════════
    /// Pause the scheduler.
    Pause,

    /// Stop the scheduler for good.
    Stop,
}

impl EventKind {
    /// Get a human-readable name for this event kind.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::CodeStart { .. } => "CodeStart",
            EventKind::Tap { .. } => "Tap",
            EventKind::Timer { .. } => "Timer",
            EventKind::Connect { .. } => "Connect",
            EventKind::DisconnectBlock { .. } => "DisconnectBlock",
            EventKind::EnqueueOutgoing { .. } => "EnqueueOutgoing",
            EventKind::StartTransmitting { .. } => "StartTransmitting",
            EventKind::StopTransmitting { .. } => "StopTransmitting",
            EventKind::ReceiveMessage { .. } => "ReceiveMessage",
            EventKind::WirelessEnqueueOutgoing { .. } => "WirelessEnqueueOutgoing",
            EventKind::WirelessStartTransmitting { .. } => "WirelessStartTransmitting",
            EventKind::WirelessStopTransmitting { .. } => "WirelessStopTransmitting",
            EventKind::WirelessStartReceive { .. } => "WirelessStartReceive",
            EventKind::WirelessStopReceive { .. } => "WirelessStopReceive",
            EventKind::Pause => "Pause",
            EventKind::Stop => "Stop",
        }
    }

    /// Pause and stop are requests to the scheduler itself, not world work.
    pub fn is_control(&self) -> bool {
        matches!(self, EventKind::Pause | EventKind::Stop)
    }
}

/// An event waiting in the scheduler queue.
#[derive(Debug)]
pub struct Event {
    /// When the event fires.
    pub time: VirtualTime,
    /// Creation order, used to break ties between equal timestamps.
    pub sequence: u64,
    pub kind: EventKind,
}

impl Event {
    pub fn new(time: VirtualTime, sequence: u64, kind: EventKind) -> Self {
        Self {
            time,
            sequence,
            kind,
        }
    }
}
