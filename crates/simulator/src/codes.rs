//! Demo block codes.

use blocksim_core::{BlockAction, BlockCode, BlockInput};
use blocksim_messages::{Message, Payload, WirelessMessage};
use blocksim_types::{BlockId, VirtualTime};
use std::any::Any;
use std::collections::BTreeMap;
use tracing::debug;

/// Type tag of flood messages.
pub const FLOOD_TAG: u32 = 1;

/// Type tag of beacons.
pub const BEACON_TAG: u32 = 2;

/// When the flood origin starts sending.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    Start,
    Tap,
}

/// Floods a hop counter over point-to-point links.
///
/// The origin sends hop 0 on every connected port. Every other block
/// records the first copy it gets and forwards it, one hop further, on every
/// port but the one it came in on. Later copies are ignored.
#[derive(Debug)]
pub struct RelayCode {
    ports: Vec<usize>,
    origin: Option<Trigger>,
    message_size: u32,
    reached: Option<(VirtualTime, i64)>,
    duplicates: u32,
}

impl RelayCode {
    /// `ports` are the port numbers that have a neighbour.
    pub fn new(ports: Vec<usize>, message_size: u32) -> Self {
        Self {
            ports,
            origin: None,
            message_size,
            reached: None,
            duplicates: 0,
        }
    }

    pub fn origin(mut self, trigger: Trigger) -> Self {
        self.origin = Some(trigger);
        self
    }

    /// When and at what hop count the flood first arrived.
    pub fn reached(&self) -> Option<(VirtualTime, i64)> {
        self.reached
    }

    /// Copies received after the first.
    pub fn duplicates(&self) -> u32 {
        self.duplicates
    }

    fn flood(&self, hops: i64, except: Option<usize>) -> Vec<BlockAction> {
        self.ports
            .iter()
            .filter(|port| Some(**port) != except)
            .map(|port| BlockAction::Send {
                interface: *port,
                message: Message::new(FLOOD_TAG, Payload::Int(hops)).with_size(self.message_size),
            })
            .collect()
    }
}

impl BlockCode for RelayCode {
    fn handle(&mut self, now: VirtualTime, input: BlockInput) -> Vec<BlockAction> {
        match input {
            BlockInput::Start if self.origin == Some(Trigger::Start) => {
                self.reached = Some((now, 0));
                self.flood(0, None)
            }
            BlockInput::Tap { .. } if self.origin == Some(Trigger::Tap) => {
                if self.reached.is_some() {
                    return vec![];
                }
                self.reached = Some((now, 0));
                self.flood(0, None)
            }
            BlockInput::MessageReceived { interface, message } => {
                if message.type_tag() != FLOOD_TAG {
                    return vec![];
                }
                if self.reached.is_some() {
                    self.duplicates += 1;
                    return vec![];
                }
                let hops = message.payload().as_int().unwrap_or(0) + 1;
                debug!(%now, hops, port = interface, "flood reached block");
                self.reached = Some((now, hops));
                self.flood(hops, Some(interface))
            }
            _ => vec![],
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// What a beacon listener heard from one sender.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Heard {
    pub count: u32,
    pub last_power_dbm: f64,
}

/// Broadcasts `count` beacons carrying its own id, `period` apart, after
/// an initial `offset`. Counts beacons from others.
#[derive(Debug)]
pub struct BeaconCode {
    id: BlockId,
    offset: u64,
    period: u64,
    remaining: u32,
    message_size: u32,
    sent: u32,
    heard: BTreeMap<BlockId, Heard>,
}

impl BeaconCode {
    pub fn new(id: BlockId, offset: u64, period: u64, count: u32, message_size: u32) -> Self {
        Self {
            id,
            offset,
            period,
            remaining: count,
            message_size,
            sent: 0,
            heard: BTreeMap::new(),
        }
    }

    pub fn sent(&self) -> u32 {
        self.sent
    }

    pub fn heard(&self) -> &BTreeMap<BlockId, Heard> {
        &self.heard
    }

    /// Beacons heard from all senders together.
    pub fn heard_total(&self) -> u32 {
        self.heard.values().map(|h| h.count).sum()
    }
}

impl BlockCode for BeaconCode {
    fn handle(&mut self, _now: VirtualTime, input: BlockInput) -> Vec<BlockAction> {
        match input {
            BlockInput::Start if self.remaining > 0 => vec![BlockAction::SetTimer {
                delay: self.offset,
                id: 0,
            }],
            BlockInput::TimerFired { .. } if self.remaining > 0 => {
                self.remaining -= 1;
                self.sent += 1;
                let beacon =
                    WirelessMessage::broadcast(BEACON_TAG, Payload::Int(i64::from(self.id.0)))
                        .with_size(self.message_size);
                let mut actions = vec![BlockAction::Broadcast { message: beacon }];
                if self.remaining > 0 {
                    actions.push(BlockAction::SetTimer {
                        delay: self.period,
                        id: 0,
                    });
                }
                actions
            }
            BlockInput::WirelessMessageReceived { message, power_dbm } => {
                if message.type_tag() != BEACON_TAG {
                    return vec![];
                }
                let sender = message.payload().as_int().and_then(|v| u32::try_from(v).ok());
                if let Some(sender) = sender {
                    let heard = self.heard.entry(BlockId(sender)).or_default();
                    heard.count += 1;
                    heard.last_power_dbm = power_dbm;
                }
                vec![]
            }
            _ => vec![],
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flood_hops(actions: &[BlockAction]) -> Vec<(usize, i64)> {
        actions
            .iter()
            .map(|action| match action {
                BlockAction::Send { interface, message } => {
                    (*interface, message.payload().as_int().unwrap())
                }
                other => panic!("unexpected action {}", other.type_name()),
            })
            .collect()
    }

    #[test]
    fn test_origin_floods_on_start() {
        let mut code = RelayCode::new(vec![0, 1], 4).origin(Trigger::Start);
        let actions = code.handle(VirtualTime::ZERO, BlockInput::Start);
        assert_eq!(flood_hops(&actions), vec![(0, 0), (1, 0)]);
        assert_eq!(code.reached(), Some((VirtualTime::ZERO, 0)));
    }

    #[test]
    fn test_tap_origin_waits_for_tap() {
        let mut code = RelayCode::new(vec![1], 4).origin(Trigger::Tap);
        assert!(code.handle(VirtualTime::ZERO, BlockInput::Start).is_empty());

        let at = VirtualTime::from_micros(50);
        let actions = code.handle(at, BlockInput::Tap { face: None });
        assert_eq!(flood_hops(&actions), vec![(1, 0)]);
        // A second tap does not restart the flood.
        assert!(code.handle(at, BlockInput::Tap { face: None }).is_empty());
    }

    #[test]
    fn test_relay_forwards_once() {
        let mut code = RelayCode::new(vec![0, 1], 4);
        let at = VirtualTime::from_micros(32);
        let input = BlockInput::MessageReceived {
            interface: 0,
            message: Message::new(FLOOD_TAG, Payload::Int(2)),
        };
        let actions = code.handle(at, input);
        assert_eq!(flood_hops(&actions), vec![(1, 3)]);
        assert_eq!(code.reached(), Some((at, 3)));

        let again = BlockInput::MessageReceived {
            interface: 1,
            message: Message::new(FLOOD_TAG, Payload::Int(0)),
        };
        assert!(code.handle(at, again).is_empty());
        assert_eq!(code.duplicates(), 1);
    }

    #[test]
    fn test_beacon_schedule() {
        let mut code = BeaconCode::new(BlockId(3), 7, 100, 2, 4);
        let start = code.handle(VirtualTime::ZERO, BlockInput::Start);
        assert!(matches!(start.as_slice(), [BlockAction::SetTimer { delay: 7, .. }]));

        let first = code.handle(VirtualTime::from_micros(7), BlockInput::TimerFired { id: 0 });
        assert_eq!(first.len(), 2);
        match &first[0] {
            BlockAction::Broadcast { message } => {
                assert_eq!(message.type_tag(), BEACON_TAG);
                assert_eq!(message.payload().as_int(), Some(3));
                assert_eq!(message.destination(), None);
            }
            other => panic!("unexpected action {}", other.type_name()),
        }
        assert!(matches!(first[1], BlockAction::SetTimer { delay: 100, .. }));

        // Last beacon does not re-arm.
        let last = code.handle(VirtualTime::from_micros(107), BlockInput::TimerFired { id: 0 });
        assert_eq!(last.len(), 1);
        assert_eq!(code.sent(), 2);
        assert!(code
            .handle(VirtualTime::from_micros(207), BlockInput::TimerFired { id: 0 })
            .is_empty());
    }

    #[test]
    fn test_beacon_counts_senders() {
        let mut code = BeaconCode::new(BlockId(0), 0, 100, 0, 4);
        for (sender, power) in [(1, -40.0), (2, -44.0), (1, -41.0)] {
            let input = BlockInput::WirelessMessageReceived {
                message: WirelessMessage::broadcast(BEACON_TAG, Payload::Int(sender)),
                power_dbm: power,
            };
            assert!(code.handle(VirtualTime::ZERO, input).is_empty());
        }
        assert_eq!(code.heard_total(), 3);
        assert_eq!(
            code.heard().get(&BlockId(1)),
            Some(&Heard {
                count: 2,
                last_power_dbm: -41.0
            })
        );
    }
}
