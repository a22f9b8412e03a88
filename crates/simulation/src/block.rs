//! Simulated blocks.

use blocksim_core::{BlockAction, BlockCode, BlockInput};
use blocksim_network::BlockStats;
use blocksim_types::{BlockId, InterfaceId, Position, VirtualTime};
use std::collections::BTreeMap;

/// One block of the modular robot.
///
/// A block owns its behavioral code and statistics. Its interfaces live in
/// the world and are referenced here by id: `p2p[port]` is the global id of
/// the block's `port`-th point-to-point interface.
pub struct BuildingBlock {
    id: BlockId,
    position: Position,
    p2p: Vec<InterfaceId>,
    wireless: Option<InterfaceId>,
    /// Local P2P interface → block on the other end of its link.
    neighbors: BTreeMap<InterfaceId, BlockId>,
    pub stats: BlockStats,
    code: Box<dyn BlockCode>,
}

impl std::fmt::Debug for BuildingBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildingBlock")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("p2p", &self.p2p)
            .field("wireless", &self.wireless)
            .field("neighbors", &self.neighbors)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl BuildingBlock {
    pub(crate) fn new(id: BlockId, position: Position, code: Box<dyn BlockCode>) -> Self {
        Self {
            id,
            position,
            p2p: Vec::new(),
            wireless: None,
            neighbors: BTreeMap::new(),
            stats: BlockStats::default(),
            code,
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Global ids of the block's P2P interfaces, by port.
    pub fn p2p_interfaces(&self) -> &[InterfaceId] {
        &self.p2p
    }

    /// Global id of the block's `port`-th P2P interface.
    pub fn port(&self, port: usize) -> Option<InterfaceId> {
        self.p2p.get(port).copied()
    }

    pub fn wireless_interface(&self) -> Option<InterfaceId> {
        self.wireless
    }

    pub(crate) fn push_p2p(&mut self, interface: InterfaceId) -> usize {
        self.p2p.push(interface);
        self.p2p.len() - 1
    }

    pub(crate) fn set_wireless(&mut self, interface: InterfaceId) {
        self.wireless = Some(interface);
    }

    /// Record that `interface` now links to `neighbor`.
    pub fn add_neighbor(&mut self, interface: InterfaceId, neighbor: BlockId) {
        self.neighbors.insert(interface, neighbor);
    }

    /// Forget the link on `interface`.
    pub fn remove_neighbor(&mut self, interface: InterfaceId) {
        self.neighbors.remove(&interface);
    }

    /// Block linked through `interface`, if any.
    pub fn neighbor(&self, interface: InterfaceId) -> Option<BlockId> {
        self.neighbors.get(&interface).copied()
    }

    /// All linked neighbors, by local interface.
    pub fn neighbors(&self) -> impl Iterator<Item = (InterfaceId, BlockId)> + '_ {
        self.neighbors.iter().map(|(i, b)| (*i, *b))
    }

    pub fn neighbor_count(&self) -> usize {
        self.neighbors.len()
    }

    pub fn code(&self) -> &dyn BlockCode {
        self.code.as_ref()
    }

    pub(crate) fn handle(&mut self, now: VirtualTime, input: BlockInput) -> Vec<BlockAction> {
        self.code.handle(now, input)
    }
}
