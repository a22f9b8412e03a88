//! The simulated world: blocks, interfaces and event dispatch.

use crate::block::BuildingBlock;
use crate::error::WorldError;
use blocksim_core::{BlockAction, BlockCode, BlockInput, EventKind, EventScheduler};
use blocksim_messages::WirelessMessage;
use blocksim_network::{
    BlockStats, NetworkConfig, NetworkStats, P2PNetworkInterface, Rate, ReceptionOutcome,
    WirelessConfig, WirelessNetworkInterface,
};
use blocksim_types::{BlockId, InterfaceId, Position, VirtualTime};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use tracing::{debug, error, info, trace, warn};

/// Block registry plus every network interface.
///
/// Blocks are kept in ascending id order, which fixes the order of wireless
/// fan-out. Interfaces are arenas indexed by [`InterfaceId`]; each kind has
/// its own id space.
///
/// Once the scheduler starts, the world lives on the scheduler thread and
/// is only touched through [`consume`](World::consume).
pub struct World {
    blocks: BTreeMap<BlockId, BuildingBlock>,
    p2p: Vec<P2PNetworkInterface>,
    wireless: Vec<WirelessNetworkInterface>,
    network_config: NetworkConfig,
    wireless_config: WirelessConfig,
    stats: NetworkStats,
    /// Radio randomness (shadowing).
    rng: ChaCha8Rng,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("blocks", &self.blocks.len())
            .field("p2p", &self.p2p.len())
            .field("wireless", &self.wireless.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl World {
    pub fn new(network_config: NetworkConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(network_config.seed);
        Self {
            blocks: BTreeMap::new(),
            p2p: Vec::new(),
            wireless: Vec::new(),
            network_config,
            wireless_config: WirelessConfig::default(),
            stats: NetworkStats::default(),
            rng,
        }
    }

    /// Radio parameters given to wireless interfaces added without their own.
    pub fn with_wireless_config(mut self, config: WirelessConfig) -> Self {
        self.wireless_config = config;
        self
    }

    // ─── Construction ───

    pub fn add_block(
        &mut self,
        id: BlockId,
        position: Position,
        code: Box<dyn BlockCode>,
    ) -> Result<(), WorldError> {
        if self.blocks.contains_key(&id) {
            return Err(WorldError::DuplicateBlock(id));
        }
        debug!(block = %id, %position, "add block");
        self.blocks.insert(id, BuildingBlock::new(id, position, code));
        Ok(())
    }

    /// Give `block` a new P2P interface at the default data rate.
    ///
    /// The interface becomes the block's next port.
    pub fn add_p2p_interface(&mut self, block: BlockId) -> Result<InterfaceId, WorldError> {
        let rate = Rate::fixed(self.network_config.default_data_rate)?;
        let id = InterfaceId(self.p2p.len() as u32);
        let host = self.block_mut(block)?;
        let port = host.push_p2p(id);
        self.p2p.push(P2PNetworkInterface::new(id, port, block, rate));
        Ok(id)
    }

    /// Give `block` a wireless interface, replacing any previous one.
    ///
    /// Uses the world's wireless configuration unless `config` is given.
    pub fn add_wireless_interface(
        &mut self,
        block: BlockId,
        config: Option<WirelessConfig>,
    ) -> Result<InterfaceId, WorldError> {
        let rate = Rate::fixed(self.network_config.default_data_rate)?;
        let config = config.unwrap_or_else(|| self.wireless_config.clone());
        let id = InterfaceId(self.wireless.len() as u32);
        self.block_mut(block)?.set_wireless(id);
        self.wireless
            .push(WirelessNetworkInterface::new(id, block, rate, config));
        Ok(id)
    }

    pub fn set_data_rate(&mut self, interface: InterfaceId, rate: Rate) -> Result<(), WorldError> {
        self.p2p
            .get_mut(interface.index())
            .ok_or(WorldError::InterfaceNotFound(interface))?
            .set_data_rate(rate);
        Ok(())
    }

    pub fn set_wireless_data_rate(
        &mut self,
        interface: InterfaceId,
        rate: Rate,
    ) -> Result<(), WorldError> {
        self.wireless
            .get_mut(interface.index())
            .ok_or(WorldError::InterfaceNotFound(interface))?
            .set_data_rate(rate);
        Ok(())
    }

    // ─── Topology ───

    /// Link `interface` to `peer`, or unlink it when `peer` is `None`.
    ///
    /// Links are symmetric. Any existing link on either end is torn down
    /// first, and neighbor bookkeeping on all affected blocks is updated.
    /// Connecting an interface to its current peer does nothing.
    pub fn connect(
        &mut self,
        interface: InterfaceId,
        peer: Option<InterfaceId>,
    ) -> Result<(), WorldError> {
        self.p2p_ref(interface)?;
        if let Some(peer) = peer {
            self.p2p_ref(peer)?;
            if peer == interface {
                return Err(WorldError::SelfConnection(interface));
            }
        }
        if self.p2p[interface.index()].connected() == peer {
            return Ok(());
        }

        self.unlink(interface);
        if let Some(peer) = peer {
            self.unlink(peer);

            let a = &mut self.p2p[interface.index()];
            a.set_connected(Some(peer));
            let a_host = a.host();
            let b = &mut self.p2p[peer.index()];
            b.set_connected(Some(interface));
            let b_host = b.host();

            if let Some(block) = self.blocks.get_mut(&a_host) {
                block.add_neighbor(interface, b_host);
            }
            if let Some(block) = self.blocks.get_mut(&b_host) {
                block.add_neighbor(peer, a_host);
            }
            debug!(%interface, %peer, "connect");
        }
        Ok(())
    }

    fn unlink(&mut self, interface: InterfaceId) {
        let iface = &mut self.p2p[interface.index()];
        let Some(old) = iface.connected() else {
            return;
        };
        iface.set_connected(None);
        let host = iface.host();

        let other = &mut self.p2p[old.index()];
        other.set_connected(None);
        let other_host = other.host();

        if let Some(block) = self.blocks.get_mut(&host) {
            block.remove_neighbor(interface);
        }
        if let Some(block) = self.blocks.get_mut(&other_host) {
            block.remove_neighbor(old);
        }
        debug!(%interface, peer = %old, "disconnect");
    }

    /// Tear down every P2P link of `block`.
    pub fn disconnect_block(&mut self, block: BlockId) -> Result<(), WorldError> {
        let interfaces = self.block(block)?.p2p_interfaces().to_vec();
        for interface in interfaces {
            self.connect(interface, None)?;
        }
        Ok(())
    }

    /// Schedule a tap on `block` at `date`.
    pub fn tap_block(
        &self,
        sched: &mut dyn EventScheduler,
        date: VirtualTime,
        block: BlockId,
        face: Option<u8>,
    ) -> Result<(), WorldError> {
        self.block(block)?;
        sched.schedule(date, EventKind::Tap { block, face });
        Ok(())
    }

    // ─── Queries ───

    pub fn block(&self, id: BlockId) -> Result<&BuildingBlock, WorldError> {
        self.blocks.get(&id).ok_or(WorldError::BlockNotFound(id))
    }

    pub fn block_mut(&mut self, id: BlockId) -> Result<&mut BuildingBlock, WorldError> {
        self.blocks.get_mut(&id).ok_or(WorldError::BlockNotFound(id))
    }

    /// All blocks, in ascending id order.
    pub fn blocks(&self) -> impl Iterator<Item = &BuildingBlock> {
        self.blocks.values()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Concrete code of `block`, for inspection.
    pub fn block_code<T: BlockCode>(&self, block: BlockId) -> Result<&T, WorldError> {
        self.block(block)?
            .code()
            .as_any()
            .downcast_ref::<T>()
            .ok_or(WorldError::BlockCodeMismatch(block))
    }

    /// Global id of `block`'s `port`-th P2P interface.
    pub fn port(&self, block: BlockId, port: usize) -> Result<InterfaceId, WorldError> {
        self.block(block)?
            .port(port)
            .ok_or(WorldError::NoSuchPort { block, port })
    }

    pub fn p2p_interface(&self, id: InterfaceId) -> Result<&P2PNetworkInterface, WorldError> {
        self.p2p_ref(id)
    }

    pub fn wireless_interface(
        &self,
        id: InterfaceId,
    ) -> Result<&WirelessNetworkInterface, WorldError> {
        self.wireless
            .get(id.index())
            .ok_or(WorldError::InterfaceNotFound(id))
    }

    pub fn p2p_interfaces(&self) -> &[P2PNetworkInterface] {
        &self.p2p
    }

    pub fn network_stats(&self) -> &NetworkStats {
        &self.stats
    }

    fn p2p_ref(&self, id: InterfaceId) -> Result<&P2PNetworkInterface, WorldError> {
        self.p2p
            .get(id.index())
            .ok_or(WorldError::InterfaceNotFound(id))
    }

    // ─── Event dispatch ───

    /// Perform the work of one world event.
    ///
    /// Runs on the scheduler thread. Control events are the scheduler's
    /// business and are ignored here.
    ///
    /// # Panics
    ///
    /// Panics when an event references a block or interface that does not
    /// exist, or breaks a pipeline invariant.
    pub fn consume(&mut self, kind: EventKind, ctx: &mut dyn EventScheduler) {
        trace!(kind = kind.name(), now = %ctx.now(), "consume");
        match kind {
            EventKind::CodeStart { block } => self.run_code(block, BlockInput::Start, ctx),
            EventKind::Tap { block, face } => self.run_code(block, BlockInput::Tap { face }, ctx),
            EventKind::Timer { block, id } => {
                self.run_code(block, BlockInput::TimerFired { id }, ctx)
            }

            EventKind::Connect { interface, peer } => {
                fatal_on_err(self.connect(interface, peer));
                self.p2p[interface.index()].resume(ctx);
                if let Some(peer) = peer {
                    self.p2p[peer.index()].resume(ctx);
                }
            }
            EventKind::DisconnectBlock { block } => {
                info!(%block, "disconnect block");
                fatal_on_err(self.disconnect_block(block));
            }

            EventKind::EnqueueOutgoing { interface, message } => {
                let (iface, stats, _) = self.p2p_parts(interface);
                iface.add_to_outgoing_buffer(message, stats, ctx);
            }
            EventKind::StartTransmitting { interface } => {
                let (iface, stats, net) = self.p2p_parts(interface);
                iface.start_transmitting(stats, net, ctx);
            }
            EventKind::StopTransmitting { interface } => {
                let (iface, stats, net) = self.p2p_parts(interface);
                iface.stop_transmitting(stats, net, ctx);
            }
            EventKind::ReceiveMessage { interface, message } => {
                let (iface, stats, net) = self.p2p_parts(interface);
                let (host, port) = (iface.host(), iface.local_id());
                stats.inc_received_message_count();
                net.messages_delivered += 1;
                debug!(block = %host, port, message = %message.id(), "message received");
                self.run_code(
                    host,
                    BlockInput::MessageReceived {
                        interface: port,
                        message,
                    },
                    ctx,
                );
            }

            EventKind::WirelessEnqueueOutgoing { interface, message } => {
                let (iface, _, _) = self.wireless_parts(interface);
                iface.add_to_outgoing_buffer(message, ctx);
            }
            EventKind::WirelessStartTransmitting { interface } => {
                let (iface, stats, net) = self.wireless_parts(interface);
                let (message, airtime) = iface.start_transmitting(stats, net, ctx);
                self.broadcast_wireless_message(ctx, &message, airtime);
            }
            EventKind::WirelessStopTransmitting { interface } => {
                let (iface, stats, net) = self.wireless_parts(interface);
                if let Some((message, airtime)) = iface.stop_transmitting(stats, net, ctx) {
                    self.broadcast_wireless_message(ctx, &message, airtime);
                }
            }
            EventKind::WirelessStartReceive {
                interface,
                message,
                power_dbm,
                airtime,
            } => {
                let (iface, _, net) = self.wireless_parts(interface);
                iface.start_receive(message, power_dbm, airtime, net, ctx);
            }
            EventKind::WirelessStopReceive { interface, message } => {
                let (iface, stats, net) = self.wireless_parts(interface);
                let host = iface.host();
                match iface.stop_receive(message, stats, net) {
                    ReceptionOutcome::Delivered { message, power_dbm } => self.run_code(
                        host,
                        BlockInput::WirelessMessageReceived { message, power_dbm },
                        ctx,
                    ),
                    ReceptionOutcome::Unknown => {
                        warn!(%interface, %message, "stop receive for an unknown reception");
                    }
                    _ => {}
                }
            }

            EventKind::Pause | EventKind::Stop => {}
        }
    }

    /// Fan a transmitted message out to every other block's radio.
    ///
    /// Each receiver gets its own clone, scheduled to start arriving now
    /// with the power the propagation model gives for its distance.
    /// Receivers are visited in ascending block-id order.
    pub fn broadcast_wireless_message(
        &mut self,
        ctx: &mut dyn EventScheduler,
        message: &WirelessMessage,
        airtime: u64,
    ) {
        let Some(source) = message.source else {
            warn!(message = %message.id(), "broadcast of an unbound wireless message");
            return;
        };
        let Some(sender) = self.wireless.get(source.index()) else {
            error!(interface = %source, "broadcast from an unknown wireless interface");
            panic!("broadcast from unknown wireless interface {}", source);
        };
        let sender_host = sender.host();
        let sender_config = sender.config().clone();
        let Some(origin) = self.blocks.get(&sender_host).map(|b| b.position()) else {
            error!(block = %sender_host, "broadcast from an unknown block");
            panic!("broadcast from unknown block {}", sender_host);
        };

        let mut targets = Vec::new();
        for (id, block) in &self.blocks {
            if *id == sender_host {
                continue;
            }
            let Some(interface) = block.wireless_interface() else {
                continue;
            };
            let Some(receiver) = self.wireless.get(interface.index()) else {
                continue;
            };
            let distance = origin.distance(&block.position());
            let power_dbm =
                sender_config.received_power(receiver.config(), distance, &mut self.rng);
            targets.push((interface, power_dbm));
        }

        let now = ctx.now();
        trace!(
            message = %message.id(),
            from = %sender_host,
            receivers = targets.len(),
            "wireless fan-out"
        );
        for (interface, power_dbm) in targets {
            ctx.schedule(
                now,
                EventKind::WirelessStartReceive {
                    interface,
                    message: message.clone(),
                    power_dbm,
                    airtime,
                },
            );
        }
    }

    /// Feed `input` to `block`'s code and carry out the returned actions.
    fn run_code(&mut self, block: BlockId, input: BlockInput, ctx: &mut dyn EventScheduler) {
        let now = ctx.now();
        let Some(host) = self.blocks.get_mut(&block) else {
            error!(%block, input = input.type_name(), "input for an unknown block");
            panic!("input for unknown block {}", block);
        };
        let actions = host.handle(now, input);

        for action in actions {
            match action {
                BlockAction::Send { interface, message } => {
                    let Some(id) = self.blocks.get(&block).and_then(|b| b.port(interface)) else {
                        warn!(%block, port = interface, "send on a port the block does not have");
                        continue;
                    };
                    self.p2p[id.index()].send(message, ctx);
                }
                BlockAction::Broadcast { message } => {
                    let Some(id) = self.blocks.get(&block).and_then(|b| b.wireless_interface())
                    else {
                        warn!(%block, "broadcast from a block without a wireless interface");
                        continue;
                    };
                    self.wireless[id.index()].send(message, ctx);
                }
                BlockAction::SetTimer { delay, id } => {
                    ctx.schedule(now.plus(delay), EventKind::Timer { block, id });
                }
            }
        }
    }

    fn p2p_parts(
        &mut self,
        interface: InterfaceId,
    ) -> (&mut P2PNetworkInterface, &mut BlockStats, &mut NetworkStats) {
        let Some(iface) = self.p2p.get_mut(interface.index()) else {
            error!(%interface, "event for an unknown interface");
            panic!("event for unknown interface {}", interface);
        };
        let host = iface.host();
        let Some(block) = self.blocks.get_mut(&host) else {
            error!(%interface, block = %host, "interface hosted by an unknown block");
            panic!("interface {} hosted by unknown block {}", interface, host);
        };
        (iface, &mut block.stats, &mut self.stats)
    }

    fn wireless_parts(
        &mut self,
        interface: InterfaceId,
    ) -> (&mut WirelessNetworkInterface, &mut BlockStats, &mut NetworkStats) {
        let Some(iface) = self.wireless.get_mut(interface.index()) else {
            error!(%interface, "event for an unknown wireless interface");
            panic!("event for unknown wireless interface {}", interface);
        };
        let host = iface.host();
        let Some(block) = self.blocks.get_mut(&host) else {
            error!(%interface, block = %host, "wireless interface hosted by an unknown block");
            panic!("wireless interface {} hosted by unknown block {}", interface, host);
        };
        (iface, &mut block.stats, &mut self.stats)
    }
}

fn fatal_on_err(result: Result<(), WorldError>) {
    if let Err(e) = result {
        error!(error = %e, "topology event failed");
        panic!("topology event failed: {}", e);
    }
}
