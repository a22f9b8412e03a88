//! Run reports.

use crate::codes::{BeaconCode, RelayCode};
use crate::config::SimulatorConfig;
use crate::error::SimulatorError;
use blocksim_messages::{Message, WirelessMessage};
use blocksim_network::{BlockStats, NetworkStats};
use blocksim_simulation::{SchedulerStats, World};
use blocksim_types::{BlockId, VirtualTime};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Per-block results.
#[derive(Clone, Debug, Serialize)]
pub struct BlockReport {
    pub id: BlockId,
    pub stats: BlockStats,
    /// First arrival of the flood.
    pub reached_at: Option<VirtualTime>,
    pub hops: Option<i64>,
    pub beacons_sent: u32,
    pub beacons_heard: u32,
}

/// Everything worth knowing after a run.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationReport {
    pub config: SimulatorConfig,
    pub events_processed: u64,
    pub events_by_kind: BTreeMap<String, u64>,
    pub final_time: VirtualTime,
    pub wall_time_ms: u64,
    pub network: NetworkStats,
    pub blocks: Vec<BlockReport>,
    /// Messages still alive in the process once the world is gone.
    pub live_messages: u64,
    pub live_wireless_messages: u64,
}

impl SimulationReport {
    pub fn collect(
        config: &SimulatorConfig,
        world: &World,
        stats: &SchedulerStats,
        wall_time: Duration,
    ) -> Self {
        let blocks = world
            .blocks()
            .map(|block| {
                let code = block.code().as_any();
                let relay = code.downcast_ref::<RelayCode>();
                let beacon = code.downcast_ref::<BeaconCode>();
                let reached = relay.and_then(|r| r.reached());
                BlockReport {
                    id: block.id(),
                    stats: block.stats.clone(),
                    reached_at: reached.map(|(at, _)| at),
                    hops: reached.map(|(_, hops)| hops),
                    beacons_sent: beacon.map_or(0, |b| b.sent()),
                    beacons_heard: beacon.map_or(0, |b| b.heard_total()),
                }
            })
            .collect();

        Self {
            config: config.clone(),
            events_processed: stats.events_processed,
            events_by_kind: stats
                .events_by_kind
                .iter()
                .map(|(kind, count)| (kind.to_string(), *count))
                .collect(),
            final_time: stats.final_time,
            wall_time_ms: wall_time.as_millis() as u64,
            network: world.network_stats().clone(),
            blocks,
            live_messages: Message::live_count(),
            live_wireless_messages: WirelessMessage::live_count(),
        }
    }

    /// Blocks the flood reached.
    pub fn reached(&self) -> usize {
        self.blocks.iter().filter(|b| b.reached_at.is_some()).count()
    }

    pub fn to_json(&self) -> Result<String, SimulatorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn print_summary(&self) {
        println!("\n=== Simulation ===");
        println!("Scenario:          {:?}", self.config.scenario);
        println!("Blocks:            {}", self.blocks.len());
        println!("Events processed:  {}", self.events_processed);
        println!("Final time:        {}", self.final_time);
        println!("Wall time:         {} ms", self.wall_time_ms);

        println!("\n=== Events ===");
        for (kind, count) in &self.events_by_kind {
            println!("{:<26} {}", kind, count);
        }

        println!("\n=== Network ===");
        println!("P2P sent:          {}", self.network.messages_sent);
        println!("P2P delivered:     {}", self.network.messages_delivered);
        if self.network.wireless_sent > 0 {
            println!("Wireless sent:     {}", self.network.wireless_sent);
            println!("Receptions:        {}", self.network.wireless_receptions);
            println!("Delivered:         {}", self.network.wireless_delivered);
            println!("Collisions:        {}", self.network.wireless_collisions);
            println!("Below threshold:   {}", self.network.wireless_below_threshold);
            println!(
                "Delivery rate:     {:.1}%",
                self.network.wireless_delivery_rate() * 100.0
            );
        }

        println!("\n=== Blocks ===");
        for block in &self.blocks {
            match (block.reached_at, block.hops) {
                (Some(at), Some(hops)) => println!(
                    "{:<10} reached {} after {} hops, max queue {}",
                    block.id.to_string(), at, hops, block.stats.max_outgoing_queue_size
                ),
                _ if block.beacons_sent > 0 || block.beacons_heard > 0 => println!(
                    "{:<10} sent {} beacons, heard {}",
                    block.id.to_string(), block.beacons_sent, block.beacons_heard
                ),
                _ => println!("{:<10} idle", block.id.to_string()),
            }
        }
    }
}
