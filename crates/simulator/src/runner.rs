//! Scenario runner.

use crate::codes::{BeaconCode, RelayCode, Trigger};
use crate::config::{Scenario, SimulatorConfig};
use crate::error::SimulatorError;
use crate::report::SimulationReport;
use blocksim_network::Rate;
use blocksim_simulation::{Scheduler, World};
use blocksim_types::{BlockId, InterfaceId, Position};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Instant;
use tracing::info;

/// Builds a world from a [`SimulatorConfig`] and runs it to completion.
pub struct Simulator {
    config: SimulatorConfig,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Result<Self, SimulatorError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Lay the blocks out on the x axis and install the scenario's code.
    pub fn build_world(&self) -> Result<World, SimulatorError> {
        let world = World::new(self.config.to_network_config())
            .with_wireless_config(self.config.to_wireless_config());
        match self.config.scenario {
            Scenario::Flood => self.build_line(world),
            Scenario::Beacon => self.build_radios(world),
        }
    }

    fn position(&self, index: u32) -> Position {
        Position::new(f64::from(index) * self.config.spacing, 0.0, 0.0)
    }

    /// A rate for one interface, jittered when configured.
    fn rate(&self, salt: u64) -> Result<Option<Rate>, SimulatorError> {
        let Some(jitter) = self.config.rate_jitter else {
            return Ok(None);
        };
        let rate = self.config.data_rate;
        let seed = self.config.seed.wrapping_add(salt);
        Ok(Some(Rate::uniform(
            rate * (1.0 - jitter),
            rate * (1.0 + jitter),
            seed,
        )?))
    }

    /// Block `i` uses port 0 towards `i - 1` and port 1 towards `i + 1`.
    fn build_line(&self, mut world: World) -> Result<World, SimulatorError> {
        let count = self.config.blocks;
        let origin = match self.config.tap_at {
            Some(_) => Trigger::Tap,
            None => Trigger::Start,
        };

        let mut ports: Vec<(InterfaceId, InterfaceId)> = Vec::new();
        for i in 0..count {
            let mut connected = Vec::new();
            if i > 0 {
                connected.push(0);
            }
            if i + 1 < count {
                connected.push(1);
            }
            let mut code = RelayCode::new(connected, self.config.message_size);
            if i == 0 {
                code = code.origin(origin);
            }
            let id = BlockId(i);
            world.add_block(id, self.position(i), Box::new(code))?;
            let left = world.add_p2p_interface(id)?;
            let right = world.add_p2p_interface(id)?;
            for iface in [left, right] {
                if let Some(rate) = self.rate(u64::from(iface.0))? {
                    world.set_data_rate(iface, rate)?;
                }
            }
            ports.push((left, right));
        }

        for pair in ports.windows(2) {
            let (_, right) = pair[0];
            let (left, _) = pair[1];
            world.connect(right, Some(left))?;
        }
        Ok(world)
    }

    fn build_radios(&self, mut world: World) -> Result<World, SimulatorError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        for i in 0..self.config.blocks {
            let id = BlockId(i);
            let offset = rng.gen_range(0..self.config.beacon_period);
            let code = BeaconCode::new(
                id,
                offset,
                self.config.beacon_period,
                self.config.beacons,
                self.config.message_size,
            );
            world.add_block(id, self.position(i), Box::new(code))?;
            let radio = world.add_wireless_interface(id, None)?;
            if let Some(rate) = self.rate(u64::from(radio.0))? {
                world.set_wireless_data_rate(radio, rate)?;
            }
        }
        Ok(world)
    }

    /// Run the scenario on a scheduler thread and collect the report.
    pub fn run(&self) -> Result<SimulationReport, SimulatorError> {
        let world = self.build_world()?;
        info!(
            scenario = ?self.config.scenario,
            blocks = world.block_count(),
            seed = self.config.seed,
            "starting simulation"
        );

        let mut scheduler = Scheduler::new(world, self.config.to_scheduler_config());
        if let Some(date) = self.config.tap_at {
            scheduler.tap_block(date, BlockId(0), None)?;
        }

        let started = Instant::now();
        scheduler.start(self.config.mode())?;
        scheduler.unpause()?;
        let (world, stats) = scheduler.wait_for_end()?;
        let wall_time = started.elapsed();

        info!(
            events = stats.events_processed,
            final_time = %stats.final_time,
            wall_ms = wall_time.as_millis() as u64,
            "simulation finished"
        );
        Ok(SimulationReport::collect(
            &self.config,
            &world,
            &stats,
            wall_time,
        ))
    }
}
