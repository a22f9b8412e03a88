//! Configuration types for the simulator.

use crate::error::SimulatorError;
use blocksim_network::{NetworkConfig, PropagationModel, WirelessConfig};
use blocksim_simulation::{SchedulerConfig, SchedulerMode};
use blocksim_types::VirtualTime;
use serde::Serialize;

/// What the blocks do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// A line of blocks linked port to port. Block 0 floods a hop counter
    /// down the line.
    #[default]
    Flood,

    /// Free-standing radios on a line, each broadcasting periodic beacons.
    Beacon,
}

/// Configuration for a simulation run.
#[derive(Clone, Debug, Serialize)]
pub struct SimulatorConfig {
    pub scenario: Scenario,

    /// Number of blocks.
    pub blocks: u32,

    /// Distance between neighbouring blocks.
    pub spacing: f64,

    /// Size of every message, in bytes.
    pub message_size: u32,

    /// Link data rate, in bit/s.
    pub data_rate: f64,

    /// When set, each link draws its rate uniformly from
    /// `data_rate · (1 ± rate_jitter)` on every transmission.
    pub rate_jitter: Option<f64>,

    /// Beacon period, in virtual microseconds.
    pub beacon_period: u64,

    /// Beacons sent by each block.
    pub beacons: u32,

    /// Log-normal shadowing deviation in dB. `None` keeps the
    /// deterministic two-ray model.
    pub shadowing_db: Option<f64>,

    /// In the flood scenario, wait for a tap on block 0 at this date
    /// instead of flooding at start.
    pub tap_at: Option<VirtualTime>,

    /// Stop before any event later than this.
    pub max_date: Option<VirtualTime>,

    /// Follow the wall clock at this speed instead of running flat out.
    pub real_time_speed: Option<f64>,

    /// Random seed for deterministic simulation.
    pub seed: u64,
}

impl SimulatorConfig {
    pub fn new(scenario: Scenario, blocks: u32) -> Self {
        Self {
            scenario,
            blocks,
            spacing: 10.0,
            message_size: blocksim_messages::DEFAULT_MESSAGE_SIZE,
            data_rate: blocksim_network::DEFAULT_DATA_RATE,
            rate_jitter: None,
            beacon_period: 1_000,
            beacons: 5,
            shadowing_db: None,
            tap_at: None,
            max_date: None,
            real_time_speed: None,
            seed: 12345,
        }
    }

    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_message_size(mut self, size: u32) -> Self {
        self.message_size = size;
        self
    }

    pub fn with_data_rate(mut self, bits_per_sec: f64) -> Self {
        self.data_rate = bits_per_sec;
        self
    }

    pub fn with_rate_jitter(mut self, jitter: f64) -> Self {
        self.rate_jitter = Some(jitter);
        self
    }

    pub fn with_beacons(mut self, count: u32, period: u64) -> Self {
        self.beacons = count;
        self.beacon_period = period;
        self
    }

    pub fn with_shadowing(mut self, deviation_db: f64) -> Self {
        self.shadowing_db = Some(deviation_db);
        self
    }

    pub fn with_tap_at(mut self, date: VirtualTime) -> Self {
        self.tap_at = Some(date);
        self
    }

    pub fn with_max_date(mut self, date: VirtualTime) -> Self {
        self.max_date = Some(date);
        self
    }

    pub fn with_real_time(mut self, speed: f64) -> Self {
        self.real_time_speed = Some(speed);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject settings the world builder cannot honour.
    pub fn validate(&self) -> Result<(), SimulatorError> {
        if self.blocks == 0 {
            return Err(SimulatorError::InvalidConfig("at least one block is required".into()));
        }
        if !(self.spacing.is_finite() && self.spacing >= 0.0) {
            return Err(SimulatorError::InvalidConfig(format!(
                "spacing must be a non-negative number, got {}",
                self.spacing
            )));
        }
        if self.message_size == 0 {
            return Err(SimulatorError::InvalidConfig("message size must be positive".into()));
        }
        if let Some(jitter) = self.rate_jitter {
            if !(0.0..1.0).contains(&jitter) {
                return Err(SimulatorError::InvalidConfig(format!(
                    "rate jitter must be in [0, 1), got {}",
                    jitter
                )));
            }
        }
        if self.scenario == Scenario::Beacon && self.beacon_period == 0 {
            return Err(SimulatorError::InvalidConfig("beacon period must be positive".into()));
        }
        if let Some(speed) = self.real_time_speed {
            if !(speed.is_finite() && speed > 0.0) {
                return Err(SimulatorError::InvalidConfig(format!(
                    "real-time speed must be positive, got {}",
                    speed
                )));
            }
        }
        Ok(())
    }

    pub fn to_network_config(&self) -> NetworkConfig {
        NetworkConfig::default()
            .with_default_data_rate(self.data_rate)
            .with_seed(self.seed)
    }

    pub fn to_wireless_config(&self) -> WirelessConfig {
        match self.shadowing_db {
            None => WirelessConfig::default(),
            Some(deviation_db) => {
                WirelessConfig::default().with_propagation(PropagationModel::LogNormalShadowing {
                    exponent: 4.0,
                    deviation_db,
                    reference_loss_db: 0.0,
                })
            }
        }
    }

    pub fn to_scheduler_config(&self) -> SchedulerConfig {
        let config = SchedulerConfig::default().with_terminate_when_idle(true);
        match self.max_date {
            Some(date) => config.with_max_date(date),
            None => config,
        }
    }

    pub fn mode(&self) -> SchedulerMode {
        match self.real_time_speed {
            Some(speed) => SchedulerMode::RealTime { speed },
            None => SchedulerMode::Fast,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self::new(Scenario::Flood, 8)
    }
}
