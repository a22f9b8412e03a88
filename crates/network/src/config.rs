//! Network configuration.

use crate::radio;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Settings shared by every interface in a world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Data rate, in bit/s, given to interfaces created without one.
    pub default_data_rate: f64,
    /// Seed for every random draw the network makes (shadowing, rate policies).
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            default_data_rate: crate::rate::DEFAULT_DATA_RATE,
            seed: 0,
        }
    }
}

impl NetworkConfig {
    pub fn with_default_data_rate(mut self, bits_per_sec: f64) -> Self {
        self.default_data_rate = bits_per_sec;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// How received power is computed from transmit power and distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PropagationModel {
    /// Deterministic two-ray ground reflection.
    #[default]
    TwoRayGround,
    /// Log-distance loss plus a seeded Gaussian term.
    LogNormalShadowing {
        exponent: f64,
        deviation_db: f64,
        /// Loss at unit distance.
        reference_loss_db: f64,
    },
}

/// Radio parameters of a wireless interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirelessConfig {
    pub transmit_power_dbm: f64,
    /// Weakest signal that can be decoded.
    pub reception_threshold_dbm: f64,
    /// Weakest signal that is sensed at all (and can cause collisions).
    pub reception_sensitivity_dbm: f64,
    /// Margin by which a signal must exceed every overlapping one to survive.
    pub capture_threshold_db: f64,
    pub antenna_gain: f64,
    pub antenna_height: f64,
    pub propagation: PropagationModel,
}

impl Default for WirelessConfig {
    fn default() -> Self {
        Self {
            transmit_power_dbm: 0.0,
            reception_threshold_dbm: -45.0,
            reception_sensitivity_dbm: -50.0,
            capture_threshold_db: 10.0,
            antenna_gain: 1.0,
            antenna_height: 1.0,
            propagation: PropagationModel::TwoRayGround,
        }
    }
}

impl WirelessConfig {
    pub fn with_transmit_power(mut self, dbm: f64) -> Self {
        self.transmit_power_dbm = dbm;
        self
    }

    pub fn with_reception_threshold(mut self, dbm: f64) -> Self {
        self.reception_threshold_dbm = dbm;
        self
    }

    pub fn with_reception_sensitivity(mut self, dbm: f64) -> Self {
        self.reception_sensitivity_dbm = dbm;
        self
    }

    pub fn with_capture_threshold(mut self, db: f64) -> Self {
        self.capture_threshold_db = db;
        self
    }

    pub fn with_propagation(mut self, propagation: PropagationModel) -> Self {
        self.propagation = propagation;
        self
    }

    /// Power at which a transmission from an interface configured with
    /// `self` reaches a receiver configured with `receiver`, `distance`
    /// away.
    pub fn received_power<R: Rng + ?Sized>(
        &self,
        receiver: &WirelessConfig,
        distance: f64,
        rng: &mut R,
    ) -> f64 {
        match self.propagation {
            PropagationModel::TwoRayGround => radio::path_loss(
                self.transmit_power_dbm,
                distance,
                self.antenna_gain * receiver.antenna_gain,
                self.antenna_height,
                receiver.antenna_height,
            ),
            PropagationModel::LogNormalShadowing {
                exponent,
                deviation_db,
                reference_loss_db,
            } => {
                self.transmit_power_dbm
                    - reference_loss_db
                    - radio::shadowing(exponent, distance, deviation_db, rng)
            }
        }
    }
}
