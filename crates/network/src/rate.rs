//! Data-rate models.

use crate::error::RateError;
use blocksim_types::MICROS_PER_SEC;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Rate, in bit/s, of an interface that was not given one.
pub const DEFAULT_DATA_RATE: f64 = 1_000_000.0;

#[derive(Debug, Clone)]
enum Policy {
    Static(f64),
    Uniform { min: f64, max: f64, rng: ChaCha8Rng },
}

/// How fast an interface pushes bits onto its link.
///
/// A rate is either fixed or drawn uniformly from a range on every
/// transmission. The uniform policy owns a seeded RNG so runs replay.
#[derive(Debug, Clone)]
pub struct Rate {
    policy: Policy,
}

impl Rate {
    /// A fixed rate in bit/s.
    pub fn fixed(bits_per_sec: f64) -> Result<Self, RateError> {
        if !(bits_per_sec > 0.0) {
            return Err(RateError::NonPositive(bits_per_sec));
        }
        Ok(Self {
            policy: Policy::Static(bits_per_sec),
        })
    }

    /// A rate drawn uniformly from `[min, max]` on every call to [`get`](Self::get).
    pub fn uniform(min: f64, max: f64, seed: u64) -> Result<Self, RateError> {
        if !(min > 0.0) {
            return Err(RateError::NonPositive(min));
        }
        if !(max >= min) {
            return Err(RateError::EmptyRange { min, max });
        }
        Ok(Self {
            policy: Policy::Uniform {
                min,
                max,
                rng: ChaCha8Rng::seed_from_u64(seed),
            },
        })
    }

    /// Current rate in bit/s.
    pub fn get(&mut self) -> f64 {
        match &mut self.policy {
            Policy::Static(rate) => *rate,
            Policy::Uniform { min, max, rng } => {
                if min == max {
                    *min
                } else {
                    rng.gen_range(*min..=*max)
                }
            }
        }
    }

    /// Virtual microseconds needed to push `size` bytes, truncated.
    pub fn transmission_duration(&mut self, size: u32) -> u64 {
        let rate = self.get();
        (size as f64 * 8.0 * MICROS_PER_SEC as f64 / rate) as u64
    }
}

impl Default for Rate {
    fn default() -> Self {
        Self {
            policy: Policy::Static(DEFAULT_DATA_RATE),
        }
    }
}
