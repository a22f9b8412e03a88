//! Radio propagation.
//!
//! All powers are in dBm and all losses in dB. Distances are in the same
//! unit as block positions and are clamped to at least 1 so that
//! co-located blocks do not produce infinite power.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::warn;

fn clamp_distance(distance: f64) -> f64 {
    if distance.is_finite() && distance > 1.0 {
        distance
    } else {
        1.0
    }
}

/// Received power under the two-ray ground model.
///
/// `Pr = Pt + 10·log10(G·ht²·hr²) − 40·log10(d)`
pub fn path_loss(power: f64, distance: f64, gain: f64, t_height: f64, r_height: f64) -> f64 {
    let d = clamp_distance(distance);
    let antenna = gain * t_height * t_height * r_height * r_height;
    power + 10.0 * antenna.log10() - 40.0 * d.log10()
}

/// Log-distance loss with a log-normal shadowing term.
///
/// `PL = 10·n·log10(d) + X`, where `X ~ N(0, deviation²)` is drawn from
/// `rng`. A negative or non-finite deviation leaves out the random term.
pub fn shadowing<R: Rng + ?Sized>(
    exponent: f64,
    distance: f64,
    deviation: f64,
    rng: &mut R,
) -> f64 {
    let d = clamp_distance(distance);
    let loss = 10.0 * exponent * d.log10();
    match Normal::new(0.0, deviation) {
        Ok(noise) => loss + noise.sample(rng),
        Err(e) => {
            warn!(deviation, error = %e, "invalid shadowing deviation");
            loss
        }
    }
}
