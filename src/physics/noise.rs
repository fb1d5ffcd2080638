//! Sensor contamination primitives.
//!
//! Applied after the clean reading, in pipeline order: Gaussian noise,
//! then spikes (vibration only), then Bernoulli drop-outs. A dropped
//! reading becomes `None`, which downstream layers treat as a first-class
//! missing value.

use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Add zero-mean Gaussian noise with the given sigma.
///
/// A sigma of zero (e.g. `noise_level = 0` runs) leaves the value
/// untouched rather than constructing a degenerate distribution.
pub fn add_gaussian(value: f64, std: f64, rng: &mut impl Rng) -> f64 {
    if std <= 0.0 {
        return value;
    }
    match Normal::new(0.0, std) {
        Ok(dist) => value + dist.sample(rng),
        Err(_) => value,
    }
}

/// Occasionally inject a spike of `±magnitude` into the signal.
pub fn add_spike(value: f64, probability: f64, magnitude: f64, rng: &mut impl Rng) -> f64 {
    if rng.gen::<f64>() < probability {
        let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        value + sign * magnitude
    } else {
        value
    }
}

/// Randomly drop a reading with probability `drop_prob`.
pub fn maybe_drop(value: f64, drop_prob: f64, rng: &mut impl Rng) -> Option<f64> {
    if rng.gen::<f64>() < drop_prob {
        None
    } else {
        Some(value)
    }
}
