//! Seeding plumbing for the run's random source.
//!
//! Exactly one seedable generator exists per run; every stochastic draw in
//! the engine (lifespans, stage noise, spikes, drop-outs, regime
//! transitions, imperfection onsets, maintenance rolls) is routed through
//! it, so a fixed seed fully determines an output trace.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Build the run generator. `None` draws a seed from OS entropy, which
/// makes the run non-reproducible by design.
pub fn run_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Uniform draw on `[min, max)` that tolerates a degenerate range.
///
/// `gen_range` panics on an empty range; configs are allowed to pin a
/// parameter by setting both bounds to the same value.
pub fn uniform(rng: &mut impl rand::Rng, min: f64, max: f64) -> f64 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}
