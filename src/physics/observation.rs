//! Clean sensor readings as explicit functions of effective health.
//!
//! Each sensor sees an *effective* health — the mean of the motor's recent
//! health values over that sensor's window — so channels respond to damage
//! at different speeds. Temperature is lagged further upstream by the
//! thermal low-pass, so its reading is just the thermal state plus drift,
//! clamped to the physically plausible band.

use rand::Rng;

use super::noise::add_gaussian;

/// Aggregated vibration reading: RMS over `duration × rate` sub-samples.
///
/// The base level grows quadratically with damage and linearly with
/// misalignment; each sub-sample carries temporal noise proportional to 5%
/// of the base, simulating rotation-cycle variation within the sampling
/// window.
#[allow(clippy::too_many_arguments)]
pub fn compute_vibration(
    effective_health: f64,
    misalignment: f64,
    v_base: f64,
    k_health: f64,
    k_align: f64,
    duration_secs: u32,
    sample_rate_hz: u32,
    rng: &mut impl Rng,
) -> f64 {
    let damage = 1.0 - effective_health;
    let base = v_base + k_health * damage * damage + k_align * misalignment;

    let num_samples = (duration_secs * sample_rate_hz).max(1);
    let mut sum_squares = 0.0;
    for _ in 0..num_samples {
        let sample = add_gaussian(base, base.abs() * 0.05, rng);
        sum_squares += sample * sample;
    }

    (sum_squares / f64::from(num_samples)).sqrt()
}

/// Mechanical resistance raises electrical current draw.
pub fn compute_current(
    base_current: f64,
    load: f64,
    effective_health: f64,
    k_current: f64,
) -> f64 {
    let value = base_current * load * (1.0 + k_current * (1.0 - effective_health));
    value.max(f64::EPSILON)
}

/// Misalignment slightly reduces effective shaft speed.
pub fn compute_rpm(nominal_rpm: f64, misalignment: f64) -> f64 {
    (nominal_rpm * (1.0 - 0.05 * misalignment)).max(0.0)
}

/// Clamp a temperature reading to `[ambient, critical + 10]`.
pub fn clamp_temperature(reading: f64, ambient: f64, critical: f64) -> f64 {
    reading.clamp(ambient, critical + 10.0)
}
