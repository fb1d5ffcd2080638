//! Three-stage degradation kernel.
//!
//! A motor's life is a sampled span `T` split into three stages:
//!
//! - **Stage 0** (70-85% of `T`): healthy plateau around a base level with
//!   small noise and a tiny monotone drift so the stage always ends.
//! - **Stage 1** (12-22% of `T`): power-law damage growth
//!   `H = H0 − a·τ^b`, with `a` solved per motor so the stage lands on the
//!   mid-life health target.
//! - **Stage 2** (remainder): exponential collapse
//!   `H = 0.5 − 0.5·e^{c·τ}` with `c = ln(0.30)/duration`, computed
//!   dynamically each tick.
//!
//! Updates in Stages 1 and 2 are monotone: an upward stochastic draw is
//! rejected by taking the minimum with the previous health.

use rand::Rng;

use crate::config::BaseConfig;
use crate::rng::uniform;
use crate::types::{DegradationStage, HealthState};

use super::noise::add_gaussian;

/// Health level targeted at the Stage 1 → Stage 2 handoff.
const STAGE1_TARGET_HEALTH: f64 = 0.50;
/// Gaussian sigma of the Stage 1 update.
const STAGE1_NOISE_STD: f64 = 0.02;
/// Gaussian sigma of the Stage 2 update.
const STAGE2_NOISE_STD: f64 = 0.01;
/// Stage 2 health at the start of the collapse.
const STAGE2_START_HEALTH: f64 = 0.50;
/// Fraction of the collapse remaining at the end of Stage 2; fixes the
/// exponential coefficient via `c = ln(0.30)/duration`.
const STAGE2_END_FRACTION: f64 = 0.30;
/// Stage 0 loses this much health over its whole duration, guaranteeing a
/// transition even with zero noise.
const STAGE0_TOTAL_DRIFT: f64 = 0.05;
/// Allowed band around the Stage 0 base health: [base − 0.03, base + 0.02].
const STAGE0_BAND_BELOW: f64 = 0.03;
const STAGE0_BAND_ABOVE: f64 = 0.02;

// ============================================================================
// Lifespan sampling
// ============================================================================

/// Per-cycle lifespan sample: total life, its three-way split, and the
/// Stage 1 power-law shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageProfile {
    pub target_hours_to_critical: f64,
    pub stage0_duration_hours: f64,
    pub stage1_duration_hours: f64,
    pub stage2_duration_hours: f64,
    pub stage1_power_exponent: f64,
}

/// Sample a fresh lifespan and stage allocation for one cycle.
///
/// `degradation_speed > 1` shortens every duration by its reciprocal, which
/// keeps the three durations summing to the (scaled) target life.
pub fn sample_stage_profile(
    cfg: &BaseConfig,
    degradation_speed: f64,
    rng: &mut impl Rng,
) -> StageProfile {
    let total = uniform(rng, cfg.min_hours_to_critical, cfg.max_hours_to_critical)
        / degradation_speed;

    let stage0_pct = uniform(rng, cfg.stage0_min_pct, cfg.stage0_max_pct);
    let stage1_pct = uniform(rng, cfg.stage1_min_pct, cfg.stage1_max_pct);
    let stage2_pct = 1.0 - stage0_pct - stage1_pct;

    StageProfile {
        target_hours_to_critical: total,
        stage0_duration_hours: total * stage0_pct,
        stage1_duration_hours: total * stage1_pct,
        stage2_duration_hours: total * stage2_pct,
        stage1_power_exponent: uniform(rng, cfg.stage1_power_exp_min, cfg.stage1_power_exp_max),
    }
}

// ============================================================================
// Categorical projections
// ============================================================================

/// Stage implied by elapsed operating hours against the stage durations.
pub fn determine_stage(
    hours_since_maintenance: f64,
    stage0_duration: f64,
    stage1_duration: f64,
) -> DegradationStage {
    if hours_since_maintenance < stage0_duration {
        DegradationStage::Stage0
    } else if hours_since_maintenance < stage0_duration + stage1_duration {
        DegradationStage::Stage1
    } else {
        DegradationStage::Stage2
    }
}

/// Project continuous health through the ordered threshold pair.
pub fn determine_health_state(
    health: f64,
    warning_threshold: f64,
    critical_threshold: f64,
) -> HealthState {
    if health >= warning_threshold {
        HealthState::Healthy
    } else if health >= critical_threshold {
        HealthState::Warning
    } else {
        HealthState::Critical
    }
}

// ============================================================================
// Health update
// ============================================================================

/// Advance the hidden health by one tick.
///
/// `wear_scale` is the regime's degradation multiplier; it scales the
/// stochastic components (plateau drift and per-stage noise), never the
/// clock itself.
#[allow(clippy::too_many_arguments)]
pub fn update_health(
    current_health: f64,
    hours_since_maintenance: f64,
    stage: DegradationStage,
    stage0_duration: f64,
    stage1_duration: f64,
    stage2_duration: f64,
    stage1_power_exponent: f64,
    cfg: &BaseConfig,
    wear_scale: f64,
    rng: &mut impl Rng,
) -> f64 {
    let dt = cfg.time_step_hours();

    let new_health = match stage {
        DegradationStage::Stage0 => {
            let base = cfg.stage0_base_health;
            let drift = if stage0_duration > 0.0 {
                STAGE0_TOTAL_DRIFT / stage0_duration * dt * wear_scale
            } else {
                0.0
            };
            let noisy = add_gaussian(
                current_health - drift,
                cfg.stage0_noise_std * dt * wear_scale,
                rng,
            );
            noisy.clamp(base - STAGE0_BAND_BELOW, base + STAGE0_BAND_ABOVE)
        }
        DegradationStage::Stage1 => {
            let time_in_stage = hours_since_maintenance - stage0_duration;
            let start = cfg.stage0_base_health;
            let drop = start - STAGE1_TARGET_HEALTH;
            let coeff = if stage1_duration > 0.0 {
                drop / stage1_duration.powf(stage1_power_exponent)
            } else {
                0.0
            };
            let model = start - coeff * time_in_stage.powf(stage1_power_exponent);
            let noisy = add_gaussian(model, STAGE1_NOISE_STD * wear_scale, rng);
            // Monotone within the stage: reject upward draws.
            noisy.min(current_health)
        }
        DegradationStage::Stage2 => {
            let time_in_stage =
                hours_since_maintenance - stage0_duration - stage1_duration;
            let coeff = if stage2_duration > 0.0 {
                STAGE2_END_FRACTION.ln() / stage2_duration
            } else {
                -0.1
            };
            let decay = 0.5 * (coeff * time_in_stage).exp();
            let model = STAGE2_START_HEALTH - decay;
            let noisy = add_gaussian(model, STAGE2_NOISE_STD * wear_scale, rng);
            noisy.min(current_health)
        }
    };

    new_health.clamp(0.0, 1.0)
}

/// Friction grows linearly with accumulated damage.
pub fn update_friction(base_friction: f64, k_friction: f64, motor_health: f64) -> f64 {
    base_friction + k_friction * (1.0 - motor_health)
}

/// First-order thermal low-pass: heat from friction and load, cooling
/// towards ambient. Temperature therefore lags health changes.
pub fn update_thermal(
    temperature: f64,
    ambient: f64,
    friction: f64,
    load: f64,
    alpha: f64,
    beta: f64,
    temp_scale: f64,
) -> f64 {
    let heat_generated = alpha * friction * load * temp_scale;
    let cooling = beta * (temperature - ambient);
    temperature + heat_generated - cooling
}
