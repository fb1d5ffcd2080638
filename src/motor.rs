//! Per-motor hidden state and the tick pipeline that derives sensor
//! readings from it.
//!
//! The hidden state drives everything observable. Each tick a motor:
//! advances its operating hours, recomputes stage and health, refreshes
//! friction and the thermal state, derives clean sensor readings from
//! per-sensor *effective health* (a trailing-window mean, so channels
//! respond at different speeds), then contaminates them with drift,
//! Gaussian noise, spikes, drop-outs and the stateful imperfection layer.

use rand::Rng;

use crate::config::BaseConfig;
use crate::error::{ensure_finite, EngineError};
use crate::imperfections::{SensorChannel, SensorImperfections};
use crate::physics::{
    add_gaussian, add_spike, clamp_temperature, compute_current, compute_rpm,
    compute_vibration, determine_health_state, determine_stage, maybe_drop,
    sample_stage_profile, update_friction, update_health, update_thermal, StageProfile,
};
use crate::types::{DegradationStage, HealthState};

/// Capacity of the trailing health window.
pub const HEALTH_WINDOW_CAPACITY: usize = 30;

/// Ticks of health history the vibration channel averages over
/// (immediate response).
pub const SENSOR_WINDOW_VIBRATION: usize = 1;
/// Ticks of health history the current channel averages over (short lag).
/// Temperature needs no window: it lags through the thermal low-pass.
pub const SENSOR_WINDOW_CURRENT: usize = 5;

// ============================================================================
// Health window
// ============================================================================

/// Fixed-capacity ring buffer of recent health values, newest last.
/// Never empty once constructed.
#[derive(Debug, Clone)]
pub struct HealthWindow {
    buf: [f64; HEALTH_WINDOW_CAPACITY],
    /// Next write position.
    head: usize,
    len: usize,
}

impl HealthWindow {
    pub fn new(initial: f64) -> Self {
        let mut window = Self {
            buf: [0.0; HEALTH_WINDOW_CAPACITY],
            head: 0,
            len: 0,
        };
        window.push(initial);
        window
    }

    pub fn push(&mut self, value: f64) {
        self.buf[self.head] = value;
        self.head = (self.head + 1) % HEALTH_WINDOW_CAPACITY;
        if self.len < HEALTH_WINDOW_CAPACITY {
            self.len += 1;
        }
    }

    /// Drop all history and restart from a single value.
    pub fn reset(&mut self, value: f64) {
        self.head = 0;
        self.len = 0;
        self.push(value);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Most recently pushed value.
    pub fn latest(&self) -> f64 {
        let idx = (self.head + HEALTH_WINDOW_CAPACITY - 1) % HEALTH_WINDOW_CAPACITY;
        self.buf[idx]
    }

    /// Arithmetic mean of the newest `window` entries (or fewer, early in
    /// a cycle).
    pub fn mean_of_last(&self, window: usize) -> f64 {
        let take = window.max(1).min(self.len);
        let mut sum = 0.0;
        for i in 0..take {
            let idx = (self.head + HEALTH_WINDOW_CAPACITY - 1 - i) % HEALTH_WINDOW_CAPACITY;
            sum += self.buf[idx];
        }
        sum / take as f64
    }
}

// ============================================================================
// Hidden state
// ============================================================================

/// Hidden (unobservable) state of one motor; mutated every tick and reset
/// by automatic maintenance.
#[derive(Debug, Clone)]
pub struct MotorHiddenState {
    /// Stable identity across cycle resets.
    pub motor_id: u32,
    /// 1.0 = perfect, 0.0 = failed.
    pub motor_health: f64,
    pub health_state: HealthState,
    pub degradation_stage: DegradationStage,
    /// Per-motor load multiplier (personality; regimes scale it per step).
    pub load_factor: f64,
    /// Mechanical defect, monotone between maintenances.
    pub misalignment: f64,
    /// Derived each tick from base friction and health.
    pub friction_coeff: f64,
    pub hours_since_maintenance: f64,
    /// Sampled life for the current cycle.
    pub target_hours_to_critical: f64,
    pub stage0_duration_hours: f64,
    pub stage1_duration_hours: f64,
    pub stage2_duration_hours: f64,
    pub stage1_power_exponent: f64,
    /// Cumulative temperature sensor drift.
    pub sensor_temperature_bias: f64,
    /// Cumulative vibration sensor drift.
    pub sensor_vibration_bias: f64,
    /// Slow-moving internal temperature (°C).
    pub thermal_temperature: f64,
    /// Recent health values, newest last; feeds effective health.
    pub health_window: HealthWindow,
}

impl MotorHiddenState {
    fn apply_profile(&mut self, profile: &StageProfile) {
        self.target_hours_to_critical = profile.target_hours_to_critical;
        self.stage0_duration_hours = profile.stage0_duration_hours;
        self.stage1_duration_hours = profile.stage1_duration_hours;
        self.stage2_duration_hours = profile.stage2_duration_hours;
        self.stage1_power_exponent = profile.stage1_power_exponent;
    }
}

/// One tick's worth of (possibly missing) sensor readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorFrame {
    pub temperature: Option<f64>,
    pub vibration: Option<f64>,
    pub current: Option<f64>,
    pub rpm: Option<f64>,
}

// ============================================================================
// Motor
// ============================================================================

/// A motor and its sensor-fault state. Owned exclusively by the factory.
#[derive(Debug, Clone)]
pub struct Motor {
    pub state: MotorHiddenState,
    /// Completed automatic-maintenance cycles.
    pub cycle_id: u32,
    /// Inactive motors are skipped by the fleet scheduler (paused, failed,
    /// or cycle-complete).
    pub active: bool,
    imperfections: SensorImperfections,
}

impl Motor {
    /// Create a motor with sampled personality, lifespan and stage profile.
    pub fn new(
        motor_id: u32,
        cfg: &BaseConfig,
        load_multiplier: f64,
        degradation_speed: f64,
        rng: &mut impl Rng,
    ) -> Self {
        let profile = sample_stage_profile(cfg, degradation_speed, rng);

        // Personality: motors start healthy but not identical.
        let load_factor = add_gaussian(1.0, 0.1, rng).clamp(0.8, 1.3) * load_multiplier;
        let misalignment = add_gaussian(0.05, 0.03, rng).clamp(0.0, 0.2);
        let initial_health = crate::rng::uniform(
            rng,
            cfg.stage0_base_health - 0.02,
            cfg.stage0_base_health,
        );

        let mut state = MotorHiddenState {
            motor_id,
            motor_health: initial_health,
            health_state: HealthState::Healthy,
            degradation_stage: DegradationStage::Stage0,
            load_factor,
            misalignment,
            friction_coeff: cfg.base_friction,
            hours_since_maintenance: 0.0,
            target_hours_to_critical: 0.0,
            stage0_duration_hours: 0.0,
            stage1_duration_hours: 0.0,
            stage2_duration_hours: 0.0,
            stage1_power_exponent: 0.0,
            sensor_temperature_bias: 0.0,
            sensor_vibration_bias: 0.0,
            thermal_temperature: cfg.ambient_temp,
            health_window: HealthWindow::new(initial_health),
        };
        state.apply_profile(&profile);

        Self {
            state,
            cycle_id: 0,
            active: true,
            imperfections: SensorImperfections::new(cfg.enable_sensor_imperfections),
        }
    }

    /// Effective health as perceived by a sensor with the given window.
    pub fn effective_health(&self, window: usize) -> f64 {
        self.state.health_window.mean_of_last(window)
    }

    /// Begin a fresh degradation cycle: zero the hours counter, resample
    /// lifespan, stage durations and the Stage 1 exponent, and restart the
    /// health window.
    ///
    /// Thermal state, sensor drift biases and imperfection faults persist:
    /// maintenance fixes the machine, not the instrumentation.
    pub fn reset_cycle(
        &mut self,
        cfg: &BaseConfig,
        degradation_speed: f64,
        new_health: f64,
        rng: &mut impl Rng,
    ) {
        let profile = sample_stage_profile(cfg, degradation_speed, rng);
        self.state.apply_profile(&profile);
        self.state.motor_health = new_health;
        self.state.health_state = HealthState::Healthy;
        self.state.degradation_stage = DegradationStage::Stage0;
        self.state.hours_since_maintenance = 0.0;
        self.state.health_window.reset(new_health);
    }

    /// Test hook: force the motor into a severely degraded condition.
    pub fn inject_failure(&mut self, cfg: &BaseConfig) {
        self.state.motor_health = 0.1;
        self.state.misalignment += 0.3;
        self.state.friction_coeff *= 2.0;
        self.state.health_state = determine_health_state(
            self.state.motor_health,
            cfg.warning_threshold,
            cfg.critical_threshold,
        );
        self.state.health_window.push(self.state.motor_health);
    }

    /// Advance the motor by one tick and produce its sensor frame.
    ///
    /// `noise_scale`, `temp_scale` and `wear_scale` are the regime (and
    /// run-level) multipliers for this step; the regime's load multiplier
    /// is already folded into `load_factor` by the caller.
    pub fn step(
        &mut self,
        cfg: &BaseConfig,
        noise_scale: f64,
        temp_scale: f64,
        wear_scale: f64,
        rng: &mut impl Rng,
    ) -> Result<SensorFrame, EngineError> {
        let id = self.state.motor_id;
        let dt = cfg.time_step_hours();

        // --- Hidden state ---
        self.state.hours_since_maintenance += dt;
        self.state.degradation_stage = determine_stage(
            self.state.hours_since_maintenance,
            self.state.stage0_duration_hours,
            self.state.stage1_duration_hours,
        );

        let new_health = update_health(
            self.state.motor_health,
            self.state.hours_since_maintenance,
            self.state.degradation_stage,
            self.state.stage0_duration_hours,
            self.state.stage1_duration_hours,
            self.state.stage2_duration_hours,
            self.state.stage1_power_exponent,
            cfg,
            wear_scale,
            rng,
        );
        self.state.motor_health = ensure_finite(new_health, id, "motor_health")?;
        self.state.health_state = determine_health_state(
            self.state.motor_health,
            cfg.warning_threshold,
            cfg.critical_threshold,
        );
        self.state.health_window.push(self.state.motor_health);

        self.state.friction_coeff = ensure_finite(
            update_friction(cfg.base_friction, cfg.k_friction, self.state.motor_health),
            id,
            "friction_coeff",
        )?;

        self.state.thermal_temperature = ensure_finite(
            update_thermal(
                self.state.thermal_temperature,
                cfg.ambient_temp,
                self.state.friction_coeff,
                self.state.load_factor,
                cfg.alpha,
                cfg.beta,
                temp_scale,
            ),
            id,
            "thermal_temperature",
        )?;

        // --- Clean readings ---
        let vibration = compute_vibration(
            self.effective_health(SENSOR_WINDOW_VIBRATION),
            self.state.misalignment,
            cfg.v_base,
            cfg.k_v_health,
            cfg.k_v_align,
            cfg.vibration_sample_duration,
            cfg.vibration_sample_rate,
            rng,
        );
        let current = compute_current(
            cfg.base_current,
            self.state.load_factor,
            self.effective_health(SENSOR_WINDOW_CURRENT),
            cfg.k_current,
        );
        let rpm = compute_rpm(cfg.nominal_rpm, self.state.misalignment);

        // --- Cumulative sensor drift ---
        self.state.sensor_temperature_bias += cfg.temp_drift;
        self.state.sensor_vibration_bias += cfg.vibration_drift;
        let temperature = self.state.thermal_temperature + self.state.sensor_temperature_bias;
        let vibration = vibration + self.state.sensor_vibration_bias;

        // --- Gaussian noise ---
        let temperature =
            add_gaussian(temperature, cfg.noise_temperature * noise_scale, rng);
        let vibration = add_gaussian(vibration, cfg.noise_vibration * noise_scale, rng);
        let current = add_gaussian(current, cfg.noise_current * noise_scale, rng);
        let rpm = add_gaussian(rpm, cfg.noise_rpm * noise_scale, rng);

        // --- Spikes: vibration only ---
        let vibration = add_spike(vibration, cfg.spike_prob, cfg.vibration_spike, rng);

        // --- Missing data ---
        let temperature = maybe_drop(temperature, cfg.drop_prob, rng);
        let vibration = maybe_drop(vibration, cfg.drop_prob, rng);
        let current = maybe_drop(current, cfg.drop_prob, rng);
        let rpm = maybe_drop(rpm, cfg.drop_prob, rng);

        // --- Stateful imperfections ---
        self.imperfections.update(cfg, rng);
        let temperature = self
            .imperfections
            .apply(SensorChannel::Temperature, temperature, rng);
        let vibration = self
            .imperfections
            .apply(SensorChannel::Vibration, vibration, rng);
        let current = self.imperfections.apply(SensorChannel::Current, current, rng);
        let rpm = self.imperfections.apply(SensorChannel::Rpm, rpm, rng);

        // Temperature readings stay within the physically plausible band
        // even under accumulated drift.
        let temperature = temperature
            .map(|t| clamp_temperature(t, cfg.ambient_temp, cfg.critical_temperature));

        Ok(SensorFrame {
            temperature,
            vibration,
            current,
            rpm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::determine_stage;
    use crate::rng::run_rng;

    #[test]
    fn window_starts_non_empty_and_tracks_latest() {
        let mut w = HealthWindow::new(0.95);
        assert_eq!(w.len(), 1);
        assert!((w.latest() - 0.95).abs() < 1e-12);
        w.push(0.90);
        assert!((w.latest() - 0.90).abs() < 1e-12);
    }

    #[test]
    fn window_caps_at_capacity() {
        let mut w = HealthWindow::new(1.0);
        for i in 0..100 {
            w.push(f64::from(i));
        }
        assert_eq!(w.len(), HEALTH_WINDOW_CAPACITY);
        assert!((w.latest() - 99.0).abs() < 1e-12);
    }

    #[test]
    fn mean_of_last_averages_newest_entries() {
        let mut w = HealthWindow::new(1.0);
        w.push(0.8);
        w.push(0.6);
        // Last two entries: 0.8, 0.6.
        assert!((w.mean_of_last(2) - 0.7).abs() < 1e-12);
        // Window larger than history falls back to everything.
        assert!((w.mean_of_last(10) - (1.0 + 0.8 + 0.6) / 3.0).abs() < 1e-12);
        // Window of zero is treated as one.
        assert!((w.mean_of_last(0) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn new_motor_satisfies_invariants() {
        let cfg = BaseConfig::default();
        let mut rng = run_rng(Some(41));
        for id in 0..20 {
            let motor = Motor::new(id, &cfg, 1.0, 1.0, &mut rng);
            let s = &motor.state;
            assert_eq!(s.motor_id, id);
            assert!((0.0..=1.0).contains(&s.motor_health));
            assert!(s.motor_health >= cfg.stage0_base_health - 0.02);
            let sum = s.stage0_duration_hours + s.stage1_duration_hours + s.stage2_duration_hours;
            assert!((sum - s.target_hours_to_critical).abs() < 1e-9);
            assert!(s.load_factor > 0.0);
            assert!(s.misalignment >= 0.0);
            assert!(!s.health_window.is_empty());
        }
    }

    #[test]
    fn stepping_preserves_state_invariants() {
        let cfg = BaseConfig::default();
        let mut rng = run_rng(Some(42));
        let mut motor = Motor::new(0, &cfg, 1.0, 50.0, &mut rng);
        for _ in 0..2000 {
            motor.step(&cfg, 1.0, 1.0, 1.0, &mut rng).unwrap();
            let s = &motor.state;
            assert!((0.0..=1.0).contains(&s.motor_health));
            assert_eq!(
                s.degradation_stage,
                determine_stage(
                    s.hours_since_maintenance,
                    s.stage0_duration_hours,
                    s.stage1_duration_hours
                )
            );
            assert!(s.friction_coeff >= cfg.base_friction);
            assert!(!s.health_window.is_empty());
        }
        // Hours advanced by exactly one step per tick.
        let expected = 2000.0 * cfg.time_step_hours();
        assert!((motor.state.hours_since_maintenance - expected).abs() < 1e-6);
    }

    #[test]
    fn temperature_reading_respects_plausibility_band() {
        let cfg = BaseConfig::default();
        let mut rng = run_rng(Some(43));
        let mut motor = Motor::new(0, &cfg, 1.0, 20.0, &mut rng);
        for _ in 0..3000 {
            let frame = motor.step(&cfg, 1.0, 1.0, 1.0, &mut rng).unwrap();
            if let Some(t) = frame.temperature {
                assert!(t >= cfg.ambient_temp - 1e-9);
                assert!(t <= cfg.critical_temperature + 10.0 + 1e-9);
            }
        }
    }

    #[test]
    fn reset_cycle_restarts_the_clock_with_fresh_profile() {
        let cfg = BaseConfig::default();
        let mut rng = run_rng(Some(44));
        let mut motor = Motor::new(0, &cfg, 1.0, 1.0, &mut rng);
        for _ in 0..100 {
            motor.step(&cfg, 1.0, 1.0, 1.0, &mut rng).unwrap();
        }
        let old_target = motor.state.target_hours_to_critical;
        motor.reset_cycle(&cfg, 1.0, 0.94, &mut rng);
        let s = &motor.state;
        assert_eq!(s.hours_since_maintenance, 0.0);
        assert_eq!(s.degradation_stage, DegradationStage::Stage0);
        assert_eq!(s.health_state, HealthState::Healthy);
        assert!((s.motor_health - 0.94).abs() < 1e-12);
        assert_eq!(s.health_window.len(), 1);
        // New lifespan sampled; a collision is astronomically unlikely.
        assert!((s.target_hours_to_critical - old_target).abs() > 1e-9);
    }

    #[test]
    fn inject_failure_forces_critical_state() {
        let cfg = BaseConfig::default();
        let mut rng = run_rng(Some(45));
        let mut motor = Motor::new(0, &cfg, 1.0, 1.0, &mut rng);
        motor.inject_failure(&cfg);
        assert!((motor.state.motor_health - 0.1).abs() < 1e-12);
        assert_eq!(motor.state.health_state, HealthState::Critical);
        assert!((motor.state.health_window.latest() - 0.1).abs() < 1e-12);
    }
}
