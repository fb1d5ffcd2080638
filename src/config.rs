//! Layered engine configuration.
//!
//! Two immutable records, both fully serde-(de)serializable so a TOML file
//! can override any subset of the defaults:
//!
//! - [`BaseConfig`]: physics constants, noise levels, stage fractions,
//!   thresholds, imperfection and maintenance probabilities. Shared by the
//!   whole fleet.
//! - [`RunConfig`]: per-run knobs — fleet size, cycle target, speed/load/
//!   noise multipliers, generation mode, seed, live-mode thresholds.
//!
//! Both validate physical ranges before the engine accepts them; a bad
//! value is a typed [`ConfigError`], not a warning.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ============================================================================
// Generation mode
// ============================================================================

/// How records are produced: interactively stepped with operator decisions,
/// or generated in one run until every motor reaches its cycle target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    #[default]
    Live,
    Batch,
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationMode::Live => write!(f, "live"),
            GenerationMode::Batch => write!(f, "batch"),
        }
    }
}

// ============================================================================
// Base configuration (physics & sensors)
// ============================================================================

/// Fleet-wide physics constants, sensor noise model, degradation shape
/// parameters and controller probabilities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BaseConfig {
    // === Environment ===
    /// Ambient temperature (°C); thermal baseline and lower clamp.
    pub ambient_temp: f64,
    /// Temperature readings are clamped to `[ambient, critical + 10]` (°C).
    pub critical_temperature: f64,

    // === Clock ===
    /// Simulated minutes per tick.
    pub time_step_minutes: f64,

    // === Degradation & friction ===
    pub base_friction: f64,
    pub k_friction: f64,
    /// Heat-generation coefficient in the thermal low-pass.
    pub alpha: f64,
    /// Cooling coefficient in the thermal low-pass.
    pub beta: f64,

    // === Lifespan & stage allocation ===
    pub min_hours_to_critical: f64,
    pub max_hours_to_critical: f64,
    pub stage0_min_pct: f64,
    pub stage0_max_pct: f64,
    pub stage1_min_pct: f64,
    pub stage1_max_pct: f64,
    pub stage1_power_exp_min: f64,
    pub stage1_power_exp_max: f64,
    /// Health plateau level during Stage 0.
    pub stage0_base_health: f64,
    /// Per-hour Gaussian sigma of the Stage 0 plateau.
    pub stage0_noise_std: f64,

    // === Categorical thresholds ===
    /// Health at or above this is `Healthy`.
    pub warning_threshold: f64,
    /// Health below this is `Critical`; must stay below `warning_threshold`.
    pub critical_threshold: f64,

    // === Vibration ===
    pub v_base: f64,
    pub k_v_health: f64,
    pub k_v_align: f64,
    /// Seconds of sub-sampling aggregated into one RMS reading.
    pub vibration_sample_duration: u32,
    /// Sub-samples per second.
    pub vibration_sample_rate: u32,

    // === Electrical ===
    pub base_current: f64,
    pub k_current: f64,

    // === RPM ===
    pub nominal_rpm: f64,

    // === Sensor noise (Gaussian sigma per channel) ===
    pub noise_temperature: f64,
    pub noise_vibration: f64,
    pub noise_current: f64,
    pub noise_rpm: f64,

    // === Spikes (vibration only) ===
    pub spike_prob: f64,
    pub vibration_spike: f64,

    // === Missing data ===
    /// Independent per-channel drop probability per tick.
    pub drop_prob: f64,

    // === Cumulative sensor drift ===
    pub temp_drift: f64,
    pub vibration_drift: f64,

    // === Stateful sensor imperfections ===
    pub enable_sensor_imperfections: bool,
    pub drift_start_prob: f64,
    pub flatline_start_prob: f64,
    pub intermittent_prob: f64,

    // === Maintenance controller ===
    /// Reactive bearing replacement considered below this health (live mode).
    pub reactive_threshold: f64,
    pub reactive_prob_per_step: f64,
    /// Scheduled lubrication window recurs every this many ticks.
    pub scheduled_interval: u64,
    /// Width of the scheduled window in ticks.
    pub scheduled_window: u64,
    pub scheduled_prob: f64,

    // === Operating regimes ===
    pub enable_regimes: bool,
    /// Base dwell length per regime in ticks, jittered ±20% per dwell.
    pub regime_base_duration_ticks: u64,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            ambient_temp: 25.0,
            critical_temperature: 80.0,
            time_step_minutes: 5.0,
            base_friction: 0.05,
            k_friction: 0.4,
            alpha: 0.8,
            beta: 0.1,
            min_hours_to_critical: 1000.0,
            max_hours_to_critical: 3000.0,
            stage0_min_pct: 0.70,
            stage0_max_pct: 0.85,
            stage1_min_pct: 0.12,
            stage1_max_pct: 0.22,
            stage1_power_exp_min: 1.5,
            stage1_power_exp_max: 3.5,
            stage0_base_health: 0.95,
            stage0_noise_std: 0.01,
            warning_threshold: 0.7,
            critical_threshold: 0.4,
            v_base: 0.5,
            k_v_health: 6.0,
            k_v_align: 3.0,
            vibration_sample_duration: 20,
            vibration_sample_rate: 10,
            base_current: 10.0,
            k_current: 1.2,
            nominal_rpm: 1800.0,
            noise_temperature: 0.6,
            noise_vibration: 0.15,
            noise_current: 0.4,
            noise_rpm: 8.0,
            spike_prob: 0.005,
            vibration_spike: 3.0,
            drop_prob: 0.01,
            temp_drift: 5e-4,
            vibration_drift: 2e-4,
            enable_sensor_imperfections: true,
            drift_start_prob: 0.002,
            flatline_start_prob: 0.0005,
            intermittent_prob: 0.001,
            reactive_threshold: 0.25,
            reactive_prob_per_step: 0.15,
            scheduled_interval: 500,
            scheduled_window: 10,
            scheduled_prob: 0.10,
            enable_regimes: true,
            regime_base_duration_ticks: 100,
        }
    }
}

impl BaseConfig {
    /// Simulated hours advanced per tick.
    pub fn time_step_hours(&self) -> f64 {
        self.time_step_minutes / 60.0
    }

    /// Check all physical ranges. Returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.warning_threshold <= self.critical_threshold {
            return Err(ConfigError::ThresholdOrder {
                warning: self.warning_threshold,
                critical: self.critical_threshold,
            });
        }

        // The temperature clamp band must be non-empty.
        if self.ambient_temp > self.critical_temperature + 10.0 {
            return Err(ConfigError::BoundsOrder {
                field: "temperature_band",
                min: self.ambient_temp,
                max: self.critical_temperature + 10.0,
            });
        }

        for (field, value) in [
            ("time_step_minutes", self.time_step_minutes),
            ("min_hours_to_critical", self.min_hours_to_critical),
            ("base_current", self.base_current),
            ("nominal_rpm", self.nominal_rpm),
            ("stage0_base_health", self.stage0_base_health),
            ("warning_threshold", self.warning_threshold),
            ("critical_threshold", self.critical_threshold),
            ("stage1_power_exp_min", self.stage1_power_exp_min),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        for (field, value) in [
            ("vibration_sample_duration", f64::from(self.vibration_sample_duration)),
            ("vibration_sample_rate", f64::from(self.vibration_sample_rate)),
            ("scheduled_interval", self.scheduled_interval as f64),
            ("regime_base_duration_ticks", self.regime_base_duration_ticks as f64),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }

        for (field, value) in [
            ("alpha", self.alpha),
            ("beta", self.beta),
            ("base_friction", self.base_friction),
            ("k_friction", self.k_friction),
            ("v_base", self.v_base),
            ("k_v_health", self.k_v_health),
            ("k_v_align", self.k_v_align),
            ("k_current", self.k_current),
            ("noise_temperature", self.noise_temperature),
            ("noise_vibration", self.noise_vibration),
            ("noise_current", self.noise_current),
            ("noise_rpm", self.noise_rpm),
            ("vibration_spike", self.vibration_spike),
            ("temp_drift", self.temp_drift),
            ("vibration_drift", self.vibration_drift),
            ("stage0_noise_std", self.stage0_noise_std),
        ] {
            if value < 0.0 {
                return Err(ConfigError::Negative { field, value });
            }
        }

        for (field, value) in [
            ("spike_prob", self.spike_prob),
            ("drop_prob", self.drop_prob),
            ("drift_start_prob", self.drift_start_prob),
            ("flatline_start_prob", self.flatline_start_prob),
            ("intermittent_prob", self.intermittent_prob),
            ("reactive_prob_per_step", self.reactive_prob_per_step),
            ("scheduled_prob", self.scheduled_prob),
            ("reactive_threshold", self.reactive_threshold),
            ("stage0_min_pct", self.stage0_min_pct),
            ("stage0_max_pct", self.stage0_max_pct),
            ("stage1_min_pct", self.stage1_min_pct),
            ("stage1_max_pct", self.stage1_max_pct),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Probability { field, value });
            }
        }

        for (field, min, max) in [
            (
                "hours_to_critical",
                self.min_hours_to_critical,
                self.max_hours_to_critical,
            ),
            ("stage0_pct", self.stage0_min_pct, self.stage0_max_pct),
            ("stage1_pct", self.stage1_min_pct, self.stage1_max_pct),
            (
                "stage1_power_exp",
                self.stage1_power_exp_min,
                self.stage1_power_exp_max,
            ),
        ] {
            if min > max {
                return Err(ConfigError::BoundsOrder { field, min, max });
            }
        }

        // Stage 2 must keep a non-empty share of the lifespan even when both
        // sampled fractions land on their upper bounds.
        let total = self.stage0_max_pct + self.stage1_max_pct;
        if total >= 1.0 {
            return Err(ConfigError::StageFractions { total });
        }

        Ok(())
    }
}

// ============================================================================
// Run configuration
// ============================================================================

/// Per-run knobs applied on top of [`BaseConfig`] at engine init.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    /// Fleet size.
    pub num_motors: u32,
    /// Automatic maintenances each motor must accumulate in batch mode.
    pub target_maintenance_cycles: u32,
    /// Scales all stage durations by its reciprocal; >1 ages motors faster.
    pub degradation_speed: f64,
    /// Global load multiplier applied to every motor at init.
    pub load_factor: f64,
    /// Global multiplier on all sensor noise sigmas.
    pub noise_level: f64,
    pub mode: GenerationMode,
    /// Seed for the run's random source; `None` draws one from OS entropy.
    pub seed: Option<u64>,
    /// Live-mode history cap, in retained ticks per motor.
    pub max_history: usize,
    /// Live mode pauses a motor once its health reaches this level.
    pub alert_threshold: f64,
    /// Master switch for the maintenance controller.
    pub auto_maintenance_enabled: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            num_motors: 5,
            target_maintenance_cycles: 1,
            degradation_speed: 1.0,
            load_factor: 1.0,
            noise_level: 1.0,
            mode: GenerationMode::Live,
            seed: None,
            max_history: 100_000,
            alert_threshold: 0.3,
            auto_maintenance_enabled: true,
        }
    }
}

impl RunConfig {
    /// Check all per-run ranges. Returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_motors == 0 {
            return Err(ConfigError::NonPositive {
                field: "num_motors",
                value: 0.0,
            });
        }
        if self.target_maintenance_cycles == 0 {
            return Err(ConfigError::NonPositive {
                field: "target_maintenance_cycles",
                value: 0.0,
            });
        }
        if self.max_history == 0 {
            return Err(ConfigError::NonPositive {
                field: "max_history",
                value: 0.0,
            });
        }
        for (field, value) in [
            ("degradation_speed", self.degradation_speed),
            ("load_factor", self.load_factor),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        if self.noise_level < 0.0 {
            return Err(ConfigError::Negative {
                field: "noise_level",
                value: self.noise_level,
            });
        }
        if !(0.0..=1.0).contains(&self.alert_threshold) {
            return Err(ConfigError::Probability {
                field: "alert_threshold",
                value: self.alert_threshold,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        BaseConfig::default().validate().unwrap();
        RunConfig::default().validate().unwrap();
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let cfg = BaseConfig {
            warning_threshold: 0.3,
            critical_threshold: 0.4,
            ..BaseConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ThresholdOrder { .. })
        ));
    }

    #[test]
    fn stage_fractions_must_leave_room_for_stage2() {
        let cfg = BaseConfig {
            stage0_max_pct: 0.85,
            stage1_max_pct: 0.20,
            ..BaseConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::StageFractions { .. })
        ));
    }

    #[test]
    fn empty_temperature_band_rejected() {
        let cfg = BaseConfig {
            ambient_temp: 120.0,
            critical_temperature: 80.0,
            ..BaseConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::BoundsOrder { .. })));
    }

    #[test]
    fn negative_probability_rejected() {
        let cfg = BaseConfig {
            drop_prob: -0.1,
            ..BaseConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Probability { .. })));
    }

    #[test]
    fn zero_motor_fleet_rejected() {
        let run = RunConfig {
            num_motors: 0,
            ..RunConfig::default()
        };
        assert!(run.validate().is_err());
    }

    #[test]
    fn toml_override_keeps_unlisted_defaults() {
        let cfg: BaseConfig = toml::from_str(
            r#"
            drop_prob = 0.05
            enable_sensor_imperfections = false
            "#,
        )
        .unwrap();
        assert!((cfg.drop_prob - 0.05).abs() < 1e-12);
        assert!(!cfg.enable_sensor_imperfections);
        // Untouched fields fall back to defaults.
        assert!((cfg.ambient_temp - 25.0).abs() < 1e-12);
    }

    #[test]
    fn run_config_mode_parses_lowercase() {
        let run: RunConfig = toml::from_str("mode = \"batch\"").unwrap();
        assert_eq!(run.mode, GenerationMode::Batch);
    }

    #[test]
    fn time_step_hours_from_minutes() {
        let cfg = BaseConfig::default();
        assert!((cfg.time_step_hours() - 5.0 / 60.0).abs() < 1e-12);
    }
}
