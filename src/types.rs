//! Shared data structures for the fleet simulation engine.
//!
//! - [`HealthState`], [`DegradationStage`], [`OperatingRegime`],
//!   [`MaintenanceKind`]: closed enums; external serialisation names them
//!   with strings, internal code dispatches on the tag.
//! - [`Observation`]: one record per motor per tick, CSV-stable field order.
//! - [`MaintenanceEvent`]: append-only log entry for every intervention.
//! - Read-only views: [`EngineStatus`], [`Alert`], [`PendingDecision`],
//!   [`FailedMotor`].

use serde::{Deserialize, Serialize};

// ============================================================================
// Categorical states
// ============================================================================

/// Categorical view of a motor's continuous health value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
pub enum HealthState {
    #[default]
    Healthy,
    Warning,
    Critical,
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthState::Healthy => write!(f, "Healthy"),
            HealthState::Warning => write!(f, "Warning"),
            HealthState::Critical => write!(f, "Critical"),
        }
    }
}

/// Lifecycle stage, determined by elapsed operating hours against the
/// motor's three sampled stage durations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
pub enum DegradationStage {
    /// Healthy plateau, typically 70-85% of life.
    #[default]
    Stage0,
    /// Power-law damage growth, typically 12-22% of life.
    Stage1,
    /// Exponential collapse, the remainder.
    Stage2,
}

impl DegradationStage {
    /// Numeric index used in exported datasets.
    pub fn index(self) -> u8 {
        match self {
            DegradationStage::Stage0 => 0,
            DegradationStage::Stage1 => 1,
            DegradationStage::Stage2 => 2,
        }
    }
}

impl std::fmt::Display for DegradationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Stage{}", self.index())
    }
}

/// Process-wide operating mode driven by a fixed-matrix Markov chain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OperatingRegime {
    Idle,
    #[default]
    Normal,
    Peak,
}

impl std::fmt::Display for OperatingRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperatingRegime::Idle => write!(f, "idle"),
            OperatingRegime::Normal => write!(f, "normal"),
            OperatingRegime::Peak => write!(f, "peak"),
        }
    }
}

/// Maintenance intervention types, each with fixed side effects on the
/// motor's hidden state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceKind {
    /// Major intervention: health restored to 0.75-0.90, misalignment and
    /// friction partially reset.
    BearingReplacement,
    /// Minor intervention: +0.10 health, friction reduced.
    Lubrication,
    /// Misalignment halved, small health boost.
    Alignment,
    /// Full cycle reset: fresh lifespan, stage durations and exponent;
    /// increments the motor's cycle counter.
    AutomaticMaintenance,
}

impl std::fmt::Display for MaintenanceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaintenanceKind::BearingReplacement => write!(f, "bearing_replacement"),
            MaintenanceKind::Lubrication => write!(f, "lubrication"),
            MaintenanceKind::Alignment => write!(f, "alignment"),
            MaintenanceKind::AutomaticMaintenance => write!(f, "automatic_maintenance"),
        }
    }
}

// ============================================================================
// Emitted records
// ============================================================================

/// One observation record, emitted per motor per tick.
///
/// Field order is the exported dataset's column order. Sensor channels are
/// `Option<f64>`: `None` is a missing reading (drop-out or intermittent
/// sensor failure), which is distinct from zero and is not an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    /// Global tick at which the record was produced.
    pub time: u64,
    pub motor_id: u32,
    /// Completed-cycle index for this motor (0-based).
    pub cycle_id: u32,
    /// Hidden health in [0, 1]; 1 = perfect, 0 = failed.
    pub motor_health: f64,
    pub health_state: HealthState,
    pub degradation_stage: DegradationStage,

    // === Sensor channels ===
    pub temperature: Option<f64>,
    pub vibration: Option<f64>,
    pub current: Option<f64>,
    pub rpm: Option<f64>,

    pub hours_since_maintenance: f64,
    pub regime: OperatingRegime,
    /// Set on the tick a maintenance intervention was applied.
    pub maintenance_event: Option<MaintenanceKind>,
}

impl Observation {
    /// Column names in the exported order.
    pub const FIELD_NAMES: [&'static str; 13] = [
        "time",
        "motor_id",
        "cycle_id",
        "motor_health",
        "health_state",
        "degradation_stage",
        "temperature",
        "vibration",
        "current",
        "rpm",
        "hours_since_maintenance",
        "regime",
        "maintenance_event",
    ];
}

/// Log entry recorded for every maintenance intervention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaintenanceEvent {
    pub tick: u64,
    pub motor_id: u32,
    pub pre_health: f64,
    pub post_health: f64,
    pub kind: MaintenanceKind,
}

// ============================================================================
// Read-only views
// ============================================================================

/// Snapshot of the engine's aggregate state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub time: u64,
    pub regime: OperatingRegime,
    pub num_motors: u32,
    /// Motors currently advancing (not paused, failed, or cycle-complete).
    pub active_motors: u32,
    pub paused_motors: u32,
    pub failed_motors: u32,
    pub history_records: usize,
    pub maintenance_events: usize,
}

/// Alert severity tiers for the derived alert view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
    ActionRequired,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Info => write!(f, "Info"),
            AlertSeverity::Warning => write!(f, "Warning"),
            AlertSeverity::Critical => write!(f, "Critical"),
            AlertSeverity::ActionRequired => write!(f, "Action Required"),
        }
    }
}

/// Derived alert for a motor whose latest record crossed a reporting
/// threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub motor_id: u32,
    pub severity: AlertSeverity,
    pub message: String,
    pub tick: u64,
    pub value: f64,
}

/// A live-mode motor paused below the alert threshold and awaiting an
/// operator decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingDecision {
    pub motor_id: u32,
    /// Health at the moment the motor was paused.
    pub health: f64,
    pub paused_at_tick: u64,
    /// Simulated hours the motor has been waiting.
    pub hours_paused: f64,
}

/// A live-mode motor marked failed by the operator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailedMotor {
    pub motor_id: u32,
    pub failure_tick: u64,
    pub health_at_failure: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_display_matches_export_names() {
        assert_eq!(HealthState::Warning.to_string(), "Warning");
        assert_eq!(DegradationStage::Stage2.to_string(), "Stage2");
        assert_eq!(OperatingRegime::Peak.to_string(), "peak");
        assert_eq!(
            MaintenanceKind::AutomaticMaintenance.to_string(),
            "automatic_maintenance"
        );
    }

    #[test]
    fn maintenance_kind_serializes_snake_case() {
        let json = serde_json::to_string(&MaintenanceKind::BearingReplacement).unwrap();
        assert_eq!(json, "\"bearing_replacement\"");
    }

    #[test]
    fn missing_sensor_serializes_as_null() {
        let obs = Observation {
            time: 7,
            motor_id: 1,
            cycle_id: 0,
            motor_health: 0.95,
            health_state: HealthState::Healthy,
            degradation_stage: DegradationStage::Stage0,
            temperature: Some(25.0),
            vibration: None,
            current: Some(10.0),
            rpm: Some(1800.0),
            hours_since_maintenance: 0.583,
            regime: OperatingRegime::Normal,
            maintenance_event: None,
        };
        let json = serde_json::to_value(&obs).unwrap();
        assert!(json["vibration"].is_null());
        assert_eq!(json["regime"], "normal");
    }

    #[test]
    fn stage_index_is_stable() {
        assert_eq!(DegradationStage::Stage0.index(), 0);
        assert_eq!(DegradationStage::Stage1.index(), 1);
        assert_eq!(DegradationStage::Stage2.index(), 2);
    }
}
