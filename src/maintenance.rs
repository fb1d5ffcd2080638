//! Maintenance controller.
//!
//! Three triggers, evaluated in order by the fleet scheduler:
//!
//! 1. **Reactive** (live mode): a critical-health motor gets a bearing
//!    replacement with a per-step probability.
//! 2. **Scheduled**: within a small window around every scheduled interval,
//!    a lubrication happens with a small probability.
//! 3. **Automatic-on-critical** (batch mode): the moment a motor enters
//!    `Critical`, an automatic maintenance is scheduled 1..=288 ticks
//!    ahead; it fires once the clock reaches it and health has fallen
//!    below the repair gate, fully resetting the motor's cycle.
//!
//! The controller holds motor *ids*, never motor references; motor state
//! arrives through call parameters from the factory, so the event log
//! stays the single source of truth for interventions.

use std::collections::BTreeMap;

use rand::Rng;
use tracing::debug;

use crate::config::BaseConfig;
use crate::motor::Motor;
use crate::physics::determine_health_state;
use crate::rng::uniform;
use crate::types::{HealthState, MaintenanceEvent, MaintenanceKind};

/// Automatic maintenance only fires once health has fallen below this.
const AUTO_HEALTH_GATE: f64 = 0.30;
/// Maximum scheduling delay after critical entry: 288 five-minute ticks,
/// i.e. one simulated day.
const AUTO_DELAY_MAX_TICKS: u64 = 288;

#[derive(Debug, Clone)]
pub struct MaintenanceController {
    enabled: bool,
    /// Reactive bearing replacements happen in live mode only.
    reactive_enabled: bool,
    /// Automatic cycle resets happen in batch mode only.
    automatic_enabled: bool,
    events: Vec<MaintenanceEvent>,
    /// Pending automatic maintenance, keyed by motor id → due tick.
    auto_due: BTreeMap<u32, u64>,
    /// Last seen categorical state per motor, for critical-entry detection.
    previous_state: BTreeMap<u32, HealthState>,
}

impl MaintenanceController {
    pub fn new(enabled: bool, reactive_enabled: bool, automatic_enabled: bool) -> Self {
        Self {
            enabled,
            reactive_enabled,
            automatic_enabled,
            events: Vec::new(),
            auto_due: BTreeMap::new(),
            previous_state: BTreeMap::new(),
        }
    }

    /// Track a motor's categorical state. On a transition into `Critical`
    /// with nothing already scheduled, draw a delay and schedule an
    /// automatic maintenance.
    pub fn observe_health_state(
        &mut self,
        motor_id: u32,
        state: HealthState,
        tick: u64,
        rng: &mut impl Rng,
    ) {
        if self.enabled && self.automatic_enabled {
            let prev = self.previous_state.get(&motor_id).copied();
            if prev != Some(HealthState::Critical)
                && state == HealthState::Critical
                && !self.auto_due.contains_key(&motor_id)
            {
                let due = tick + rng.gen_range(1..=AUTO_DELAY_MAX_TICKS);
                self.auto_due.insert(motor_id, due);
                debug!(motor_id, due, "automatic maintenance scheduled");
            }
        }
        self.previous_state.insert(motor_id, state);
    }

    /// Whether a scheduled automatic maintenance is due for this motor at
    /// this tick. The schedule persists until both the clock and the
    /// health gate agree.
    pub fn automatic_due(&self, motor_id: u32, tick: u64, motor_health: f64) -> bool {
        self.enabled
            && self.automatic_enabled
            && motor_health < AUTO_HEALTH_GATE
            && self
                .auto_due
                .get(&motor_id)
                .is_some_and(|due| tick >= *due)
    }

    /// Reactive and scheduled triggers, evaluated in that order.
    pub fn decide(
        &self,
        tick: u64,
        motor_health: f64,
        cfg: &BaseConfig,
        rng: &mut impl Rng,
    ) -> Option<MaintenanceKind> {
        if !self.enabled {
            return None;
        }
        if self.reactive_enabled
            && motor_health < cfg.reactive_threshold
            && rng.gen::<f64>() < cfg.reactive_prob_per_step
        {
            return Some(MaintenanceKind::BearingReplacement);
        }
        if tick % cfg.scheduled_interval < cfg.scheduled_window
            && rng.gen::<f64>() < cfg.scheduled_prob
        {
            return Some(MaintenanceKind::Lubrication);
        }
        None
    }

    /// Apply a maintenance intervention to a motor and record the event.
    pub fn apply(
        &mut self,
        motor: &mut Motor,
        kind: MaintenanceKind,
        tick: u64,
        cfg: &BaseConfig,
        degradation_speed: f64,
        rng: &mut impl Rng,
    ) {
        let motor_id = motor.state.motor_id;
        let pre_health = motor.state.motor_health;

        match kind {
            MaintenanceKind::BearingReplacement => {
                motor.state.motor_health = uniform(rng, 0.75, 0.90);
                motor.state.misalignment *= 0.3;
                motor.state.friction_coeff = cfg.base_friction * 1.1;
            }
            MaintenanceKind::Lubrication => {
                motor.state.motor_health = (motor.state.motor_health + 0.10).min(1.0);
                motor.state.friction_coeff *= 0.8;
            }
            MaintenanceKind::Alignment => {
                motor.state.misalignment *= 0.5;
                motor.state.motor_health = (motor.state.motor_health + 0.05).min(1.0);
            }
            MaintenanceKind::AutomaticMaintenance => {
                let new_health = uniform(
                    rng,
                    cfg.stage0_base_health - 0.02,
                    cfg.stage0_base_health,
                );
                motor.reset_cycle(cfg, degradation_speed, new_health, rng);
                motor.state.misalignment *= 0.3;
                motor.state.friction_coeff = cfg.base_friction * 1.1;
                motor.cycle_id += 1;
                self.auto_due.remove(&motor_id);
                self.previous_state.insert(motor_id, HealthState::Healthy);
            }
        }

        if kind != MaintenanceKind::AutomaticMaintenance {
            motor.state.health_state = determine_health_state(
                motor.state.motor_health,
                cfg.warning_threshold,
                cfg.critical_threshold,
            );
            motor.state.health_window.push(motor.state.motor_health);
        }

        let post_health = motor.state.motor_health;
        debug!(motor_id, %kind, pre_health, post_health, "maintenance applied");
        self.events.push(MaintenanceEvent {
            tick,
            motor_id,
            pre_health,
            post_health,
            kind,
        });
    }

    /// Operator-driven overhaul from a live-mode decision: an
    /// alignment-class intervention with full recovery and a fresh cycle.
    pub fn apply_operator_overhaul(
        &mut self,
        motor: &mut Motor,
        tick: u64,
        cfg: &BaseConfig,
        degradation_speed: f64,
        rng: &mut impl Rng,
    ) {
        let motor_id = motor.state.motor_id;
        let pre_health = motor.state.motor_health;

        motor.reset_cycle(cfg, degradation_speed, 1.0, rng);
        motor.state.misalignment *= 0.5;
        motor.state.friction_coeff = cfg.base_friction;
        self.auto_due.remove(&motor_id);
        self.previous_state.insert(motor_id, HealthState::Healthy);

        debug!(motor_id, pre_health, "operator overhaul applied");
        self.events.push(MaintenanceEvent {
            tick,
            motor_id,
            pre_health,
            post_health: motor.state.motor_health,
            kind: MaintenanceKind::Alignment,
        });
    }

    pub fn events(&self) -> &[MaintenanceEvent] {
        &self.events
    }

    pub fn count_for(&self, motor_id: u32) -> usize {
        self.events.iter().filter(|e| e.motor_id == motor_id).count()
    }

    /// Drop the event log and all scheduling state (batch restart).
    pub fn reset(&mut self) {
        self.events.clear();
        self.auto_due.clear();
        self.previous_state.clear();
    }
}
