//! Live-mode decision flow.
//!
//! Stepping in live mode watches every emitted record: a motor whose
//! health reaches the operator's alert threshold is removed from the
//! iteration set and withheld from output until a decision arrives.
//! `perform_maintenance` applies a full-recovery overhaul and resumes the
//! motor; `mark_failed` silences it until an explicit `restore`, which
//! re-initialises it at the current global tick.

use tracing::debug;

use crate::config::GenerationMode;
use crate::error::EngineError;
use crate::types::{FailedMotor, Observation, PendingDecision};

use super::{Engine, PausedMotor};

impl Engine {
    /// Filter one tick's records: suspend motors crossing the alert
    /// threshold and withhold their records; drop records from motors that
    /// are already paused or failed.
    pub(super) fn absorb_live_records(
        &mut self,
        records: Vec<Observation>,
    ) -> Result<Vec<Observation>, EngineError> {
        let alert_threshold = self.factory.run().alert_threshold;
        let mut kept = Vec::with_capacity(records.len());

        for record in records {
            let motor_id = record.motor_id;
            if self.paused.contains_key(&motor_id) || self.failed.contains_key(&motor_id) {
                continue;
            }
            if record.motor_health <= alert_threshold {
                self.factory.suspend_motor(motor_id)?;
                self.paused.insert(
                    motor_id,
                    PausedMotor {
                        health: record.motor_health,
                        paused_at_tick: record.time,
                    },
                );
                debug!(
                    motor_id,
                    health = record.motor_health,
                    "motor paused pending operator decision"
                );
                continue;
            }
            kept.push(record);
        }

        Ok(kept)
    }

    /// Operator decision: declare a paused motor failed. It stays silent
    /// until restored.
    pub fn mark_failed(&mut self, motor_id: u32) -> Result<(), EngineError> {
        self.ensure_ready()?;
        self.ensure_mode(GenerationMode::Live, "mark_failed")?;
        let paused = self.paused.remove(&motor_id).ok_or_else(|| {
            EngineError::Precondition(format!("motor {motor_id} is not awaiting a decision"))
        })?;
        self.failed.insert(
            motor_id,
            FailedMotor {
                motor_id,
                failure_tick: self.factory.time(),
                health_at_failure: paused.health,
            },
        );
        debug!(motor_id, "motor marked failed");
        Ok(())
    }

    /// Operator decision: overhaul a paused motor and resume emission.
    pub fn perform_maintenance(&mut self, motor_id: u32) -> Result<(), EngineError> {
        self.ensure_ready()?;
        self.ensure_mode(GenerationMode::Live, "perform_maintenance")?;
        if self.paused.remove(&motor_id).is_none() {
            return Err(EngineError::Precondition(format!(
                "motor {motor_id} is not awaiting a decision"
            )));
        }
        self.factory.apply_operator_overhaul(motor_id)?;
        self.factory.resume_motor(motor_id)?;
        debug!(motor_id, "motor overhauled and resumed");
        Ok(())
    }

    /// Re-initialise an explicitly failed motor with fresh health,
    /// synchronised to the current global tick.
    pub fn restore(&mut self, motor_id: u32) -> Result<(), EngineError> {
        self.ensure_ready()?;
        self.ensure_mode(GenerationMode::Live, "restore")?;
        if self.failed.remove(&motor_id).is_none() {
            return Err(EngineError::Precondition(format!(
                "motor {motor_id} is not marked failed"
            )));
        }
        self.factory.apply_operator_overhaul(motor_id)?;
        self.factory.resume_motor(motor_id)?;
        debug!(motor_id, "motor restored");
        Ok(())
    }

    /// Motors paused below the alert threshold, waiting for a decision.
    pub fn pending_decisions(&self) -> Vec<PendingDecision> {
        let hours_per_tick = self.factory.base().time_step_hours();
        let now = self.factory.time();
        self.paused
            .iter()
            .map(|(motor_id, info)| PendingDecision {
                motor_id: *motor_id,
                health: info.health,
                paused_at_tick: info.paused_at_tick,
                hours_paused: (now - info.paused_at_tick) as f64 * hours_per_tick,
            })
            .collect()
    }

    /// Motors the operator has declared failed.
    pub fn failed_motors(&self) -> Vec<FailedMotor> {
        self.failed.values().cloned().collect()
    }
}
