//! Public engine surface.
//!
//! The engine wraps the factory with mode orchestration and the read-only
//! views a consumer needs:
//!
//! - **Live mode** ([`live`]): interactive stepping; motors crossing the
//!   alert threshold are paused pending operator decisions
//!   (`mark_failed` / `perform_maintenance` / `restore`).
//! - **Batch mode** ([`batch`]): run until every motor reaches its
//!   cycle target, with chunked flushing and a memory guard.
//!
//! After a numeric error the engine halts: mutating calls fail, read-only
//! views keep working so the offending state can be inspected.

mod batch;
mod live;

pub use batch::{BatchOutcome, StopReason};

use std::collections::BTreeMap;

use crate::config::{BaseConfig, GenerationMode, RunConfig};
use crate::error::EngineError;
use crate::factory::Factory;
use crate::types::{
    Alert, AlertSeverity, EngineStatus, FailedMotor, MaintenanceEvent, Observation,
};

/// Vibration level above which the alert view reports a warning.
const ALERT_VIBRATION_LIMIT: f64 = 2.0;
/// Health at or below this is reported as a critical alert.
const ALERT_HEALTH_CRITICAL: f64 = 0.1;
/// Health at or below this is reported as a warning alert.
const ALERT_HEALTH_WARNING: f64 = 0.3;

/// Live-mode bookkeeping for a motor awaiting an operator decision.
#[derive(Debug, Clone)]
pub(crate) struct PausedMotor {
    pub(crate) health: f64,
    pub(crate) paused_at_tick: u64,
}

/// The simulation engine: factory, bounded history, and live-mode
/// decision state.
#[derive(Debug)]
pub struct Engine {
    factory: Factory,
    history: Vec<Observation>,
    paused: BTreeMap<u32, PausedMotor>,
    failed: BTreeMap<u32, FailedMotor>,
    halted: bool,
}

impl Engine {
    /// Validate the configs and prepare the fleet at tick 0.
    pub fn new(base: BaseConfig, run: RunConfig) -> Result<Self, EngineError> {
        Ok(Self {
            factory: Factory::new(base, run)?,
            history: Vec::new(),
            paused: BTreeMap::new(),
            failed: BTreeMap::new(),
            halted: false,
        })
    }

    pub fn mode(&self) -> GenerationMode {
        self.factory.run().mode
    }

    pub fn current_tick(&self) -> u64 {
        self.factory.time()
    }

    fn ensure_ready(&self) -> Result<(), EngineError> {
        if self.halted {
            return Err(EngineError::Precondition(
                "engine halted after a numeric error; only read-only views are available"
                    .to_string(),
            ));
        }
        Ok(())
    }

    fn ensure_mode(&self, mode: GenerationMode, operation: &str) -> Result<(), EngineError> {
        if self.mode() == mode {
            Ok(())
        } else {
            Err(EngineError::Precondition(format!(
                "{operation} requires {mode} mode, engine is in {} mode",
                self.mode()
            )))
        }
    }

    /// Record a fatal error and hand it back; mutating calls are refused
    /// from here on.
    fn halt_with(&mut self, err: EngineError) -> EngineError {
        self.halted = true;
        err
    }

    // ========================================================================
    // Stepping
    // ========================================================================

    /// Advance the fleet by up to `n` global ticks, returning the records
    /// produced. In live mode, motors crossing the alert threshold are
    /// moved to the paused set and their records withheld.
    pub fn step(&mut self, n: u32) -> Result<Vec<Observation>, EngineError> {
        self.ensure_ready()?;
        let mut produced = Vec::new();
        for _ in 0..n {
            let records = match self.factory.step() {
                Ok(records) => records,
                Err(err) => return Err(self.halt_with(err)),
            };
            let records = if self.mode() == GenerationMode::Live {
                self.absorb_live_records(records)?
            } else {
                records
            };
            produced.extend_from_slice(&records);
            self.history.extend(records);
        }
        self.truncate_history();
        Ok(produced)
    }

    /// Cap retained history at `max_history × num_motors` records, dropping
    /// the oldest prefix.
    fn truncate_history(&mut self) {
        let cap = self
            .factory
            .run()
            .max_history
            .saturating_mul(self.factory.run().num_motors as usize);
        if self.history.len() > cap {
            let excess = self.history.len() - cap;
            self.history.drain(..excess);
        }
    }

    // ========================================================================
    // Test hooks
    // ========================================================================

    /// Force a motor into a severely degraded condition.
    pub fn inject_failure(&mut self, motor_id: u32) -> Result<(), EngineError> {
        self.ensure_ready()?;
        self.factory.inject_failure(motor_id)
    }

    /// Apply a full automatic-maintenance reset to one motor. The event is
    /// logged and the motor's cycle counter advances, exactly as when the
    /// controller fires on its own.
    pub fn reset_motor(&mut self, motor_id: u32) -> Result<(), EngineError> {
        self.ensure_ready()?;
        self.factory.apply_automatic_maintenance(motor_id)
    }

    // ========================================================================
    // Read-only views
    // ========================================================================

    /// All retained records, oldest first.
    pub fn history(&self) -> &[Observation] {
        &self.history
    }

    /// Records from the last `last_n_ticks` global ticks.
    pub fn recent_history(&self, last_n_ticks: u64) -> Vec<Observation> {
        let min_time = self.factory.time().saturating_sub(last_n_ticks);
        self.history
            .iter()
            .filter(|r| r.time >= min_time)
            .cloned()
            .collect()
    }

    /// Every maintenance intervention recorded so far.
    pub fn maintenance_log(&self) -> &[MaintenanceEvent] {
        self.factory.maintenance_events()
    }

    pub fn maintenance_count_for(&self, motor_id: u32) -> usize {
        self.factory.maintenance_count_for(motor_id)
    }

    /// Aggregate engine snapshot.
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            time: self.factory.time(),
            regime: self.factory.current_regime(),
            num_motors: self.factory.run().num_motors,
            active_motors: self.factory.active_motors(),
            paused_motors: self.paused.len() as u32,
            failed_motors: self.failed.len() as u32,
            history_records: self.history.len(),
            maintenance_events: self.factory.maintenance_events().len(),
        }
    }

    /// Derive alerts from each motor's latest retained record, plus one
    /// action-required entry per pending decision.
    pub fn alerts(&self) -> Vec<Alert> {
        let mut latest: BTreeMap<u32, &Observation> = BTreeMap::new();
        for record in self.history.iter().rev() {
            latest.entry(record.motor_id).or_insert(record);
            if latest.len() as u32 == self.factory.run().num_motors {
                break;
            }
        }

        let alert_threshold = self.factory.run().alert_threshold;
        let temperature_limit = self.factory.base().critical_temperature + 10.0;
        let mut alerts = Vec::new();

        for (motor_id, record) in &latest {
            let health = record.motor_health;
            if health < alert_threshold {
                let severity = if health <= ALERT_HEALTH_CRITICAL {
                    AlertSeverity::Critical
                } else if health <= ALERT_HEALTH_WARNING {
                    AlertSeverity::Warning
                } else {
                    AlertSeverity::Info
                };
                alerts.push(Alert {
                    motor_id: *motor_id,
                    severity,
                    message: format!(
                        "motor {motor_id} health degraded ({:.1}%)",
                        health * 100.0
                    ),
                    tick: record.time,
                    value: health,
                });
            }
            if let Some(t) = record.temperature {
                if t >= temperature_limit {
                    alerts.push(Alert {
                        motor_id: *motor_id,
                        severity: AlertSeverity::Warning,
                        message: format!("motor {motor_id} temperature high ({t:.1}°C)"),
                        tick: record.time,
                        value: t,
                    });
                }
            }
            if let Some(v) = record.vibration {
                if v > ALERT_VIBRATION_LIMIT {
                    alerts.push(Alert {
                        motor_id: *motor_id,
                        severity: AlertSeverity::Warning,
                        message: format!("motor {motor_id} vibration excessive ({v:.2})"),
                        tick: record.time,
                        value: v,
                    });
                }
            }
        }

        for decision in self.pending_decisions() {
            alerts.push(Alert {
                motor_id: decision.motor_id,
                severity: AlertSeverity::ActionRequired,
                message: format!(
                    "motor {} requires a maintenance decision",
                    decision.motor_id
                ),
                tick: decision.paused_at_tick,
                value: decision.health,
            });
        }

        alerts
    }
}
