//! Fleet scheduler.
//!
//! The factory exclusively owns the motors, the run's random source, the
//! regime controller and the maintenance controller. `step()` executes
//! exactly one global tick: advance the regime, then for each active motor
//! detect critical entry, apply any due maintenance *before* the physics
//! update, scale load by the regime for the duration of the step, run the
//! degradation and observation kernels, and emit one record.
//!
//! Everything escaping the factory is a value; no mutable alias of motor
//! state leaves this module.

use rand::rngs::StdRng;
use tracing::debug;

use crate::config::{BaseConfig, GenerationMode, RunConfig};
use crate::error::EngineError;
use crate::maintenance::MaintenanceController;
use crate::motor::Motor;
use crate::regime::RegimeController;
use crate::rng::run_rng;
use crate::types::{HealthState, MaintenanceEvent, MaintenanceKind, Observation, OperatingRegime};

#[derive(Debug)]
pub struct Factory {
    base: BaseConfig,
    run: RunConfig,
    rng: StdRng,
    motors: Vec<Motor>,
    regime: RegimeController,
    maintenance: MaintenanceController,
    time: u64,
}

impl Factory {
    /// Validate both configs and build the fleet at tick 0.
    pub fn new(base: BaseConfig, run: RunConfig) -> Result<Self, EngineError> {
        base.validate()?;
        run.validate()?;

        let mut rng = run_rng(run.seed);
        let motors = (0..run.num_motors)
            .map(|id| Motor::new(id, &base, run.load_factor, run.degradation_speed, &mut rng))
            .collect();

        let regime = RegimeController::new(&base);
        let maintenance = MaintenanceController::new(
            run.auto_maintenance_enabled,
            run.mode == GenerationMode::Live,
            run.mode == GenerationMode::Batch,
        );

        Ok(Self {
            base,
            run,
            rng,
            motors,
            regime,
            maintenance,
            time: 0,
        })
    }

    pub fn base(&self) -> &BaseConfig {
        &self.base
    }

    pub fn run(&self) -> &RunConfig {
        &self.run
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn current_regime(&self) -> OperatingRegime {
        self.regime.current()
    }

    pub fn motors(&self) -> &[Motor] {
        &self.motors
    }

    pub fn active_motors(&self) -> u32 {
        self.motors.iter().filter(|m| m.active).count() as u32
    }

    pub fn maintenance_events(&self) -> &[MaintenanceEvent] {
        self.maintenance.events()
    }

    pub fn maintenance_count_for(&self, motor_id: u32) -> usize {
        self.maintenance.count_for(motor_id)
    }

    fn index_of(&self, motor_id: u32) -> Result<usize, EngineError> {
        self.motors
            .iter()
            .position(|m| m.state.motor_id == motor_id)
            .ok_or_else(|| EngineError::Precondition(format!("unknown motor id {motor_id}")))
    }

    pub fn motor(&self, motor_id: u32) -> Result<&Motor, EngineError> {
        let idx = self.index_of(motor_id)?;
        Ok(&self.motors[idx])
    }

    /// Remove a motor from the iteration set; it stops advancing and
    /// emitting until resumed.
    pub fn suspend_motor(&mut self, motor_id: u32) -> Result<(), EngineError> {
        let idx = self.index_of(motor_id)?;
        self.motors[idx].active = false;
        Ok(())
    }

    pub fn resume_motor(&mut self, motor_id: u32) -> Result<(), EngineError> {
        let idx = self.index_of(motor_id)?;
        self.motors[idx].active = true;
        Ok(())
    }

    /// Test hook: force a motor into a severely degraded condition.
    pub fn inject_failure(&mut self, motor_id: u32) -> Result<(), EngineError> {
        let idx = self.index_of(motor_id)?;
        self.motors[idx].inject_failure(&self.base);
        Ok(())
    }

    /// Apply a full automatic-maintenance reset to one motor (event log and
    /// cycle counter included).
    pub fn apply_automatic_maintenance(&mut self, motor_id: u32) -> Result<(), EngineError> {
        let idx = self.index_of(motor_id)?;
        let motor = &mut self.motors[idx];
        self.maintenance.apply(
            motor,
            MaintenanceKind::AutomaticMaintenance,
            self.time,
            &self.base,
            self.run.degradation_speed,
            &mut self.rng,
        );
        Ok(())
    }

    /// Apply the live-mode operator overhaul to one motor.
    pub fn apply_operator_overhaul(&mut self, motor_id: u32) -> Result<(), EngineError> {
        let idx = self.index_of(motor_id)?;
        let motor = &mut self.motors[idx];
        self.maintenance.apply_operator_overhaul(
            motor,
            self.time,
            &self.base,
            self.run.degradation_speed,
            &mut self.rng,
        );
        Ok(())
    }

    /// Restart for a batch run: clock to 0, every motor re-activated on a
    /// fresh cycle with a zeroed cycle counter, controller state dropped.
    pub fn restart_cycles(&mut self) {
        self.time = 0;
        self.maintenance.reset();
        for motor in &mut self.motors {
            let new_health = crate::rng::uniform(
                &mut self.rng,
                self.base.stage0_base_health - 0.02,
                self.base.stage0_base_health,
            );
            motor.reset_cycle(&self.base, self.run.degradation_speed, new_health, &mut self.rng);
            motor.cycle_id = 0;
            motor.active = true;
        }
    }

    /// Whether every motor has accumulated `target` automatic cycles.
    pub fn all_cycles_complete(&self, target: u32) -> bool {
        self.motors.iter().all(|m| m.cycle_id >= target)
    }

    /// Deactivate motors that have reached their cycle target.
    pub fn suspend_completed(&mut self, target: u32) {
        for motor in &mut self.motors {
            if motor.active && motor.cycle_id >= target {
                motor.active = false;
                debug!(
                    motor_id = motor.state.motor_id,
                    cycles = motor.cycle_id,
                    "motor completed its cycle target"
                );
            }
        }
    }

    /// Execute one global tick and emit one record per active motor.
    pub fn step(&mut self) -> Result<Vec<Observation>, EngineError> {
        let regime = self.regime.advance(&mut self.rng);
        let params = self.regime.params();
        let noise_scale = params.noise_multiplier * self.run.noise_level;

        let mut records = Vec::with_capacity(self.motors.len());
        for idx in 0..self.motors.len() {
            if !self.motors[idx].active {
                continue;
            }
            let motor_id = self.motors[idx].state.motor_id;

            // Critical-entry detection uses the state left by the previous
            // tick, before this tick's physics run.
            self.maintenance.observe_health_state(
                motor_id,
                self.motors[idx].state.health_state,
                self.time,
                &mut self.rng,
            );

            // Records carry the cycle in progress; an automatic reset below
            // bumps the counter for *subsequent* ticks.
            let cycle_for_record = self.motors[idx].cycle_id;

            // Maintenance is applied before the physics update.
            let motor = &mut self.motors[idx];
            let mut event = None;
            if self
                .maintenance
                .automatic_due(motor_id, self.time, motor.state.motor_health)
            {
                self.maintenance.apply(
                    motor,
                    MaintenanceKind::AutomaticMaintenance,
                    self.time,
                    &self.base,
                    self.run.degradation_speed,
                    &mut self.rng,
                );
                event = Some(MaintenanceKind::AutomaticMaintenance);
            } else if let Some(kind) = self.maintenance.decide(
                self.time,
                motor.state.motor_health,
                &self.base,
                &mut self.rng,
            ) {
                self.maintenance.apply(
                    motor,
                    kind,
                    self.time,
                    &self.base,
                    self.run.degradation_speed,
                    &mut self.rng,
                );
                event = Some(kind);
            }

            // Regime load applies to this step only.
            let original_load = motor.state.load_factor;
            motor.state.load_factor *= params.load_multiplier;
            let frame = motor.step(
                &self.base,
                noise_scale,
                params.temp_multiplier,
                params.degradation_multiplier,
                &mut self.rng,
            );
            motor.state.load_factor = original_load;
            let frame = frame?;

            records.push(Observation {
                time: self.time,
                motor_id,
                cycle_id: cycle_for_record,
                motor_health: motor.state.motor_health,
                health_state: motor.state.health_state,
                degradation_stage: motor.state.degradation_stage,
                temperature: frame.temperature,
                vibration: frame.vibration,
                current: frame.current,
                rpm: frame.rpm,
                hours_since_maintenance: motor.state.hours_since_maintenance,
                regime,
                maintenance_event: event,
            });
        }

        self.time += 1;
        Ok(records)
    }

    /// Force-close one cycle for a motor that did not reach its target
    /// naturally: synthesise a final Critical record, apply the automatic
    /// reset, and synthesise the matching maintenance record. Sensor
    /// channels are left missing on synthetic records.
    pub fn force_close_cycle(
        &mut self,
        motor_id: u32,
    ) -> Result<(Observation, Observation), EngineError> {
        let idx = self.index_of(motor_id)?;
        let regime = self.regime.current();

        let motor = &mut self.motors[idx];
        let cycle = motor.cycle_id;
        motor.state.motor_health = motor
            .state
            .motor_health
            .min(self.base.critical_threshold * 0.5);
        motor.state.health_state = HealthState::Critical;
        motor.state.health_window.push(motor.state.motor_health);

        let critical_record = Observation {
            time: self.time,
            motor_id,
            cycle_id: cycle,
            motor_health: motor.state.motor_health,
            health_state: motor.state.health_state,
            degradation_stage: motor.state.degradation_stage,
            temperature: None,
            vibration: None,
            current: None,
            rpm: None,
            hours_since_maintenance: motor.state.hours_since_maintenance,
            regime,
            maintenance_event: None,
        };
        self.time += 1;

        let motor = &mut self.motors[idx];
        self.maintenance.apply(
            motor,
            MaintenanceKind::AutomaticMaintenance,
            self.time,
            &self.base,
            self.run.degradation_speed,
            &mut self.rng,
        );
        let motor = &self.motors[idx];
        let maintenance_record = Observation {
            time: self.time,
            motor_id,
            cycle_id: cycle,
            motor_health: motor.state.motor_health,
            health_state: motor.state.health_state,
            degradation_stage: motor.state.degradation_stage,
            temperature: None,
            vibration: None,
            current: None,
            rpm: None,
            hours_since_maintenance: motor.state.hours_since_maintenance,
            regime,
            maintenance_event: Some(MaintenanceKind::AutomaticMaintenance),
        };
        self.time += 1;

        Ok((critical_record, maintenance_record))
    }
}
