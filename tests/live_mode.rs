//! Live-mode end-to-end scenarios: pause-on-alert, operator decisions,
//! quiescence of paused/failed motors, regime response, and the derived
//! alert view.

use fleetsim::{
    AlertSeverity, BaseConfig, Engine, EngineError, GenerationMode, MaintenanceKind,
    OperatingRegime, RunConfig,
};

/// Step one tick at a time until a motor pauses; returns its id.
fn step_until_pause(engine: &mut Engine, max_ticks: u32) -> u32 {
    for _ in 0..max_ticks {
        engine.step(1).unwrap();
        if let Some(decision) = engine.pending_decisions().first() {
            return decision.motor_id;
        }
    }
    panic!("no motor paused within {max_ticks} ticks");
}

fn live_engine(alert_threshold: f64, seed: u64) -> Engine {
    let run = RunConfig {
        num_motors: 2,
        mode: GenerationMode::Live,
        alert_threshold,
        // Accelerated ageing so the alert threshold is reached quickly.
        degradation_speed: 20.0,
        // Keep the controller quiet so decisions are purely operator-driven.
        auto_maintenance_enabled: false,
        seed: Some(seed),
        ..RunConfig::default()
    };
    Engine::new(BaseConfig::default(), run).unwrap()
}

// ============================================================================
// Scenario: pause on alert, then operator maintenance
// ============================================================================

#[test]
fn motor_pauses_at_alert_threshold_and_resumes_after_maintenance() {
    let mut engine = live_engine(0.5, 1004);
    let paused_id = step_until_pause(&mut engine, 20_000);

    let decisions = engine.pending_decisions();
    assert_eq!(decisions.len(), 1);
    assert!(decisions[0].health <= 0.5);
    assert_eq!(engine.status().paused_motors, 1);

    // The alert view surfaces the pending decision.
    assert!(engine
        .alerts()
        .iter()
        .any(|a| a.motor_id == paused_id && a.severity == AlertSeverity::ActionRequired));

    // A paused motor contributes zero records.
    for _ in 0..50 {
        let records = engine.step(1).unwrap();
        assert!(
            records.iter().all(|r| r.motor_id != paused_id),
            "paused motor kept emitting"
        );
    }

    // Operator overhaul: the motor resumes with full recovery.
    engine.perform_maintenance(paused_id).unwrap();
    assert!(engine.pending_decisions().is_empty());
    let records = engine.step(1).unwrap();
    let record = records
        .iter()
        .find(|r| r.motor_id == paused_id)
        .expect("overhauled motor did not resume");
    assert!(
        record.motor_health >= 0.9,
        "post-overhaul health {} below 0.9",
        record.motor_health
    );
    assert!(engine
        .maintenance_log()
        .iter()
        .any(|e| e.motor_id == paused_id && e.kind == MaintenanceKind::Alignment));
}

// ============================================================================
// Scenario: mark failed, stay silent, restore
// ============================================================================

#[test]
fn failed_motor_is_silent_until_restored() {
    let mut engine = live_engine(0.5, 1014);
    let paused_id = step_until_pause(&mut engine, 20_000);

    engine.mark_failed(paused_id).unwrap();
    assert!(engine.pending_decisions().is_empty());
    let failed = engine.failed_motors();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].motor_id, paused_id);
    assert!(failed[0].health_at_failure <= 0.5);

    for _ in 0..100 {
        let records = engine.step(1).unwrap();
        assert!(
            records.iter().all(|r| r.motor_id != paused_id),
            "failed motor kept emitting"
        );
    }

    // Restoration re-initialises the motor at the current global tick.
    let tick_before = engine.current_tick();
    engine.restore(paused_id).unwrap();
    assert!(engine.failed_motors().is_empty());
    let records = engine.step(1).unwrap();
    let record = records
        .iter()
        .find(|r| r.motor_id == paused_id)
        .expect("restored motor did not resume");
    assert_eq!(record.time, tick_before);
    assert!(record.motor_health >= 0.9);
    assert!(record.hours_since_maintenance < 1.0);
}

// ============================================================================
// Decision preconditions
// ============================================================================

#[test]
fn decisions_require_the_right_motor_state() {
    let mut engine = live_engine(0.5, 1024);
    engine.step(10).unwrap();

    // Nothing is paused yet: every decision is a precondition error.
    assert!(matches!(
        engine.perform_maintenance(0),
        Err(EngineError::Precondition(_))
    ));
    assert!(matches!(
        engine.mark_failed(0),
        Err(EngineError::Precondition(_))
    ));
    assert!(matches!(
        engine.restore(0),
        Err(EngineError::Precondition(_))
    ));

    let paused_id = step_until_pause(&mut engine, 20_000);
    // A paused motor cannot be restored; it has not been marked failed.
    assert!(matches!(
        engine.restore(paused_id),
        Err(EngineError::Precondition(_))
    ));
}

// ============================================================================
// Scenario: regime response
// ============================================================================

#[test]
fn peak_regime_draws_more_current_than_idle() {
    let base = BaseConfig {
        // Short dwells so the run samples many regime visits.
        regime_base_duration_ticks: 20,
        ..BaseConfig::default()
    };
    let run = RunConfig {
        num_motors: 1,
        mode: GenerationMode::Live,
        // Health never reaches zero, so nothing pauses.
        alert_threshold: 0.0,
        auto_maintenance_enabled: false,
        seed: Some(1005),
        ..RunConfig::default()
    };
    let mut engine = Engine::new(base, run).unwrap();
    let records = engine.step(4000).unwrap();

    let mean_current = |regime: OperatingRegime| {
        let values: Vec<f64> = records
            .iter()
            .filter(|r| r.regime == regime)
            .filter_map(|r| r.current)
            .collect();
        assert!(
            !values.is_empty(),
            "regime {regime} never observed in 4000 ticks"
        );
        values.iter().sum::<f64>() / values.len() as f64
    };

    let peak = mean_current(OperatingRegime::Peak);
    let idle = mean_current(OperatingRegime::Idle);
    assert!(
        peak > idle,
        "mean current under peak ({peak:.2}) not above idle ({idle:.2})"
    );
}

// ============================================================================
// Reactive maintenance (live mode only)
// ============================================================================

#[test]
fn reactive_bearing_replacement_fires_on_critical_health() {
    let run = RunConfig {
        num_motors: 1,
        mode: GenerationMode::Live,
        // Keep the alert threshold out of the way so the motor is never
        // paused before the reactive trigger can see it.
        alert_threshold: 0.0,
        auto_maintenance_enabled: true,
        seed: Some(1034),
        ..RunConfig::default()
    };
    let mut engine = Engine::new(BaseConfig::default(), run).unwrap();

    let mut fired = false;
    for _ in 0..200 {
        // Re-degrade each tick: the plateau physics would otherwise pull
        // health straight back into the healthy band.
        engine.inject_failure(0).unwrap();
        engine.step(1).unwrap();
        if engine
            .maintenance_log()
            .iter()
            .any(|e| e.kind == MaintenanceKind::BearingReplacement)
        {
            fired = true;
            break;
        }
    }
    assert!(fired, "reactive bearing replacement never fired");

    let event = engine
        .maintenance_log()
        .iter()
        .find(|e| e.kind == MaintenanceKind::BearingReplacement)
        .unwrap();
    assert!(event.pre_health < 0.25);
    assert!((0.75..=0.90).contains(&event.post_health));
}
