//! fleetsim: synthetic sensor data for induction-motor predictive
//! maintenance.
//!
//! Simulates fleets of motors whose hidden health degrades through a
//! three-stage stochastic process; vibration, temperature, current and RPM
//! readings are explicit physics-inspired functions of that hidden state,
//! contaminated with noise, spikes, drift, drop-outs and stateful sensor
//! faults. A fixed seed fully determines an output trace.
//!
//! ## Architecture
//!
//! - **Physics kernels**: stateless degradation and observation functions
//! - **Motor**: per-unit hidden state and sensor pipeline
//! - **Factory**: fleet scheduler on a shared global clock with operating
//!   regimes and a maintenance controller
//! - **Engine**: public surface with Live (interactive, operator
//!   decisions) and Batch (run-to-cycle-target) generation modes
//!
//! ## Example
//!
//! ```no_run
//! use fleetsim::{BaseConfig, Engine, GenerationMode, RunConfig};
//!
//! let run = RunConfig {
//!     num_motors: 3,
//!     target_maintenance_cycles: 1,
//!     mode: GenerationMode::Batch,
//!     seed: Some(42),
//!     ..RunConfig::default()
//! };
//! let mut engine = Engine::new(BaseConfig::default(), run).unwrap();
//! let outcome = engine.generate_batch(500_000).unwrap();
//! println!("{} records ({})", outcome.records.len(), outcome.reason);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod factory;
pub mod imperfections;
pub mod maintenance;
pub mod motor;
pub mod physics;
pub mod regime;
pub mod rng;
pub mod types;

// Re-export the configuration layer
pub use config::{BaseConfig, GenerationMode, RunConfig};

// Re-export the engine surface
pub use engine::{BatchOutcome, Engine, StopReason};
pub use error::{ConfigError, EngineError};

// Re-export commonly used types
pub use types::{
    Alert, AlertSeverity, DegradationStage, EngineStatus, FailedMotor, HealthState,
    MaintenanceEvent, MaintenanceKind, Observation, OperatingRegime, PendingDecision,
};
