//! Engine error types.
//!
//! Two fatal classes surface to the caller: call-order / unknown-id
//! violations (`Precondition`) and invalid configuration (`Config`).
//! `Numeric` reports a NaN/Inf that appeared in a freshly computed
//! hidden-state field; after one of those the engine halts and only
//! read-only views remain usable. Batch exhaustion (tick ceiling, memory
//! guard) is not an error — see [`crate::engine::StopReason`].

use thiserror::Error;

/// Fatal errors returned by the engine's public surface.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Call-order violation: wrong mode for the call, unknown motor id,
    /// or a decision for a motor that is not awaiting one.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// Invalid configuration detected at engine init.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A freshly computed hidden-state field is NaN or infinite.
    /// Indicates a configuration bug; the engine halts.
    #[error("non-finite value computed for motor {motor_id} field `{field}`")]
    Numeric { motor_id: u32, field: &'static str },
}

/// Typed configuration range violations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("warning_threshold ({warning}) must be greater than critical_threshold ({critical})")]
    ThresholdOrder { warning: f64, critical: f64 },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} is a probability and must lie in [0, 1], got {value}")]
    Probability { field: &'static str, value: f64 },

    #[error("{field}: lower bound {min} exceeds upper bound {max}")]
    BoundsOrder {
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error(
        "stage fractions may sum to {total} at their upper bounds; \
         stage0_max_pct + stage1_max_pct must stay below 1.0"
    )]
    StageFractions { total: f64 },
}

/// Guard a freshly computed hidden-state field against NaN/Inf.
pub(crate) fn ensure_finite(
    value: f64,
    motor_id: u32,
    field: &'static str,
) -> Result<f64, EngineError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineError::Numeric { motor_id, field })
    }
}
