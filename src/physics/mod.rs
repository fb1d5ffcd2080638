//! Physics kernels: stateless functions of the hidden state.
//!
//! - [`degradation`]: lifespan/stage sampling, the three-stage health
//!   update, friction, and the first-order thermal model.
//! - [`observation`]: clean sensor readings derived from effective health.
//! - [`noise`]: additive Gaussian noise, vibration spikes, drop-outs.
//!
//! Every function takes its random source as a parameter; nothing here
//! holds state between calls.

pub mod degradation;
pub mod noise;
pub mod observation;

pub use degradation::{
    determine_health_state, determine_stage, sample_stage_profile, update_friction,
    update_health, update_thermal, StageProfile,
};
pub use noise::{add_gaussian, add_spike, maybe_drop};
pub use observation::{clamp_temperature, compute_current, compute_rpm, compute_vibration};
