//! Stateful per-sensor fault models.
//!
//! Real sensors fail independently of machine health. Each channel carries
//! its own fault state with three failure modes:
//!
//! - **Bias drift**: once started, a per-tick random-sign walk at a fixed
//!   sampled rate, added to every reading.
//! - **Flatline**: the sensor captures its next reading and repeats it for
//!   a sampled number of ticks.
//! - **Intermittent drop**: while active, each reading is independently
//!   lost with a fixed probability.
//!
//! Precedence when combining: intermittent drop → flatline → drift. A
//! reading that is already missing passes through untouched.

use rand::Rng;

use crate::config::BaseConfig;

/// Drift rate sampled uniformly from this range when drift begins.
const DRIFT_RATE_MIN: f64 = 1e-4;
const DRIFT_RATE_MAX: f64 = 5e-4;
/// Flatline duration in ticks, sampled uniformly from `[10, 50)`.
const FLATLINE_TICKS_MIN: u32 = 10;
const FLATLINE_TICKS_MAX: u32 = 50;
/// Intermittent-failure duration in ticks, sampled uniformly from `[5, 20)`.
const INTERMITTENT_TICKS_MIN: u32 = 5;
const INTERMITTENT_TICKS_MAX: u32 = 20;
/// Per-reading drop probability while an intermittent failure is active.
const INTERMITTENT_DROP_RATE: f64 = 0.3;

/// The four sensor channels a motor exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorChannel {
    Temperature,
    Vibration,
    Current,
    Rpm,
}

/// Fault state for a single channel.
#[derive(Debug, Clone, Default)]
struct ChannelFaults {
    accumulated_bias: f64,
    /// Zero until drift onset.
    drift_rate: f64,
    flatline_ticks_left: u32,
    /// Captured on the first reading after flatline onset.
    flatline_value: Option<f64>,
    intermittent_ticks_left: u32,
}

impl ChannelFaults {
    fn advance(&mut self, cfg: &BaseConfig, rng: &mut impl Rng) {
        // Drift onset, then random-sign accumulation.
        if self.drift_rate == 0.0 && rng.gen::<f64>() < cfg.drift_start_prob {
            self.drift_rate = rng.gen_range(DRIFT_RATE_MIN..DRIFT_RATE_MAX);
        }
        if self.drift_rate > 0.0 {
            let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            self.accumulated_bias += self.drift_rate * sign;
        }

        // Flatline onset and countdown.
        if self.flatline_ticks_left == 0 && rng.gen::<f64>() < cfg.flatline_start_prob {
            self.flatline_ticks_left = rng.gen_range(FLATLINE_TICKS_MIN..FLATLINE_TICKS_MAX);
        } else if self.flatline_ticks_left > 0 {
            self.flatline_ticks_left -= 1;
            if self.flatline_ticks_left == 0 {
                self.flatline_value = None;
            }
        }

        // Intermittent-failure onset and countdown.
        if self.intermittent_ticks_left == 0 && rng.gen::<f64>() < cfg.intermittent_prob {
            self.intermittent_ticks_left =
                rng.gen_range(INTERMITTENT_TICKS_MIN..INTERMITTENT_TICKS_MAX);
        } else if self.intermittent_ticks_left > 0 {
            self.intermittent_ticks_left -= 1;
        }
    }

    fn apply(&mut self, value: f64, rng: &mut impl Rng) -> Option<f64> {
        if self.intermittent_ticks_left > 0 && rng.gen::<f64>() < INTERMITTENT_DROP_RATE {
            return None;
        }
        if self.flatline_ticks_left > 0 {
            let captured = *self.flatline_value.get_or_insert(value);
            return Some(captured);
        }
        Some(value + self.accumulated_bias)
    }
}

/// Fault simulator covering all four channels of one motor.
#[derive(Debug, Clone)]
pub struct SensorImperfections {
    enabled: bool,
    temperature: ChannelFaults,
    vibration: ChannelFaults,
    current: ChannelFaults,
    rpm: ChannelFaults,
}

impl SensorImperfections {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            temperature: ChannelFaults::default(),
            vibration: ChannelFaults::default(),
            current: ChannelFaults::default(),
            rpm: ChannelFaults::default(),
        }
    }

    /// Advance every channel's fault state by one tick.
    pub fn update(&mut self, cfg: &BaseConfig, rng: &mut impl Rng) {
        if !self.enabled {
            return;
        }
        self.temperature.advance(cfg, rng);
        self.vibration.advance(cfg, rng);
        self.current.advance(cfg, rng);
        self.rpm.advance(cfg, rng);
    }

    /// Run one channel's reading through its active faults.
    ///
    /// A reading that is already missing stays missing and consumes no
    /// randomness.
    pub fn apply(
        &mut self,
        channel: SensorChannel,
        value: Option<f64>,
        rng: &mut impl Rng,
    ) -> Option<f64> {
        if !self.enabled {
            return value;
        }
        let value = value?;
        self.channel_mut(channel).apply(value, rng)
    }

    fn channel_mut(&mut self, channel: SensorChannel) -> &mut ChannelFaults {
        match channel {
            SensorChannel::Temperature => &mut self.temperature,
            SensorChannel::Vibration => &mut self.vibration,
            SensorChannel::Current => &mut self.current,
            SensorChannel::Rpm => &mut self.rpm,
        }
    }
}
