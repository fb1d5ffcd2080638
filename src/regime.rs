//! Operating-regime controller.
//!
//! One process-global regime in {Idle, Normal, Peak} drives a bundle of
//! multipliers applied to every motor for the duration of a single step.
//! A dwell counter advances each tick; when it reaches the current dwell
//! target the next regime is drawn from a fixed transition matrix and the
//! next target is re-jittered to 80-120% of the base duration.

use rand::Rng;
use tracing::debug;

use crate::config::BaseConfig;
use crate::rng::uniform;
use crate::types::OperatingRegime;

/// Multiplier bundle one regime resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeParams {
    /// Scales each motor's load factor for this step only.
    pub load_multiplier: f64,
    /// Scales every sensor's Gaussian sigma.
    pub noise_multiplier: f64,
    /// Scales the thermal heat-generation term.
    pub temp_multiplier: f64,
    /// Scales the stochastic components of the health update.
    pub degradation_multiplier: f64,
}

impl RegimeParams {
    pub const IDENTITY: Self = Self {
        load_multiplier: 1.0,
        noise_multiplier: 1.0,
        temp_multiplier: 1.0,
        degradation_multiplier: 1.0,
    };
}

/// Multipliers for each regime.
pub fn regime_params(regime: OperatingRegime) -> RegimeParams {
    match regime {
        OperatingRegime::Idle => RegimeParams {
            load_multiplier: 0.3,
            noise_multiplier: 0.5,
            temp_multiplier: 0.2,
            degradation_multiplier: 0.5,
        },
        OperatingRegime::Normal => RegimeParams::IDENTITY,
        OperatingRegime::Peak => RegimeParams {
            load_multiplier: 1.5,
            noise_multiplier: 1.4,
            temp_multiplier: 1.8,
            degradation_multiplier: 1.6,
        },
    }
}

/// Row order: Idle, Normal, Peak.
const REGIME_ORDER: [OperatingRegime; 3] = [
    OperatingRegime::Idle,
    OperatingRegime::Normal,
    OperatingRegime::Peak,
];

/// Transition probabilities, rows indexed by the current regime in
/// `REGIME_ORDER` order. Idle never jumps straight to Peak and Peak never
/// drops straight to Idle.
const TRANSITIONS: [[f64; 3]; 3] = [
    [0.7, 0.3, 0.0], // from Idle
    [0.1, 0.7, 0.2], // from Normal
    [0.0, 0.8, 0.2], // from Peak
];

fn regime_index(regime: OperatingRegime) -> usize {
    match regime {
        OperatingRegime::Idle => 0,
        OperatingRegime::Normal => 1,
        OperatingRegime::Peak => 2,
    }
}

/// Markov-chain regime state. Read-only during a step; advanced once per
/// tick before the per-motor loop.
#[derive(Debug, Clone)]
pub struct RegimeController {
    enabled: bool,
    current: OperatingRegime,
    dwell_ticks: u64,
    dwell_target: u64,
    base_duration: u64,
}

impl RegimeController {
    pub fn new(cfg: &BaseConfig) -> Self {
        Self {
            enabled: cfg.enable_regimes,
            current: OperatingRegime::Normal,
            dwell_ticks: 0,
            dwell_target: cfg.regime_base_duration_ticks,
            base_duration: cfg.regime_base_duration_ticks,
        }
    }

    pub fn current(&self) -> OperatingRegime {
        self.current
    }

    /// Multipliers in effect for the current tick.
    pub fn params(&self) -> RegimeParams {
        regime_params(self.current)
    }

    /// Advance the dwell clock by one tick, transitioning when the dwell
    /// target is reached. Returns the regime in effect for this tick.
    pub fn advance(&mut self, rng: &mut impl Rng) -> OperatingRegime {
        if !self.enabled {
            return self.current;
        }
        self.dwell_ticks += 1;
        if self.dwell_ticks >= self.dwell_target {
            let next = self.select_next(rng);
            if next != self.current {
                debug!(from = %self.current, to = %next, "regime transition");
            }
            self.current = next;
            self.dwell_ticks = 0;
            self.dwell_target =
                ((self.base_duration as f64) * uniform(rng, 0.8, 1.2)).max(1.0) as u64;
        }
        self.current
    }

    fn select_next(&self, rng: &mut impl Rng) -> OperatingRegime {
        let row = TRANSITIONS[regime_index(self.current)];
        let draw = rng.gen::<f64>();
        let mut cumulative = 0.0;
        for (i, probability) in row.iter().enumerate() {
            cumulative += probability;
            if draw < cumulative {
                return REGIME_ORDER[i];
            }
        }
        // Floating-point tail: the row sums to 1 but the draw may graze it.
        REGIME_ORDER[2]
    }
}
