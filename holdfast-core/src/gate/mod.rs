//! Regime gate: permits or forbids trading before a score reaches the engine.
//!
//! The gate is applied per bar and is a pure function of the bar's score and
//! its regime permission. A forbidding, absent, or NaN gate yields a gated
//! score of exactly zero, which the engine treats as "no signal".

pub mod regime;

use serde::{Deserialize, Serialize};

pub use regime::{regime_gate, MarketRegime, RegimeThresholds};

/// External permission signal for a bar: a boolean flag or a level in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegimeGate {
    Flag(bool),
    Level(f64),
}

impl RegimeGate {
    /// Whether the gate allows trading. Levels must be finite and strictly positive.
    pub fn permits(self) -> bool {
        match self {
            RegimeGate::Flag(allowed) => allowed,
            RegimeGate::Level(level) => level.is_finite() && level > 0.0,
        }
    }

    /// Gate weight in [0, 1]. Non-finite levels weigh zero.
    pub fn weight(self) -> f64 {
        match self {
            RegimeGate::Flag(true) => 1.0,
            RegimeGate::Flag(false) => 0.0,
            RegimeGate::Level(level) if level.is_finite() => level.clamp(0.0, 1.0),
            RegimeGate::Level(_) => 0.0,
        }
    }
}

impl From<bool> for RegimeGate {
    fn from(allowed: bool) -> Self {
        RegimeGate::Flag(allowed)
    }
}

/// How a permitting gate is applied to the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    /// Pass the score through unchanged.
    #[default]
    Permit,
    /// Multiply the score by the gate weight.
    Scale,
}

/// Apply the regime gate to a raw score.
///
/// Fails closed: an absent gate, a forbidding gate, or a non-finite score
/// all produce `0.0`.
pub fn gate_score(score: f64, gate: Option<RegimeGate>, mode: GateMode) -> f64 {
    let Some(gate) = gate else {
        return 0.0;
    };
    if !score.is_finite() || !gate.permits() {
        return 0.0;
    }
    match mode {
        GateMode::Permit => score,
        GateMode::Scale => score * gate.weight(),
    }
}
