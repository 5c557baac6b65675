//! Market regime classification from choppiness (CHOP) and trend strength (ADX).
//!
//! CHOP and ADX are computed upstream. This module only maps their values to
//! a regime and a trading permission:
//! - Choppy: CHOP above the choppy threshold or ADX below the weak threshold
//! - Trending: CHOP below the trending threshold and ADX above the strong threshold
//! - Extreme trend: CHOP below the extreme threshold and ADX above the extreme threshold

use serde::{Deserialize, Serialize};

use super::RegimeGate;

/// Thresholds for regime classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeThresholds {
    pub chop_choppy: f64,
    pub chop_trending: f64,
    pub chop_extreme: f64,
    pub adx_weak: f64,
    pub adx_strong: f64,
    pub adx_extreme: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            chop_choppy: 61.8,
            chop_trending: 50.0,
            chop_extreme: 38.2,
            adx_weak: 20.0,
            adx_strong: 25.0,
            adx_extreme: 50.0,
        }
    }
}

/// Market state for a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    Choppy,
    Neutral,
    Trending,
    ExtremeTrend,
}

impl MarketRegime {
    /// Only trending regimes permit new entries.
    pub fn permits_trading(self) -> bool {
        matches!(self, MarketRegime::Trending | MarketRegime::ExtremeTrend)
    }
}

impl RegimeThresholds {
    /// Classify a bar from its CHOP and ADX values. NaN inputs classify as choppy.
    pub fn classify(&self, chop: f64, adx: f64) -> MarketRegime {
        if chop.is_nan() || adx.is_nan() {
            return MarketRegime::Choppy;
        }
        if chop < self.chop_extreme && adx > self.adx_extreme {
            MarketRegime::ExtremeTrend
        } else if chop < self.chop_trending && adx > self.adx_strong {
            MarketRegime::Trending
        } else if chop > self.chop_choppy || adx < self.adx_weak {
            MarketRegime::Choppy
        } else {
            MarketRegime::Neutral
        }
    }
}

/// Regime gate derived from CHOP and ADX.
pub fn regime_gate(chop: f64, adx: f64, thresholds: &RegimeThresholds) -> RegimeGate {
    RegimeGate::Flag(thresholds.classify(chop, adx).permits_trading())
}
