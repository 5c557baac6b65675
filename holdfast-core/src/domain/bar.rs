//! Bar: one instrument's aligned feature values at one timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gate::RegimeGate;

/// Feature bar for a single symbol at a single timestamp.
///
/// Indicator values (score, ATR, channel bounds) are computed upstream and
/// arrive already aligned to the bar. Missing values are carried as NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    /// Composite score, nominally in [-1, 1]. Sign is direction, magnitude is strength.
    pub score: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Average true range, non-negative.
    pub atr: f64,
    /// Regime permission. `None` forbids new entries.
    pub regime_gate: Option<RegimeGate>,
    #[serde(default)]
    pub channel: Option<ChannelBounds>,
}

impl Bar {
    /// Returns true if any feature the engine reads for this bar is NaN or
    /// infinite, or the ATR is negative.
    ///
    /// Such a bar is treated as "no signal": its gated score is forced to zero.
    pub fn has_missing_features(&self) -> bool {
        !self.score.is_finite()
            || !(self.atr.is_finite() && self.atr >= 0.0)
            || !self.high.is_finite()
            || !self.low.is_finite()
    }

    /// Basic sanity check on the price fields: high >= low, close inside the range.
    pub fn is_sane(&self) -> bool {
        if self.has_missing_features() || !self.close.is_finite() {
            return false;
        }
        self.high >= self.low && self.close <= self.high && self.close >= self.low
    }
}

/// Price channel bounds (e.g. Donchian) aligned to a bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelBounds {
    pub high: f64,
    pub low: f64,
    pub mid: f64,
}

impl ChannelBounds {
    /// Builds bounds from high and low, with the midpoint as `mid`.
    pub fn from_extremes(high: f64, low: f64) -> Self {
        Self {
            high,
            low,
            mid: (high + low) / 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_bar() -> Bar {
        Bar {
            symbol: "BTC-USDT".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            score: 0.6,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            atr: 2.5,
            regime_gate: Some(RegimeGate::Flag(true)),
            channel: None,
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
        assert!(!sample_bar().has_missing_features());
    }

    #[test]
    fn nan_score_is_missing() {
        let mut bar = sample_bar();
        bar.score = f64::NAN;
        assert!(bar.has_missing_features());
        assert!(!bar.is_sane());
    }

    #[test]
    fn nan_close_is_not_a_missing_feature() {
        let mut bar = sample_bar();
        bar.close = f64::NAN;
        assert!(!bar.has_missing_features());
        assert!(!bar.is_sane());
    }

    #[test]
    fn negative_atr_is_missing() {
        let mut bar = sample_bar();
        bar.atr = -5.0;
        assert!(bar.has_missing_features());
        assert!(!bar.is_sane());
        bar.atr = 0.0;
        assert!(!bar.has_missing_features());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar();
        bar.high = 97.0; // below low
        assert!(!bar.is_sane());
    }

    #[test]
    fn channel_midpoint() {
        let ch = ChannelBounds::from_extremes(110.0, 90.0);
        assert_eq!(ch.mid, 100.0);
    }
}
