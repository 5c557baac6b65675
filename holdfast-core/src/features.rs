//! Feature adapter: turns externally computed feature rows into engine bars.
//!
//! Indicator math happens upstream. A `FeatureRow` is the aligned tuple the
//! feature source provides per (symbol, timestamp); any column may be absent.
//! The adapter chooses where the score and regime gate come from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, ChannelBounds};
use crate::gate::{regime_gate, RegimeGate, RegimeThresholds};

/// Raw aligned feature values for one symbol at one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub score: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub atr: Option<f64>,
    pub regime_gate: Option<RegimeGate>,
    pub channel_high: Option<f64>,
    pub channel_low: Option<f64>,
    pub channel_mid: Option<f64>,
    /// Choppiness index.
    pub chop: Option<f64>,
    pub adx: Option<f64>,
}

impl FeatureRow {
    /// Row with only identity columns set.
    pub fn empty(symbol: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            score: None,
            high: None,
            low: None,
            close: None,
            atr: None,
            regime_gate: None,
            channel_high: None,
            channel_low: None,
            channel_mid: None,
            chop: None,
            adx: None,
        }
    }

    fn channel(&self) -> Option<ChannelBounds> {
        let (high, low) = (self.channel_high?, self.channel_low?);
        Some(match self.channel_mid {
            Some(mid) => ChannelBounds { high, low, mid },
            None => ChannelBounds::from_extremes(high, low),
        })
    }
}

/// Where the composite score comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// The `score` column.
    #[default]
    Composite,
    /// Close position inside the channel, mapped to [-1, 1].
    Channel,
}

/// Where the regime gate comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeSource {
    /// The `regime_gate` column.
    #[default]
    Column,
    /// Classify the `chop` and `adx` columns.
    ChopAdx,
    /// Every bar permits trading.
    Always,
}

/// Row-to-bar conversion settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureAdapter {
    pub score_source: ScoreSource,
    pub regime_source: RegimeSource,
    pub regime_thresholds: RegimeThresholds,
}

impl FeatureAdapter {
    pub fn to_bar(&self, row: &FeatureRow) -> Bar {
        let score = match self.score_source {
            ScoreSource::Composite => row.score,
            ScoreSource::Channel => match (row.close, row.channel_high, row.channel_low) {
                (Some(close), Some(upper), Some(lower)) => channel_score(close, upper, lower),
                _ => None,
            },
        };

        let regime_gate = match self.regime_source {
            RegimeSource::Column => row.regime_gate,
            RegimeSource::ChopAdx => match (row.chop, row.adx) {
                (Some(chop), Some(adx)) => Some(regime_gate(chop, adx, &self.regime_thresholds)),
                _ => None,
            },
            RegimeSource::Always => Some(RegimeGate::Flag(true)),
        };

        Bar {
            symbol: row.symbol.clone(),
            timestamp: row.timestamp,
            score: score.unwrap_or(f64::NAN),
            high: row.high.unwrap_or(f64::NAN),
            low: row.low.unwrap_or(f64::NAN),
            close: row.close.unwrap_or(f64::NAN),
            atr: row.atr.unwrap_or(f64::NAN),
            regime_gate,
            channel: row.channel(),
        }
    }

    pub fn adapt(&self, rows: &[FeatureRow]) -> Vec<Bar> {
        rows.iter().map(|row| self.to_bar(row)).collect()
    }
}

/// Close position inside a channel mapped to [-1, 1].
///
/// `-1` at the lower bound, `0` at the midpoint, `1` at the upper bound;
/// breakouts beyond the channel are clamped.
pub fn channel_score(close: f64, upper: f64, lower: f64) -> Option<f64> {
    if !(close.is_finite() && upper.is_finite() && lower.is_finite()) {
        return None;
    }
    let position = (close - lower) / (upper - lower + 1e-10);
    Some(((position - 0.5) * 2.0).clamp(-1.0, 1.0))
}
