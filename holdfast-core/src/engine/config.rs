//! Engine configuration and validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gate::GateMode;

/// Errors raised when an engine configuration is invalid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("entry_threshold must be in (0, 1], got {0}")]
    EntryThresholdOutOfRange(f64),

    #[error("exit_threshold must be >= 0, got {0}")]
    NegativeExitThreshold(f64),

    #[error("exit_threshold ({exit}) must be below entry_threshold ({entry})")]
    ThresholdOrder { entry: f64, exit: f64 },

    #[error("{field} must be >= 0, got {value}")]
    NegativeBars { field: &'static str, value: i64 },

    #[error("chandelier_multiple must be finite and >= 0, got {0}")]
    InvalidChandelierMultiple(f64),
}

/// User-facing lifecycle configuration.
///
/// Bar counts are signed so that negative input from a config file reaches
/// validation instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Gated score magnitude required to start accumulating an entry.
    pub entry_threshold: f64,
    /// Gated score magnitude below which an open position may exit.
    pub exit_threshold: f64,
    /// Consecutive same-direction bars required before opening.
    pub persistence_bars: i64,
    /// Bars a position must be held before a score-based exit is honored.
    pub min_holding_bars: i64,
    /// Bars after any exit during which entries are suppressed.
    pub cooldown_bars: i64,
    /// ATR multiple for the trailing stop.
    pub chandelier_multiple: f64,
    pub enable_trailing_stop: bool,
    pub gate_mode: GateMode,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            entry_threshold: 0.5,
            exit_threshold: 0.2,
            persistence_bars: 4,
            min_holding_bars: 8,
            cooldown_bars: 4,
            chandelier_multiple: 2.5,
            enable_trailing_stop: true,
            gate_mode: GateMode::Permit,
        }
    }
}

/// Validated lifecycle parameters. Only constructible through [`LifecycleConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LifecycleParams {
    pub entry_threshold: f64,
    pub exit_threshold: f64,
    pub persistence_bars: usize,
    pub min_holding_bars: usize,
    pub cooldown_bars: usize,
    pub chandelier_multiple: f64,
    pub enable_trailing_stop: bool,
    pub gate_mode: GateMode,
}

impl LifecycleParams {
    /// Persistence required to open. Zero means "open on the first qualifying bar".
    pub fn required_persistence(&self) -> usize {
        self.persistence_bars.max(1)
    }
}

impl LifecycleConfig {
    /// Validate and convert to engine parameters.
    pub fn validate(&self) -> Result<LifecycleParams, ConfigError> {
        // Written as negated comparisons so NaN fails them.
        if !(self.entry_threshold > 0.0 && self.entry_threshold <= 1.0) {
            return Err(ConfigError::EntryThresholdOutOfRange(self.entry_threshold));
        }
        if !(self.exit_threshold >= 0.0) {
            return Err(ConfigError::NegativeExitThreshold(self.exit_threshold));
        }
        if self.exit_threshold >= self.entry_threshold {
            return Err(ConfigError::ThresholdOrder {
                entry: self.entry_threshold,
                exit: self.exit_threshold,
            });
        }
        if !(self.chandelier_multiple.is_finite() && self.chandelier_multiple >= 0.0) {
            return Err(ConfigError::InvalidChandelierMultiple(
                self.chandelier_multiple,
            ));
        }

        Ok(LifecycleParams {
            entry_threshold: self.entry_threshold,
            exit_threshold: self.exit_threshold,
            persistence_bars: non_negative("persistence_bars", self.persistence_bars)?,
            min_holding_bars: non_negative("min_holding_bars", self.min_holding_bars)?,
            cooldown_bars: non_negative("cooldown_bars", self.cooldown_bars)?,
            chandelier_multiple: self.chandelier_multiple,
            enable_trailing_stop: self.enable_trailing_stop,
            gate_mode: self.gate_mode,
        })
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<usize, ConfigError> {
    usize::try_from(value).map_err(|_| ConfigError::NegativeBars { field, value })
}
