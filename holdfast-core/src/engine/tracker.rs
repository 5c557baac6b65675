//! Incremental per-instrument driver around `InstrumentState`.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::Bar;
use crate::emit::PositionRecord;
use crate::gate::gate_score;

use super::config::LifecycleParams;
use super::state::InstrumentState;

/// Input ordering violations. The engine never reorders bars.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceOrderError {
    #[error("bars for '{symbol}' out of order: {current} does not follow {previous}")]
    OutOfOrder {
        symbol: String,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("bars for '{symbol}' are not contiguous; input must be grouped by instrument")]
    Ungrouped { symbol: String },

    #[error("tracker for '{expected}' received a bar for '{found}'")]
    SymbolMismatch { expected: String, found: String },
}

/// Steps one instrument's state bar by bar, enforcing strict timestamp order.
///
/// A tracker lives for one run over one instrument's history and is then
/// dropped; its state is never carried into another run.
#[derive(Debug, Clone)]
pub struct InstrumentTracker {
    params: LifecycleParams,
    symbol: Option<String>,
    last_timestamp: Option<DateTime<Utc>>,
    state: InstrumentState,
}

impl InstrumentTracker {
    pub fn new(params: LifecycleParams) -> Self {
        Self {
            params,
            symbol: None,
            last_timestamp: None,
            state: InstrumentState::new(),
        }
    }

    pub fn state(&self) -> &InstrumentState {
        &self.state
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    /// Process one bar and emit its record.
    pub fn step(&mut self, bar: &Bar) -> Result<PositionRecord, SequenceOrderError> {
        match &self.symbol {
            Some(expected) if *expected != bar.symbol => {
                return Err(SequenceOrderError::SymbolMismatch {
                    expected: expected.clone(),
                    found: bar.symbol.clone(),
                });
            }
            Some(_) => {}
            None => self.symbol = Some(bar.symbol.clone()),
        }

        if let Some(previous) = self.last_timestamp {
            if bar.timestamp <= previous {
                return Err(SequenceOrderError::OutOfOrder {
                    symbol: bar.symbol.clone(),
                    previous,
                    current: bar.timestamp,
                });
            }
        }
        self.last_timestamp = Some(bar.timestamp);

        let missing_features = bar.has_missing_features();
        let gated_score = if missing_features {
            0.0
        } else {
            gate_score(bar.score, bar.regime_gate, self.params.gate_mode)
        };

        let event = self.state.advance(&self.params, bar, gated_score);

        Ok(PositionRecord {
            symbol: bar.symbol.clone(),
            timestamp: bar.timestamp,
            position: self.state.position,
            gated_score,
            event,
            missing_features,
            channel: bar.channel,
        })
    }
}
