//! Position lifecycle engine.
//!
//! Converts each instrument's bar sequence into a position label sequence by
//! folding a per-instrument state machine over the bars. Instruments are
//! independent: each fold owns its `InstrumentState`, so distinct instruments
//! are processed in parallel with no shared mutable state.

pub mod config;
pub mod state;
pub mod tracker;

use std::collections::HashSet;

use rayon::prelude::*;

use crate::domain::Bar;
use crate::emit::{PositionRecord, PositionSeries};

pub use config::{ConfigError, LifecycleConfig, LifecycleParams};
pub use state::InstrumentState;
pub use tracker::{InstrumentTracker, SequenceOrderError};

/// Configured lifecycle engine. Immutable; runs are re-entrant.
#[derive(Debug, Clone)]
pub struct Engine {
    params: LifecycleParams,
}

impl Engine {
    /// Validate the configuration and build an engine.
    pub fn new(config: &LifecycleConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            params: config.validate()?,
        })
    }

    pub fn params(&self) -> &LifecycleParams {
        &self.params
    }

    /// Fresh tracker for one instrument.
    pub fn tracker(&self) -> InstrumentTracker {
        InstrumentTracker::new(self.params)
    }

    /// Fold one instrument's bars. All bars must share a symbol.
    pub fn run_instrument(&self, bars: &[Bar]) -> Result<Vec<PositionRecord>, SequenceOrderError> {
        let mut tracker = self.tracker();
        bars.iter().map(|bar| tracker.step(bar)).collect()
    }

    /// Run bars grouped by instrument and sorted by timestamp within each group.
    ///
    /// Instruments are folded in parallel; output order matches input order.
    pub fn run(&self, bars: &[Bar]) -> Result<PositionSeries, SequenceOrderError> {
        let groups = split_instruments(bars)?;
        let chunks = groups
            .par_iter()
            .map(|group| self.run_instrument(group))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PositionSeries::from_chunks(chunks))
    }

    /// Single-threaded equivalent of [`Engine::run`].
    pub fn run_sequential(&self, bars: &[Bar]) -> Result<PositionSeries, SequenceOrderError> {
        let groups = split_instruments(bars)?;
        let chunks = groups
            .iter()
            .map(|group| self.run_instrument(group))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PositionSeries::from_chunks(chunks))
    }
}

/// Split input into contiguous per-instrument slices.
///
/// Fails if an instrument's bars reappear after another instrument's.
pub fn split_instruments(bars: &[Bar]) -> Result<Vec<&[Bar]>, SequenceOrderError> {
    let mut groups = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut start = 0;

    for i in 1..=bars.len() {
        let boundary = i == bars.len() || bars[i].symbol != bars[start].symbol;
        if !boundary {
            continue;
        }
        let symbol = bars[start].symbol.as_str();
        if !seen.insert(symbol) {
            return Err(SequenceOrderError::Ungrouped {
                symbol: symbol.to_string(),
            });
        }
        groups.push(&bars[start..i]);
        start = i;
    }

    Ok(groups)
}
