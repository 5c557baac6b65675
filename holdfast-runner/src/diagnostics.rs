//! Turnover diagnostics: measures how often a configuration flips positions.
//!
//! Excess turnover is the failure mode the lifecycle filters exist to
//! prevent. These metrics quantify it per instrument so configurations can
//! be compared.

use serde::{Deserialize, Serialize};

use holdfast_core::{LifecycleEvent, PositionRecord};

/// Turnover metrics for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnoverDiagnostics {
    pub symbol: String,
    pub bars: usize,
    pub entries: usize,
    pub trailing_stop_exits: usize,
    pub hysteresis_exits: usize,
    /// Bars labeled long or short.
    pub bars_in_market: usize,
    /// Fraction of bars in the market.
    pub exposure: f64,
    /// Bars on which the label differs from the previous bar's.
    pub label_changes: usize,
    /// Label changes per bar.
    pub turnover_rate: f64,
    /// Mean bars per completed position (entry bar through the bar before exit).
    pub mean_holding_bars: Option<f64>,
    /// Bars gated to zero because a feature was missing.
    pub missing_feature_bars: usize,
}

/// Compute turnover metrics for one instrument's records.
///
/// Returns None for an empty slice.
pub fn compute_turnover(records: &[PositionRecord]) -> Option<TurnoverDiagnostics> {
    let first = records.first()?;
    let bars = records.len();

    let mut entries = 0;
    let mut trailing_stop_exits = 0;
    let mut hysteresis_exits = 0;
    let mut holding_periods = Vec::new();
    let mut open_since: Option<usize> = None;

    for (i, r) in records.iter().enumerate() {
        match r.event {
            Some(LifecycleEvent::Entered(_)) => {
                entries += 1;
                open_since = Some(i);
            }
            Some(LifecycleEvent::TrailingStop(_)) => {
                trailing_stop_exits += 1;
                holding_periods.extend(open_since.take().map(|start| i - start));
            }
            Some(LifecycleEvent::HysteresisExit(_)) => {
                hysteresis_exits += 1;
                holding_periods.extend(open_since.take().map(|start| i - start));
            }
            Some(LifecycleEvent::CoolingDown) | None => {}
        }
    }

    let bars_in_market = records.iter().filter(|r| !r.position.is_flat()).count();
    let label_changes = records
        .windows(2)
        .filter(|w| w[0].position != w[1].position)
        .count();
    let missing_feature_bars = records.iter().filter(|r| r.missing_features).count();

    let mean_holding_bars = if holding_periods.is_empty() {
        None
    } else {
        Some(holding_periods.iter().sum::<usize>() as f64 / holding_periods.len() as f64)
    };

    Some(TurnoverDiagnostics {
        symbol: first.symbol.clone(),
        bars,
        entries,
        trailing_stop_exits,
        hysteresis_exits,
        bars_in_market,
        exposure: bars_in_market as f64 / bars as f64,
        label_changes,
        turnover_rate: label_changes as f64 / bars as f64,
        mean_holding_bars,
        missing_feature_bars,
    })
}

/// Compute diagnostics for every instrument in a grouped record sequence.
pub fn compute_all(records: &[PositionRecord]) -> Vec<TurnoverDiagnostics> {
    let mut out = Vec::new();
    let mut start = 0;
    for i in 1..=records.len() {
        if i == records.len() || records[i].symbol != records[start].symbol {
            out.extend(compute_turnover(&records[start..i]));
            start = i;
        }
    }
    out
}
