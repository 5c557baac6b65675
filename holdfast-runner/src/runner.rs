//! Run orchestration: wires together the feature adapter, engine, and diagnostics.
//!
//! Two entry points:
//! - `run_from_file()`: loads a feature CSV, then runs. Used by the CLI.
//! - `run_positions()`: takes pre-loaded feature rows. No I/O.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use holdfast_core::{Bar, ConfigError, FeatureRow, PositionRecord, SequenceOrderError};

use crate::config::RunConfig;
use crate::data_loader::{load_feature_rows, LoadError};
use crate::diagnostics::{compute_all, TurnoverDiagnostics};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("sequence error: {0}")]
    Sequence(#[from] SequenceOrderError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Per-symbol data-quality summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub symbol: String,
    pub bars: usize,
    /// Bars with a NaN/missing score, ATR, high or low.
    pub missing_feature_bars: usize,
    /// Bars without any regime gate value.
    pub missing_gate_bars: usize,
    /// Complete bars whose prices are inconsistent (high < low, close outside the range).
    #[serde(default)]
    pub insane_bars: usize,
}

impl DataQualityReport {
    pub fn is_clean(&self) -> bool {
        self.missing_feature_bars == 0 && self.missing_gate_bars == 0 && self.insane_bars == 0
    }
}

/// Complete result of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub config: RunConfig,
    pub positions: Vec<PositionRecord>,
    pub diagnostics: Vec<TurnoverDiagnostics>,
    pub data_quality: Vec<DataQualityReport>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl RunResult {
    pub fn bar_count(&self) -> usize {
        self.positions.len()
    }
}

/// Load a feature file and run it.
pub fn run_from_file(config: &RunConfig, features: &Path) -> Result<RunResult, RunError> {
    let rows = load_feature_rows(features)?;
    info!(path = %features.display(), rows = rows.len(), "loaded feature rows");
    run_positions(config, &rows)
}

/// Run pre-loaded feature rows. No I/O.
///
/// Rows must be grouped by symbol and sorted by timestamp within each group.
pub fn run_positions(config: &RunConfig, rows: &[FeatureRow]) -> Result<RunResult, RunError> {
    let engine = config.build_engine()?;
    let bars = config.features.adapt(rows);

    let data_quality = data_quality(&bars);
    for report in data_quality.iter().filter(|r| !r.is_clean()) {
        warn!(
            symbol = %report.symbol,
            bars = report.bars,
            missing_features = report.missing_feature_bars,
            missing_gate = report.missing_gate_bars,
            insane = report.insane_bars,
            "data quality issues"
        );
    }

    let series = if config.parallel {
        engine.run(&bars)?
    } else {
        engine.run_sequential(&bars)?
    };
    let positions = series.into_records();
    let diagnostics = compute_all(&positions);

    for d in &diagnostics {
        debug!(
            symbol = %d.symbol,
            entries = d.entries,
            exposure = d.exposure,
            turnover = d.turnover_rate,
            "instrument done"
        );
    }
    info!(
        instruments = diagnostics.len(),
        bars = positions.len(),
        "run complete"
    );

    Ok(RunResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        config: config.clone(),
        positions,
        diagnostics,
        data_quality,
    })
}

/// Count missing-feature, missing-gate and insane bars per contiguous symbol group.
fn data_quality(bars: &[Bar]) -> Vec<DataQualityReport> {
    let mut reports: Vec<DataQualityReport> = Vec::new();
    for bar in bars {
        if reports.last().map_or(true, |r| r.symbol != bar.symbol) {
            reports.push(DataQualityReport {
                symbol: bar.symbol.clone(),
                bars: 0,
                missing_feature_bars: 0,
                missing_gate_bars: 0,
                insane_bars: 0,
            });
        }
        if let Some(report) = reports.last_mut() {
            report.bars += 1;
            let missing = bar.has_missing_features();
            report.missing_feature_bars += usize::from(missing);
            report.missing_gate_bars += usize::from(bar.regime_gate.is_none());
            report.insane_bars += usize::from(!missing && !bar.is_sane());
        }
    }
    reports
}
