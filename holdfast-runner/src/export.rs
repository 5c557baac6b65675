//! Artifact export: JSON manifest and CSV tables.
//!
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: position series and per-instrument turnover diagnostics
//!
//! Persisted manifests carry `schema_version`; newer versions are rejected
//! on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use holdfast_core::PositionRecord;

use crate::diagnostics::TurnoverDiagnostics;
use crate::runner::{RunResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(result: &RunResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize RunResult to JSON")
}

/// Deserialize a `RunResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunResult> {
    let result: RunResult =
        serde_json::from_str(json).context("failed to deserialize RunResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the position series as CSV.
///
/// Columns: symbol, timestamp, position, gated_score, event, missing_features,
/// channel_low, channel_mid, channel_high (channel cells empty when absent)
pub fn export_positions_csv(records: &[PositionRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "timestamp",
        "position",
        "gated_score",
        "event",
        "missing_features",
        "channel_low",
        "channel_mid",
        "channel_high",
    ])?;

    for r in records {
        let [low, mid, high] = match r.channel {
            Some(ch) => [ch.low, ch.mid, ch.high].map(|v| format!("{v:.6}")),
            None => Default::default(),
        };
        wtr.write_record([
            &r.symbol,
            &r.timestamp.to_rfc3339(),
            &r.label().to_string(),
            &format!("{:.6}", r.gated_score),
            &r.event.map(|e| e.to_string()).unwrap_or_default(),
            &r.missing_features.to_string(),
            &low,
            &mid,
            &high,
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export per-instrument turnover diagnostics as CSV.
pub fn export_diagnostics_csv(diagnostics: &[TurnoverDiagnostics]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "bars",
        "entries",
        "trailing_stop_exits",
        "hysteresis_exits",
        "bars_in_market",
        "exposure",
        "label_changes",
        "turnover_rate",
        "mean_holding_bars",
        "missing_feature_bars",
    ])?;

    for d in diagnostics {
        wtr.write_record([
            &d.symbol,
            &d.bars.to_string(),
            &d.entries.to_string(),
            &d.trailing_stop_exits.to_string(),
            &d.hysteresis_exits.to_string(),
            &d.bars_in_market.to_string(),
            &format!("{:.4}", d.exposure),
            &d.label_changes.to_string(),
            &format!("{:.4}", d.turnover_rate),
            &d.mean_holding_bars
                .map(|m| format!("{m:.2}"))
                .unwrap_or_default(),
            &d.missing_feature_bars.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a run.
///
/// Creates `run_{id prefix}/` under `output_dir` containing:
/// - `manifest.json`: the full `RunResult`
/// - `positions.csv`: one row per input bar
/// - `diagnostics.csv`: turnover metrics per instrument
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &RunResult, output_dir: &Path) -> Result<PathBuf> {
    let prefix: String = result.run_id.chars().take(12).collect();
    let run_dir = output_dir.join(format!("run_{prefix}"));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("manifest.json"), export_json(result)?)?;
    std::fs::write(
        run_dir.join("positions.csv"),
        export_positions_csv(&result.positions)?,
    )?;
    std::fs::write(
        run_dir.join("diagnostics.csv"),
        export_diagnostics_csv(&result.diagnostics)?,
    )?;

    Ok(run_dir)
}

/// Load a `RunResult` from an artifact directory's manifest.json.
pub fn load_artifacts(run_dir: &Path) -> Result<RunResult> {
    let path = run_dir.join("manifest.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
