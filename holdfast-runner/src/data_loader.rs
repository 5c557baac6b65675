//! Feature file loading.
//!
//! Reads aligned feature rows from CSV. Required columns are `symbol` and
//! `timestamp` (RFC 3339); every other known column is optional. Empty
//! cells and `NaN` become missing values. The regime gate column accepts
//! `true`/`false` or a number.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

use holdfast_core::{FeatureRow, RegimeGate};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open feature file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("feature file is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("line {line}: invalid timestamp '{value}'")]
    Timestamp { line: u64, value: String },

    #[error("line {line}: invalid value '{value}' in column '{column}'")]
    InvalidValue {
        line: u64,
        column: String,
        value: String,
    },
}

const OPTIONAL_COLUMNS: [&str; 11] = [
    "score",
    "high",
    "low",
    "close",
    "atr",
    "regime_gate",
    "channel_high",
    "channel_low",
    "channel_mid",
    "chop",
    "adx",
];

/// Load feature rows from a CSV file.
pub fn load_feature_rows(path: &Path) -> Result<Vec<FeatureRow>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_feature_rows(file)
}

/// Read feature rows from any CSV source.
pub fn read_feature_rows<R: Read>(reader: R) -> Result<Vec<FeatureRow>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let index: HashMap<&str, usize> = headers.iter().enumerate().map(|(i, h)| (h, i)).collect();

    let symbol_idx = *index.get("symbol").ok_or(LoadError::MissingColumn("symbol"))?;
    let ts_idx = *index
        .get("timestamp")
        .ok_or(LoadError::MissingColumn("timestamp"))?;
    let optional: HashMap<&str, usize> = OPTIONAL_COLUMNS
        .iter()
        .filter_map(|c| index.get(c).map(|&i| (*c, i)))
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let raw_ts = record.get(ts_idx).unwrap_or("");
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| LoadError::Timestamp {
            line,
            value: raw_ts.to_string(),
        })?;
        let mut row = FeatureRow::empty(record.get(symbol_idx).unwrap_or(""), timestamp);

        let cell = |column: &str| optional.get(column).and_then(|&i| record.get(i));
        let number = |column: &'static str| -> Result<Option<f64>, LoadError> {
            match cell(column) {
                None => Ok(None),
                Some(v) => parse_optional_f64(v).map_err(|_| LoadError::InvalidValue {
                    line,
                    column: column.to_string(),
                    value: v.to_string(),
                }),
            }
        };

        row.score = number("score")?;
        row.high = number("high")?;
        row.low = number("low")?;
        row.close = number("close")?;
        row.atr = number("atr")?;
        row.channel_high = number("channel_high")?;
        row.channel_low = number("channel_low")?;
        row.channel_mid = number("channel_mid")?;
        row.chop = number("chop")?;
        row.adx = number("adx")?;
        row.regime_gate = match cell("regime_gate") {
            None => None,
            Some(v) => parse_gate(v).map_err(|_| LoadError::InvalidValue {
                line,
                column: "regime_gate".to_string(),
                value: v.to_string(),
            })?,
        };

        rows.push(row);
    }

    Ok(rows)
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC), or a bare date.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_optional_f64(s: &str) -> Result<Option<f64>, std::num::ParseFloatError> {
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    s.parse::<f64>().map(Some)
}

fn parse_gate(s: &str) -> Result<Option<RegimeGate>, std::num::ParseFloatError> {
    match s.to_ascii_lowercase().as_str() {
        "true" => Ok(Some(RegimeGate::Flag(true))),
        "false" => Ok(Some(RegimeGate::Flag(false))),
        _ => Ok(parse_optional_f64(s)?.map(RegimeGate::Level)),
    }
}
