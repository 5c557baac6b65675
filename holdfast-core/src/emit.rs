//! Output emitter: projects per-bar engine state into position records.
//!
//! One `PositionRecord` is emitted per input bar, in input order. The label is
//! taken after every transition for that bar has been applied.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ChannelBounds, Position, Side};

/// Transition that happened on a bar, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "side", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A position was opened.
    Entered(Side),
    /// The trailing stop closed the position.
    TrailingStop(Side),
    /// The score fell below the exit threshold (or flipped) after the minimum hold.
    HysteresisExit(Side),
    /// Entry evaluation was suppressed by the post-exit cooldown.
    CoolingDown,
}

impl LifecycleEvent {
    pub fn is_exit(self) -> bool {
        matches!(
            self,
            LifecycleEvent::TrailingStop(_) | LifecycleEvent::HysteresisExit(_)
        )
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Entered(side) => write!(f, "entered_{}", side.as_str()),
            LifecycleEvent::TrailingStop(side) => write!(f, "trailing_stop_{}", side.as_str()),
            LifecycleEvent::HysteresisExit(side) => write!(f, "hysteresis_exit_{}", side.as_str()),
            LifecycleEvent::CoolingDown => f.write_str("cooling_down"),
        }
    }
}

/// Public per-bar output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub position: Position,
    /// Score after regime gating and missing-feature handling (diagnostic).
    pub gated_score: f64,
    pub event: Option<LifecycleEvent>,
    /// True when the bar had a NaN/missing feature and was treated as "no signal".
    #[serde(default)]
    pub missing_features: bool,
    /// Channel bounds carried through from the bar, when the feature source has them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelBounds>,
}

impl PositionRecord {
    pub fn label(&self) -> i8 {
        self.position.label()
    }
}

/// Ordered output of an engine run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionSeries {
    records: Vec<PositionRecord>,
}

impl PositionSeries {
    pub fn new(records: Vec<PositionRecord>) -> Self {
        Self { records }
    }

    /// Concatenate per-instrument chunks, preserving chunk order.
    pub fn from_chunks(chunks: Vec<Vec<PositionRecord>>) -> Self {
        let total = chunks.iter().map(Vec::len).sum();
        let mut records = Vec::with_capacity(total);
        for chunk in chunks {
            records.extend(chunk);
        }
        Self { records }
    }

    pub fn records(&self) -> &[PositionRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<PositionRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Labels in output order.
    pub fn labels(&self) -> Vec<i8> {
        self.records.iter().map(PositionRecord::label).collect()
    }

    pub fn for_symbol<'a>(&'a self, symbol: &'a str) -> impl Iterator<Item = &'a PositionRecord> {
        self.records.iter().filter(move |r| r.symbol == symbol)
    }

    /// Distinct symbols in first-seen order.
    pub fn symbols(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for r in &self.records {
            if !out.contains(&r.symbol.as_str()) {
                out.push(&r.symbol);
            }
        }
        out
    }

    /// Latest record per symbol, which is what an execution consumer acts on.
    pub fn latest_by_symbol(&self) -> BTreeMap<&str, &PositionRecord> {
        let mut latest = BTreeMap::new();
        for r in &self.records {
            latest.insert(r.symbol.as_str(), r);
        }
        latest
    }
}
