//! HoldFast Core: position lifecycle engine, regime gate, domain types.
//!
//! This crate turns a continuous, already-computed score series into a
//! discrete position series per instrument:
//! - Domain types (feature bars, positions, sides)
//! - Feature adapter from raw aligned feature rows
//! - Regime gate and CHOP/ADX regime classification
//! - Per-instrument lifecycle state machine (persistence, hysteresis,
//!   minimum hold, trailing stop, cooldown)
//! - Output emitter producing one position record per bar

pub mod domain;
pub mod emit;
pub mod engine;
pub mod features;
pub mod gate;

pub use domain::{Bar, ChannelBounds, Position, Side};
pub use emit::{LifecycleEvent, PositionRecord, PositionSeries};
pub use engine::{ConfigError, Engine, LifecycleConfig, SequenceOrderError};
pub use features::{FeatureAdapter, FeatureRow, RegimeSource, ScoreSource};
pub use gate::{gate_score, GateMode, MarketRegime, RegimeGate, RegimeThresholds};
