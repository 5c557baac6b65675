//! HoldFast Runner: run orchestration, diagnostics, artifacts.
//!
//! This crate builds on `holdfast-core` to provide:
//! - TOML run configuration with deterministic run IDs
//! - Feature CSV loading with missing-value handling
//! - Single-run orchestration with data-quality logging
//! - Per-instrument turnover diagnostics
//! - JSON/CSV artifact export with schema versioning
//! - Deterministic synthetic feature generation

pub mod config;
pub mod data_loader;
pub mod diagnostics;
pub mod export;
pub mod runner;
pub mod synthetic;

pub use config::{RunConfig, RunConfigError, RunId};
pub use data_loader::{load_feature_rows, read_feature_rows, LoadError};
pub use diagnostics::{compute_all, compute_turnover, TurnoverDiagnostics};
pub use export::{export_json, export_positions_csv, import_json, load_artifacts, save_artifacts};
pub use runner::{run_from_file, run_positions, DataQualityReport, RunError, RunResult, SCHEMA_VERSION};
pub use synthetic::{generate_synthetic_rows, save_synthetic_csv, write_feature_csv};
