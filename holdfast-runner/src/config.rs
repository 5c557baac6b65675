//! Serializable run configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use holdfast_core::{ConfigError, Engine, FeatureAdapter, LifecycleConfig};

/// Unique identifier for a run configuration (content-addressable hash).
pub type RunId = String;

/// Errors reading or validating a run configuration file.
#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid engine config: {0}")]
    Invalid(#[from] ConfigError),
}

/// Everything needed to reproduce a run over a feature file.
///
/// ```toml
/// parallel = true
///
/// [engine]
/// entry_threshold = 0.75
/// exit_threshold = 0.25
/// persistence_bars = 4
///
/// [features]
/// regime_source = "chop_adx"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub engine: LifecycleConfig,
    pub features: FeatureAdapter,
    /// Fold instruments on the rayon pool.
    pub parallel: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            engine: LifecycleConfig::default(),
            features: FeatureAdapter::default(),
            parallel: true,
        }
    }
}

impl RunConfig {
    /// Parse and validate a TOML config.
    pub fn from_toml_str(s: &str) -> Result<Self, RunConfigError> {
        let config: RunConfig = toml::from_str(s)?;
        config.engine.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, RunConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| RunConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn build_engine(&self) -> Result<Engine, ConfigError> {
        Engine::new(&self.engine)
    }

    /// Deterministic hash of the settings that determine positions.
    ///
    /// Execution knobs such as `parallel` do not change output and are excluded.
    pub fn run_id(&self) -> RunId {
        // Serializing plain fields cannot fail.
        let json = serde_json::to_string(&(&self.engine, &self.features)).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
