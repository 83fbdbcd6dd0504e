use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::constants::{DEFAULT_AUTOSAVE_SECS, DEFAULT_SAVE_PATH};
use crate::generation::ValidationPolicy;
use crate::logging::TracingConfig;
use crate::tower::FailedNodePolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("RON write error: {0}")]
    RonWrite(#[from] ron::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Session configuration for a [`crate::tower::TowerManager`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TowerConfig {
    /// 0 generates unseeded floors
    pub tower_seed: u64,
    /// Key handed to the progress store
    pub save_path: String,
    /// Seconds between autosaves; 0 disables
    pub autosave_interval_secs: f32,
    pub failed_node_policy: FailedNodePolicy,
    pub validation: ValidationPolicy,
    pub tracing: TracingConfig,
}

impl Default for TowerConfig {
    fn default() -> Self {
        Self {
            tower_seed: 0,
            save_path: DEFAULT_SAVE_PATH.to_string(),
            autosave_interval_secs: DEFAULT_AUTOSAVE_SECS,
            failed_node_policy: FailedNodePolicy::Retry,
            validation: ValidationPolicy::Lenient,
            tracing: TracingConfig::default(),
        }
    }
}

impl TowerConfig {
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Load from disk. `.json` files are parsed as JSON, anything else as RON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Ok(serde_json::from_str(&text)?)
        } else {
            Self::from_ron(&text)
        }
    }

    pub fn autosave_enabled(&self) -> bool {
        self.autosave_interval_secs.is_finite() && self.autosave_interval_secs > 0.0
    }
}
