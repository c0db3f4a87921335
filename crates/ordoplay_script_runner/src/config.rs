// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runner configuration, stored as RON.

use ordoplay_script_graph::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "ordoplay_script.ron";

/// Log directives used when the config names none
pub const DEFAULT_LOG_FILTER: &str = "ordoplay_script_runner=info,ordoplay_script_graph=info";

/// Config errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the file failed
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Config path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The file is not a valid config
    #[error("Invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// What to run and how to log it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Script document to load
    pub script: Option<PathBuf>,
    /// `tracing` directives added on top of `RUST_LOG`
    pub log_filter: String,
    /// Events fired in order
    pub events: Vec<String>,
    /// State to start in instead of the script's initial state
    pub start_state: Option<String>,
    /// Variable values assigned before the first event
    pub variables: BTreeMap<String, Value>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            script: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            events: Vec::new(),
            start_state: None,
            variables: BTreeMap::new(),
        }
    }
}

impl RunnerConfig {
    /// Parse a config from RON
    pub fn from_ron(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }

    /// Load a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&content)
    }

    /// Load `path`, or the default file if it exists, or fall back to defaults
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Self::load(Path::new(DEFAULT_CONFIG_FILE)),
            None => Ok(Self::default()),
        }
    }
}
