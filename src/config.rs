// Configuration loaded from config.yaml in the store directory

use crate::storage::Backend;
use crate::store::DEFAULT_KEY;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    /// Key the task list is persisted under
    pub storage_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            storage_key: DEFAULT_KEY.to_string(),
        }
    }
}

impl Config {
    /// Read `config.yaml` from `dir`, or defaults if it doesn't exist
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            debug!(path = ?path, "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config =
            serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;

        debug!(path = ?path, ?config, "Loaded config");
        Ok(config)
    }
}

/// Default store directory: the platform data dir, else `./.tasklist`
pub fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("tasklist"))
        .unwrap_or_else(|| PathBuf::from(".tasklist"))
}
