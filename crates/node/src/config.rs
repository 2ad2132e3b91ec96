//! Node Configuration

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Data directory for persistent state
    pub data_dir: PathBuf,
    /// Save state every N blocks (0 = only at the end of a run)
    pub save_interval: u64,
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            save_interval: 100,
            log_level: "info".to_string(),
        }
    }
}

impl NodeConfig {
    /// Load a JSON config file, missing fields take their defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {:?}", path))?;
        serde_json::from_str(&raw).with_context(|| format!("invalid config {:?}", path))
    }
}
