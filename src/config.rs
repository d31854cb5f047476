//! Engine configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

const CONFIG_FILE: &str = "mergepilot.json";

fn default_git_executable() -> String {
    "git".to_string()
}

fn default_undo_capacity() -> usize {
    50
}

fn default_short_hash_length() -> usize {
    7
}

fn default_log_filter() -> String {
    "mergepilot=debug".to_string()
}

/// Settings shared by every repository session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Git binary to invoke; a bare name is resolved through PATH
    #[serde(default = "default_git_executable")]
    pub git_executable: String,

    /// Undo entries kept per repository before the oldest is evicted
    #[serde(default = "default_undo_capacity")]
    pub undo_capacity: usize,

    #[serde(default = "default_short_hash_length")]
    pub short_hash_length: usize,

    /// `tracing` filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            git_executable: default_git_executable(),
            undo_capacity: default_undo_capacity(),
            short_hash_length: default_short_hash_length(),
            log_filter: default_log_filter(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from disk; a missing file yields defaults
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save configuration to disk
    pub fn save(&self, config_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(config_dir)?;
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(config_dir.join(CONFIG_FILE), contents)?;
        Ok(())
    }
}

/// Per-user config directory, falling back to the temp dir
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("mergepilot")
}
