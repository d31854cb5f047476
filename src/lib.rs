//! MergePilot - conflict resolution and interactive rebase engine
//!
//! Detects in-progress merges, rebases and cherry-picks, parses conflict
//! markers, applies resolutions, drives interactive rebase plans and keeps
//! an undo/redo history of destructive git operations.

pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod test_utils;

use std::path::Path;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use config::EngineConfig;
pub use error::{MergePilotError, Result};

use config::default_config_dir;
use services::{create_session_state, SessionState};

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over `config.log_filter`. Safe to call more than once;
/// only the first call installs anything.
pub fn init_tracing(config: &EngineConfig) {
    let installed = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Starting MergePilot");
    }
}

/// Load the engine config, install tracing and create the session registry
///
/// `config_dir` defaults to the per-user config directory.
pub fn init(config_dir: Option<&Path>) -> Result<SessionState> {
    let config = match config_dir {
        Some(dir) => EngineConfig::load(dir)?,
        None => EngineConfig::load(&default_config_dir())?,
    };
    init_tracing(&config);
    tracing::debug!(?config, "loaded engine config");
    Ok(create_session_state(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_uses_saved_config() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig {
            undo_capacity: 5,
            log_filter: "mergepilot=warn".to_string(),
            ..Default::default()
        };
        config.save(dir.path()).unwrap();

        let state = init(Some(dir.path())).unwrap();
        assert_eq!(state.config(), &config);

        // A second init keeps the first subscriber
        init(Some(dir.path())).unwrap();
    }

    #[test]
    fn test_init_with_broken_config_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("mergepilot.json"), "{ not json").unwrap();
        assert!(init(Some(dir.path())).is_err());
    }
}
