//! Per-repository sessions
//!
//! A session owns the in-memory state tied to one working tree: the rebase
//! state machine and the undo ledger. Each session sits behind a read/write
//! lock: mutating commands take it for writing so git never sees two of
//! them at once, read-only probes share it so they never observe a
//! half-finished write.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::EngineConfig;
use crate::error::{MergePilotError, Result};
use crate::models::RebaseStatus;
use crate::services::conflict_resolver::ConflictResolutionApplier;
use crate::services::rebase_executor::RebaseExecutionStateMachine;
use crate::services::state_probe::RepositoryStateProbe;
use crate::services::undo_ledger::UndoRedoLedger;
use crate::utils::GitCli;

/// Resolve a path inside a repository to its working tree root
pub fn resolve_repo_root(path: &Path) -> Result<PathBuf> {
    let repo = git2::Repository::open(path)
        .map_err(|_| MergePilotError::RepositoryNotFound(path.display().to_string()))?;
    let workdir = repo
        .workdir()
        .ok_or_else(|| MergePilotError::InvalidPath(format!("{} is a bare repository", path.display())))?;

    Ok(std::fs::canonicalize(workdir).unwrap_or_else(|_| workdir.to_path_buf()))
}

pub struct RepositorySession {
    root: PathBuf,
    git: GitCli,
    probe: RepositoryStateProbe,
    applier: ConflictResolutionApplier,
    pub rebase: RebaseExecutionStateMachine,
    pub ledger: UndoRedoLedger,
}

impl RepositorySession {
    pub fn open(path: &Path, config: &EngineConfig) -> Result<Self> {
        let root = resolve_repo_root(path)?;
        let git = GitCli::new(config.git_executable.clone(), root.clone());
        let probe =
            RepositoryStateProbe::new(root.clone()).with_short_hash_length(config.short_hash_length);
        let applier = ConflictResolutionApplier::new(git.clone(), probe.clone());
        let rebase =
            RebaseExecutionStateMachine::new(git.clone(), probe.clone(), config.short_hash_length);

        tracing::debug!(root = %root.display(), "opened repository session");

        Ok(Self {
            root,
            git,
            probe,
            applier,
            rebase,
            ledger: UndoRedoLedger::new(config.undo_capacity),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn git(&self) -> &GitCli {
        &self.git
    }

    pub fn probe(&self) -> &RepositoryStateProbe {
        &self.probe
    }

    pub fn applier(&self) -> &ConflictResolutionApplier {
        &self.applier
    }

    /// Execute the rebase plan, recording it on this session's ledger
    pub fn start_rebase(&mut self) -> Result<RebaseStatus> {
        self.rebase.start_rebase(&mut self.ledger)
    }
}

/// Open sessions keyed by canonical repository root
pub struct SessionRegistry {
    config: EngineConfig,
    sessions: RwLock<HashMap<PathBuf, Arc<RwLock<RepositorySession>>>>,
}

impl SessionRegistry {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Session for the repository containing `path`, opened on first use
    pub async fn session(&self, path: &str) -> Result<Arc<RwLock<RepositorySession>>> {
        let root = resolve_repo_root(Path::new(path))?;

        if let Some(session) = self.sessions.read().await.get(&root) {
            return Ok(session.clone());
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(&root) {
            return Ok(session.clone());
        }

        let session = Arc::new(RwLock::new(RepositorySession::open(&root, &self.config)?));
        sessions.insert(root, session.clone());
        Ok(session)
    }

    /// Forget a repository's plan and history
    pub async fn close(&self, path: &str) -> Result<bool> {
        let root = resolve_repo_root(Path::new(path))?;
        Ok(self.sessions.write().await.remove(&root).is_some())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

pub type SessionState = Arc<SessionRegistry>;

/// Create the shared session registry
pub fn create_session_state(config: EngineConfig) -> SessionState {
    Arc::new(SessionRegistry::new(config))
}
