//! Service layer for MergePilot
//!
//! This module contains the conflict and rebase engines that sit between
//! the command handlers and the git executable.

pub mod conflict_parser;
pub mod conflict_resolver;
pub mod error_classifier;
pub mod operations;
pub mod rebase_executor;
pub mod rebase_plan;
pub mod session;
pub mod state_probe;
pub mod undo_ledger;

pub use conflict_parser::{parse_conflict_markers, parse_conflicted_file};
pub use conflict_resolver::ConflictResolutionApplier;
pub use error_classifier::{classify_error, classify_message, GitError, GitErrorCode};
pub use operations::MergeOutcome;
pub use rebase_executor::RebaseExecutionStateMachine;
pub use rebase_plan::{load_rebase_commits, RebasePlanModel};
pub use session::{create_session_state, RepositorySession, SessionRegistry, SessionState};
pub use state_probe::RepositoryStateProbe;
pub use undo_ledger::UndoRedoLedger;
