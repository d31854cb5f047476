//! Interactive rebase command handlers
//!
//! Plan edits and execution steps all return the fresh `RebaseStatus` so
//! callers never need a second round trip to see the result.

use crate::commands::with_session;
use crate::error::{MergePilotError, Result};
use crate::models::{
    ConflictFileResolution, OperationResult, RebaseAction, RebaseCommit, RebaseStatus,
};
use crate::services::SessionState;

fn commit_not_found(hash: &str) -> MergePilotError {
    MergePilotError::OperationFailed(format!("Commit {} is not in the rebase plan", hash))
}

pub async fn get_rebase_status(state: &SessionState, path: String) -> Result<RebaseStatus> {
    with_session(state, &path, |session| Ok(session.rebase.status())).await
}

/// Plan the commits between `onto` and HEAD
pub async fn load_rebase_plan(
    state: &SessionState,
    path: String,
    onto: String,
) -> Result<RebaseStatus> {
    with_session(state, &path, |session| {
        session.rebase.load_rebase_plan(&onto)?;
        Ok(session.rebase.status())
    })
    .await
}

/// Plan an explicit commit list, oldest first
pub async fn init_rebase_plan(
    state: &SessionState,
    path: String,
    commits: Vec<RebaseCommit>,
    onto: String,
    branch: String,
) -> Result<RebaseStatus> {
    with_session(state, &path, |session| {
        session.rebase.init_rebase_plan(commits, &onto, &branch)?;
        Ok(session.rebase.status())
    })
    .await
}

pub async fn set_rebase_action(
    state: &SessionState,
    path: String,
    hash: String,
    action: RebaseAction,
) -> Result<RebaseStatus> {
    with_session(state, &path, |session| {
        if !session.rebase.set_commit_action(&hash, action)? {
            return Err(commit_not_found(&hash));
        }
        Ok(session.rebase.status())
    })
    .await
}

pub async fn set_all_rebase_actions(
    state: &SessionState,
    path: String,
    action: RebaseAction,
) -> Result<RebaseStatus> {
    with_session(state, &path, |session| {
        session.rebase.set_all_actions(action)?;
        Ok(session.rebase.status())
    })
    .await
}

pub async fn reword_rebase_commit(
    state: &SessionState,
    path: String,
    hash: String,
    message: String,
) -> Result<RebaseStatus> {
    with_session(state, &path, |session| {
        if !session.rebase.reword_commit(&hash, &message)? {
            return Err(commit_not_found(&hash));
        }
        Ok(session.rebase.status())
    })
    .await
}

pub async fn move_rebase_commit(
    state: &SessionState,
    path: String,
    from: usize,
    to: usize,
) -> Result<RebaseStatus> {
    with_session(state, &path, |session| {
        session.rebase.move_commit(from, to)?;
        Ok(session.rebase.status())
    })
    .await
}

pub async fn swap_rebase_commits(
    state: &SessionState,
    path: String,
    a: usize,
    b: usize,
) -> Result<RebaseStatus> {
    with_session(state, &path, |session| {
        session.rebase.swap_commits(a, b)?;
        Ok(session.rebase.status())
    })
    .await
}

pub async fn reset_rebase_plan(state: &SessionState, path: String) -> Result<RebaseStatus> {
    with_session(state, &path, |session| {
        session.rebase.reset_to_original()?;
        Ok(session.rebase.status())
    })
    .await
}

pub async fn clear_rebase_plan(state: &SessionState, path: String) -> Result<RebaseStatus> {
    with_session(state, &path, |session| {
        session.rebase.clear_plan()?;
        Ok(session.rebase.status())
    })
    .await
}

/// Validation messages for the current plan; empty when it can run
pub async fn validate_rebase_plan(state: &SessionState, path: String) -> Result<Vec<String>> {
    with_session(state, &path, |session| Ok(session.rebase.validate_plan())).await
}

pub async fn start_rebase(state: &SessionState, path: String) -> Result<RebaseStatus> {
    with_session(state, &path, |session| session.start_rebase()).await
}

pub async fn continue_rebase(state: &SessionState, path: String) -> Result<RebaseStatus> {
    with_session(state, &path, |session| session.rebase.continue_rebase()).await
}

pub async fn skip_rebase_commit(state: &SessionState, path: String) -> Result<RebaseStatus> {
    with_session(state, &path, |session| session.rebase.skip_commit()).await
}

pub async fn abort_rebase(state: &SessionState, path: String) -> Result<RebaseStatus> {
    with_session(state, &path, |session| session.rebase.abort_rebase()).await
}

pub async fn resolve_rebase_conflict_file(
    state: &SessionState,
    path: String,
    file_path: String,
    resolution: ConflictFileResolution,
) -> Result<OperationResult> {
    with_session(state, &path, |session| {
        Ok(session.rebase.resolve_conflict_file(&file_path, resolution))
    })
    .await
}

pub async fn mark_rebase_conflict_resolved(
    state: &SessionState,
    path: String,
    file_path: String,
) -> Result<OperationResult> {
    with_session(state, &path, |session| {
        Ok(session.rebase.mark_conflict_file_resolved(&file_path))
    })
    .await
}
