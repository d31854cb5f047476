//! Conflict detection and resolution command handlers

use std::path::Path;

use crate::commands::{with_session, with_session_read};
use crate::error::Result;
use crate::models::{
    ConflictResolution, ConflictState, ConflictedFile, FileSide, OperationResult,
    RepositoryStateInfo, ThreeWayDiff,
};
use crate::services::conflict_parser;
use crate::services::SessionState;

/// Current operation, branch and rebase progress
pub async fn get_repository_state(state: &SessionState, path: String) -> Result<RepositoryStateInfo> {
    with_session_read(state, &path, |session| Ok(session.probe().state_info())).await
}

/// Every conflicted file with its parsed hunks, or `None` when nothing is in progress
pub async fn detect_conflicts(state: &SessionState, path: String) -> Result<Option<ConflictState>> {
    with_session_read(state, &path, |session| Ok(session.applier().detect_conflicts())).await
}

/// Parse one file's conflict markers without touching it
pub async fn parse_conflicted_file(
    state: &SessionState,
    path: String,
    file_path: String,
) -> Result<Option<ConflictedFile>> {
    with_session_read(state, &path, |session| {
        let root = session.root();
        Ok(conflict_parser::parse_conflicted_file(&root.join(&file_path), root))
    })
    .await
}

pub async fn get_three_way_diff(
    state: &SessionState,
    path: String,
    file_path: String,
) -> Result<ThreeWayDiff> {
    with_session_read(state, &path, |session| {
        session.applier().get_three_way_diff(Path::new(&file_path))
    })
    .await
}

/// Resolve a single hunk; `custom_content` is only used for manual resolutions
pub async fn resolve_hunk(
    state: &SessionState,
    path: String,
    file_path: String,
    hunk_id: String,
    resolution: ConflictResolution,
    custom_content: Option<Vec<String>>,
) -> Result<OperationResult> {
    with_session(state, &path, |session| {
        Ok(session.applier().resolve_hunk(
            Path::new(&file_path),
            &hunk_id,
            resolution,
            custom_content.as_deref(),
        ))
    })
    .await
}

pub async fn resolve_all_hunks(
    state: &SessionState,
    path: String,
    file_path: String,
    resolution: ConflictResolution,
) -> Result<OperationResult> {
    with_session(state, &path, |session| {
        Ok(session
            .applier()
            .resolve_all_hunks(Path::new(&file_path), resolution))
    })
    .await
}

/// Take one side for the whole file
pub async fn resolve_file(
    state: &SessionState,
    path: String,
    file_path: String,
    side: FileSide,
) -> Result<OperationResult> {
    with_session(state, &path, |session| {
        Ok(session.applier().resolve_file(Path::new(&file_path), side))
    })
    .await
}

pub async fn mark_file_resolved(
    state: &SessionState,
    path: String,
    file_path: String,
) -> Result<OperationResult> {
    with_session(state, &path, |session| {
        Ok(session.applier().mark_file_resolved(Path::new(&file_path)))
    })
    .await
}

pub async fn write_resolved_content(
    state: &SessionState,
    path: String,
    file_path: String,
    content: String,
) -> Result<OperationResult> {
    with_session(state, &path, |session| {
        Ok(session
            .applier()
            .write_resolved_content(Path::new(&file_path), &content))
    })
    .await
}

pub async fn abort_merge(state: &SessionState, path: String) -> Result<OperationResult> {
    with_session(state, &path, |session| Ok(session.applier().abort_merge())).await
}

pub async fn continue_merge(state: &SessionState, path: String) -> Result<OperationResult> {
    with_session(state, &path, |session| Ok(session.applier().continue_merge())).await
}

/// Abort a rebase started outside the plan state machine
pub async fn abort_rebase(state: &SessionState, path: String) -> Result<OperationResult> {
    with_session(state, &path, |session| Ok(session.applier().abort_rebase())).await
}

pub async fn continue_rebase(state: &SessionState, path: String) -> Result<OperationResult> {
    with_session(state, &path, |session| Ok(session.applier().continue_rebase())).await
}

pub async fn skip_rebase_commit(state: &SessionState, path: String) -> Result<OperationResult> {
    with_session(state, &path, |session| Ok(session.applier().skip_rebase_commit())).await
}

pub async fn continue_cherry_pick(state: &SessionState, path: String) -> Result<OperationResult> {
    with_session(state, &path, |session| Ok(session.applier().continue_cherry_pick())).await
}

pub async fn abort_cherry_pick(state: &SessionState, path: String) -> Result<OperationResult> {
    with_session(state, &path, |session| Ok(session.applier().abort_cherry_pick())).await
}
