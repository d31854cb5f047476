//! Undo/redo command handlers

use crate::commands::with_session;
use crate::error::Result;
use crate::models::{UndoState, UndoableOperation};
use crate::services::SessionState;

/// Both stacks, most recent first
pub async fn get_undo_state(state: &SessionState, path: String) -> Result<UndoState> {
    with_session(state, &path, |session| Ok(session.ledger.state())).await
}

/// Reverse the most recent operation
pub async fn undo(state: &SessionState, path: String) -> Result<UndoableOperation> {
    with_session(state, &path, |session| {
        let git = session.git().clone();
        session.ledger.undo(&git)
    })
    .await
}

/// Re-apply the most recently undone operation
pub async fn redo(state: &SessionState, path: String) -> Result<UndoableOperation> {
    with_session(state, &path, |session| {
        let git = session.git().clone();
        session.ledger.redo(&git)
    })
    .await
}
