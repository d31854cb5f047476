//! Undo/redo ledger for destructive git operations
//!
//! Entries are process-local and scoped to one repository. Undo and redo
//! shell out to git; a failed step puts the entry back where it came from
//! so no history is lost.

use std::collections::VecDeque;

use crate::error::{MergePilotError, Result};
use crate::models::{OperationKind, UndoState, UndoableOperation};
use crate::utils::GitCli;

pub const DEFAULT_UNDO_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct UndoRedoLedger {
    /// Oldest at the front
    undo: VecDeque<UndoableOperation>,
    redo: Vec<UndoableOperation>,
    capacity: usize,
}

impl Default for UndoRedoLedger {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_CAPACITY)
    }
}

impl UndoRedoLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record an operation; clears redo and evicts the oldest entries past capacity
    pub fn push(&mut self, op: UndoableOperation) {
        tracing::debug!(id = %op.id, kind = op.kind.type_name(), "recording undoable operation");
        self.undo.push_back(op);
        self.redo.clear();
        self.trim();
    }

    fn trim(&mut self) {
        while self.undo.len() > self.capacity {
            self.undo.pop_front();
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn state(&self) -> UndoState {
        UndoState {
            undo: self.undo.iter().rev().cloned().collect(),
            redo: self.redo.iter().rev().cloned().collect(),
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }

    /// Reverse the most recent operation and move it onto the redo stack
    pub fn undo(&mut self, git: &GitCli) -> Result<UndoableOperation> {
        let mut op = self.undo.pop_back().ok_or(MergePilotError::NothingToUndo)?;

        if let Err(e) = apply_undo(git, &mut op.kind) {
            tracing::warn!(id = %op.id, "Undo of {} failed: {}", op.kind.type_name(), e);
            self.undo.push_back(op);
            return Err(e);
        }

        tracing::info!(id = %op.id, kind = op.kind.type_name(), "undid operation");
        self.redo.push(op.clone());
        Ok(op)
    }

    /// Re-apply the most recently undone operation
    ///
    /// Operations without enough recorded state to replay are rejected
    /// before either stack changes.
    pub fn redo(&mut self, git: &GitCli) -> Result<UndoableOperation> {
        let op = self.redo.last().ok_or(MergePilotError::NothingToRedo)?;
        if !op.kind.is_redoable() {
            return Err(MergePilotError::Irreversible(format!(
                "redone: {} has no recorded target",
                op.kind.type_name()
            )));
        }

        let Some(op) = self.redo.pop() else {
            return Err(MergePilotError::NothingToRedo);
        };

        if let Err(e) = apply_redo(git, &op.kind) {
            tracing::warn!(id = %op.id, "Redo of {} failed: {}", op.kind.type_name(), e);
            self.redo.push(op);
            return Err(e);
        }

        tracing::info!(id = %op.id, kind = op.kind.type_name(), "redid operation");
        self.undo.push_back(op.clone());
        self.trim();
        Ok(op)
    }
}

fn apply_undo(git: &GitCli, kind: &mut OperationKind) -> Result<()> {
    match kind {
        OperationKind::Commit { .. } => {
            git.run(&["reset", "--soft", "HEAD~1"])?;
        }
        OperationKind::Rebase { original_head, .. } => {
            git.run(&["reset", "--hard", original_head.as_str()])?;
        }
        OperationKind::CherryPick {
            original_head,
            new_head,
            ..
        }
        | OperationKind::Merge {
            original_head,
            new_head,
            ..
        } => {
            let current = git.head_oid();
            git.run(&["reset", "--hard", original_head.as_str()])?;
            // A conflicted operation never moved HEAD, so there is nothing to redo
            *new_head = current.filter(|head| head.as_str() != original_head.as_str());
        }
        OperationKind::Checkout {
            previous_branch, ..
        } => {
            git.run(&["checkout", previous_branch.as_str()])?;
        }
        OperationKind::Stash { .. } => {
            git.run(&["stash", "pop", "stash@{0}"])?;
        }
    }
    Ok(())
}

fn apply_redo(git: &GitCli, kind: &OperationKind) -> Result<()> {
    match kind {
        OperationKind::CherryPick {
            new_head: Some(head),
            ..
        }
        | OperationKind::Merge {
            new_head: Some(head),
            ..
        } => {
            git.run(&["reset", "--hard", head.as_str()])?;
        }
        OperationKind::Checkout { branch, .. } => {
            git.run(&["checkout", branch.as_str()])?;
        }
        OperationKind::Stash { message } => match message {
            Some(message) => {
                git.run(&["stash", "push", "-m", message.as_str()])?;
            }
            None => {
                git.run(&["stash", "push"])?;
            }
        },
        other => {
            return Err(MergePilotError::Irreversible(format!(
                "redone: {}",
                other.type_name()
            )));
        }
    }
    Ok(())
}
