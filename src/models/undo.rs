//! Undo/redo history models

use serde::{Deserialize, Serialize};

/// Operation-specific snapshot needed to reverse a git operation
///
/// Serialized adjacently tagged, so an operation reads as
/// `{"type": "merge", "data": {...}}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum OperationKind {
    #[serde(rename_all = "camelCase")]
    Commit { hash: Option<String> },

    #[serde(rename_all = "camelCase")]
    Rebase {
        original_head: String,
        branch: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    CherryPick {
        original_head: String,
        commit: String,
        /// HEAD captured when the pick was undone, used by redo
        new_head: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    Merge {
        original_head: String,
        source_branch: String,
        new_head: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    Checkout {
        previous_branch: String,
        branch: String,
    },

    #[serde(rename_all = "camelCase")]
    Stash { message: Option<String> },
}

impl OperationKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            OperationKind::Commit { .. } => "commit",
            OperationKind::Rebase { .. } => "rebase",
            OperationKind::CherryPick { .. } => "cherryPick",
            OperationKind::Merge { .. } => "merge",
            OperationKind::Checkout { .. } => "checkout",
            OperationKind::Stash { .. } => "stash",
        }
    }

    /// Whether redo has enough recorded state to re-apply this operation
    pub fn is_redoable(&self) -> bool {
        match self {
            OperationKind::Commit { .. } | OperationKind::Rebase { .. } => false,
            OperationKind::CherryPick { new_head, .. } | OperationKind::Merge { new_head, .. } => {
                new_head.is_some()
            }
            OperationKind::Checkout { .. } | OperationKind::Stash { .. } => true,
        }
    }
}

/// A recorded destructive git operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoableOperation {
    pub id: String,
    #[serde(flatten)]
    pub kind: OperationKind,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    pub description: String,
}

impl UndoableOperation {
    pub fn new(kind: OperationKind, description: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            timestamp: chrono::Utc::now().timestamp_millis(),
            description: description.into(),
        }
    }
}

/// Undo/redo stacks as seen by callers, most recent first
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoState {
    pub undo: Vec<UndoableOperation>,
    pub redo: Vec<UndoableOperation>,
    pub can_undo: bool,
    pub can_redo: bool,
}
