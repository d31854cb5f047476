//! Repository state models

use serde::{Deserialize, Serialize};

/// Operation the repository is currently in the middle of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepositoryOperationState {
    Normal,
    Merging,
    Rebasing,
    CherryPicking,
    Reverting,
    Bisecting,
}

impl RepositoryOperationState {
    /// Whether this operation can leave conflicted files behind
    pub fn is_conflict_bearing(self) -> bool {
        matches!(
            self,
            RepositoryOperationState::Merging
                | RepositoryOperationState::Rebasing
                | RepositoryOperationState::CherryPicking
                | RepositoryOperationState::Reverting
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RepositoryOperationState::Normal => "normal",
            RepositoryOperationState::Merging => "merging",
            RepositoryOperationState::Rebasing => "rebasing",
            RepositoryOperationState::CherryPicking => "cherryPicking",
            RepositoryOperationState::Reverting => "reverting",
            RepositoryOperationState::Bisecting => "bisecting",
        }
    }
}

impl std::fmt::Display for RepositoryOperationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step counters of an in-flight rebase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebaseProgress {
    pub current: u32,
    pub total: u32,
}

/// Snapshot returned to callers polling repository state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStateInfo {
    pub operation: RepositoryOperationState,
    pub current_branch: Option<String>,
    pub rebase_progress: Option<RebaseProgress>,
    pub index_locked: bool,
}
