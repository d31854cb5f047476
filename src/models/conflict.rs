//! Conflict-related model types

use serde::{Deserialize, Serialize};

use super::repository::{RebaseProgress, RepositoryOperationState};

/// How a single conflict hunk is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictResolution {
    Ours,
    Theirs,
    /// Ours followed by theirs
    Both,
    /// Caller-provided replacement lines
    Manual,
}

/// Side taken when a whole file is resolved through git checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileSide {
    Ours,
    Theirs,
}

impl FileSide {
    pub fn checkout_flag(self) -> &'static str {
        match self {
            FileSide::Ours => "--ours",
            FileSide::Theirs => "--theirs",
        }
    }
}

/// One `<<<<<<<` ... `>>>>>>>` block parsed from a working-tree file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictHunk {
    /// `hunk-N`, stable only within one parse
    pub id: String,
    /// 0-based line of the opening marker
    pub start_line: usize,
    /// 0-based line of the closing marker (inclusive)
    pub end_line: usize,
    pub ours_content: Vec<String>,
    pub theirs_content: Vec<String>,
    /// Only present for diff3-style markers
    pub base_content: Option<Vec<String>>,
    pub ours_label: String,
    pub theirs_label: String,
    pub base_label: Option<String>,
    pub resolved: bool,
    pub resolution: Option<ConflictResolution>,
    pub resolved_content: Option<Vec<String>>,
}

impl ConflictHunk {
    /// Lines that replace the whole marker block for a given resolution
    pub fn replacement_lines(
        &self,
        resolution: ConflictResolution,
        custom_content: Option<&[String]>,
    ) -> Vec<String> {
        match resolution {
            ConflictResolution::Ours => self.ours_content.clone(),
            ConflictResolution::Theirs => self.theirs_content.clone(),
            ConflictResolution::Both => self
                .ours_content
                .iter()
                .chain(self.theirs_content.iter())
                .cloned()
                .collect(),
            ConflictResolution::Manual => custom_content.map(<[String]>::to_vec).unwrap_or_default(),
        }
    }

    pub fn is_diff3(&self) -> bool {
        self.base_content.is_some()
    }
}

/// A working-tree file with its parsed conflict hunks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictedFile {
    /// Absolute path
    pub path: String,
    /// Path relative to the repository root
    pub relative_path: String,
    pub hunks: Vec<ConflictHunk>,
    pub resolved: bool,
    /// Raw text captured at parse time
    pub original_content: String,
}

/// Result of one conflict detection pass
///
/// Stale as soon as any git command runs; callers re-detect after every
/// mutating call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictState {
    pub operation: RepositoryOperationState,
    pub files: Vec<ConflictedFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_commit_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<RebaseProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_branch: Option<String>,
}

/// Resolution status of a file inside a paused rebase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictFileStatus {
    Unresolved,
    Resolved,
    Ours,
    Theirs,
}

/// A conflicted path as tracked by the rebase state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictFile {
    pub path: String,
    pub status: ConflictFileStatus,
    pub ours_content: Option<String>,
    pub theirs_content: Option<String>,
    pub merged_content: Option<String>,
}

/// Base/ours/theirs blobs read from index stages 1, 2 and 3
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeWayDiff {
    pub path: String,
    pub base: String,
    pub ours: String,
    pub theirs: String,
}

/// Success/failure result for operations that never throw across the boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub success: bool,
    pub message: Option<String>,
}

impl OperationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}
