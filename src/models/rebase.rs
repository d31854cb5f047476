//! Interactive rebase models

use serde::{Deserialize, Serialize};

use super::conflict::ConflictFile;
use super::repository::RebaseProgress;

/// Per-commit action in an interactive rebase todo list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RebaseAction {
    Pick,
    Reword,
    Edit,
    Squash,
    Fixup,
    Drop,
}

impl RebaseAction {
    /// Todo-list keyword understood by `git rebase -i`
    pub fn keyword(self) -> &'static str {
        match self {
            RebaseAction::Pick => "pick",
            RebaseAction::Reword => "reword",
            RebaseAction::Edit => "edit",
            RebaseAction::Squash => "squash",
            RebaseAction::Fixup => "fixup",
            RebaseAction::Drop => "drop",
        }
    }

    /// Actions that leave a commit other commits can be squashed into
    pub fn keeps_commit(self) -> bool {
        matches!(
            self,
            RebaseAction::Pick | RebaseAction::Reword | RebaseAction::Edit
        )
    }

    pub fn melds_into_previous(self) -> bool {
        matches!(self, RebaseAction::Squash | RebaseAction::Fixup)
    }
}

/// A commit in the rebase plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebaseCommit {
    pub hash: String,
    pub short_hash: String,
    pub message: String,
    pub author: String,
    /// RFC 3339 author date
    pub date: String,
    pub action: RebaseAction,
    /// Position in the list the plan was initialised from; never changes
    pub original_index: usize,
}

impl RebaseCommit {
    /// Build a plan entry from a git2 commit
    pub fn from_git2(commit: &git2::Commit, original_index: usize, short_len: usize) -> Self {
        let hash = commit.id().to_string();
        let short_hash = hash.chars().take(short_len).collect();
        let author = commit.author();
        let date = chrono::DateTime::from_timestamp(author.when().seconds(), 0)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();

        RebaseCommit {
            hash,
            short_hash,
            message: commit.message().unwrap_or("").trim_end().to_string(),
            author: author.name().unwrap_or("Unknown").to_string(),
            date,
            action: RebaseAction::Pick,
            original_index,
        }
    }

    /// First line of the commit message
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

/// Ordered, editable rebase plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebasePlan {
    /// Oldest first, in todo-list order
    pub commits: Vec<RebaseCommit>,
    pub onto: String,
    pub branch: String,
}

/// Lifecycle of an interactive rebase driven by this engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RebaseExecutionState {
    Idle,
    Planning,
    Executing,
    Paused,
    Conflicted,
    Completed,
    Aborted,
}

impl RebaseExecutionState {
    pub fn as_str(self) -> &'static str {
        match self {
            RebaseExecutionState::Idle => "idle",
            RebaseExecutionState::Planning => "planning",
            RebaseExecutionState::Executing => "executing",
            RebaseExecutionState::Paused => "paused",
            RebaseExecutionState::Conflicted => "conflicted",
            RebaseExecutionState::Completed => "completed",
            RebaseExecutionState::Aborted => "aborted",
        }
    }

    /// A git rebase is in flight and owned by the state machine
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            RebaseExecutionState::Executing
                | RebaseExecutionState::Paused
                | RebaseExecutionState::Conflicted
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RebaseExecutionState::Completed | RebaseExecutionState::Aborted
        )
    }
}

impl std::fmt::Display for RebaseExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The step a rebase stopped on and the files it left conflicted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebaseConflict {
    pub current_commit: RebaseCommit,
    pub files: Vec<ConflictFile>,
}

/// How a conflicted file is settled while a rebase is paused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "camelCase")]
pub enum ConflictFileResolution {
    Ours,
    Theirs,
    Merged(String),
}

/// Snapshot of the rebase state machine for polling callers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebaseStatus {
    pub state: RebaseExecutionState,
    pub plan: Option<RebasePlan>,
    pub original_plan: Option<RebasePlan>,
    pub conflict: Option<RebaseConflict>,
    pub progress: Option<RebaseProgress>,
    pub has_unresolved_conflicts: bool,
    pub can_start: bool,
    pub can_continue: bool,
}
