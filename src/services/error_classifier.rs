//! Git error classification
//!
//! Maps raw git stderr onto a closed set of error codes. Patterns are tried
//! top to bottom and the first match wins, so more specific patterns (a
//! rebase stopping on `could not apply`) sit above the generic ones they
//! would otherwise be swallowed by (`Merge conflict in`).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::MergePilotError;

/// Closed taxonomy of git failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GitErrorCode {
    NotARepository,
    MergeConflict,
    RebaseConflict,
    UncommittedChanges,
    BranchExists,
    CannotDeleteCurrent,
    DetachedHead,
    PushRejected,
    BranchNotFound,
    CommitNotFound,
    NothingToCommit,
    LockFileExists,
    InvalidBranchName,
    RebaseInProgress,
    MergeInProgress,
    CherryPickInProgress,
    StashNotFound,
    NoRemote,
    ShallowCloneLimit,
    UnknownGitError,
}

impl GitErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            GitErrorCode::NotARepository => "NOT_A_REPOSITORY",
            GitErrorCode::MergeConflict => "MERGE_CONFLICT",
            GitErrorCode::RebaseConflict => "REBASE_CONFLICT",
            GitErrorCode::UncommittedChanges => "UNCOMMITTED_CHANGES",
            GitErrorCode::BranchExists => "BRANCH_EXISTS",
            GitErrorCode::CannotDeleteCurrent => "CANNOT_DELETE_CURRENT",
            GitErrorCode::DetachedHead => "DETACHED_HEAD",
            GitErrorCode::PushRejected => "PUSH_REJECTED",
            GitErrorCode::BranchNotFound => "BRANCH_NOT_FOUND",
            GitErrorCode::CommitNotFound => "COMMIT_NOT_FOUND",
            GitErrorCode::NothingToCommit => "NOTHING_TO_COMMIT",
            GitErrorCode::LockFileExists => "LOCK_FILE_EXISTS",
            GitErrorCode::InvalidBranchName => "INVALID_BRANCH_NAME",
            GitErrorCode::RebaseInProgress => "REBASE_IN_PROGRESS",
            GitErrorCode::MergeInProgress => "MERGE_IN_PROGRESS",
            GitErrorCode::CherryPickInProgress => "CHERRY_PICK_IN_PROGRESS",
            GitErrorCode::StashNotFound => "STASH_NOT_FOUND",
            GitErrorCode::NoRemote => "NO_REMOTE",
            GitErrorCode::ShallowCloneLimit => "SHALLOW_CLONE_LIMIT",
            GitErrorCode::UnknownGitError => "UNKNOWN_GIT_ERROR",
        }
    }

    /// Fixed user-facing message for the code
    pub fn template(self) -> &'static str {
        match self {
            GitErrorCode::NotARepository => "This folder is not a git repository.",
            GitErrorCode::MergeConflict => {
                "Merge conflicts detected. Resolve the conflicts and continue the merge."
            }
            GitErrorCode::RebaseConflict => {
                "The rebase stopped on a conflict. Resolve the conflicts and continue the rebase."
            }
            GitErrorCode::UncommittedChanges => {
                "You have uncommitted changes. Commit or stash them before continuing."
            }
            GitErrorCode::BranchExists => "A branch with that name already exists.",
            GitErrorCode::CannotDeleteCurrent => "The currently checked out branch cannot be deleted.",
            GitErrorCode::DetachedHead => "HEAD is detached. Check out a branch first.",
            GitErrorCode::PushRejected => {
                "Push was rejected by the remote. Pull the latest changes and try again."
            }
            GitErrorCode::BranchNotFound => "The branch could not be found.",
            GitErrorCode::CommitNotFound => "The commit could not be found.",
            GitErrorCode::NothingToCommit => "There is nothing to commit.",
            GitErrorCode::LockFileExists => {
                "Another git process is running or left a lock file behind (index.lock)."
            }
            GitErrorCode::InvalidBranchName => "The branch name is not valid.",
            GitErrorCode::RebaseInProgress => "A rebase is already in progress.",
            GitErrorCode::MergeInProgress => "A merge is already in progress.",
            GitErrorCode::CherryPickInProgress => "A cherry-pick is already in progress.",
            GitErrorCode::StashNotFound => "The stash entry could not be found.",
            GitErrorCode::NoRemote => "No remote repository is configured.",
            GitErrorCode::ShallowCloneLimit => {
                "The operation needs history that is missing from this shallow clone."
            }
            GitErrorCode::UnknownGitError => "Git reported an unexpected error.",
        }
    }

    /// Conditions the user can fix from inside the client
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            GitErrorCode::MergeConflict
                | GitErrorCode::RebaseConflict
                | GitErrorCode::UncommittedChanges
                | GitErrorCode::LockFileExists
                | GitErrorCode::RebaseInProgress
                | GitErrorCode::MergeInProgress
                | GitErrorCode::CherryPickInProgress
        )
    }
}

impl std::fmt::Display for GitErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified git failure
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct GitError {
    pub code: GitErrorCode,
    pub message: String,
    pub recoverable: bool,
    /// Raw git output the classification was made from
    pub details: Option<String>,
}

impl GitError {
    pub fn new(code: GitErrorCode, raw: &str) -> Self {
        let raw = raw.trim();
        let message = match code {
            GitErrorCode::UnknownGitError if !raw.is_empty() => raw.to_string(),
            _ => code.template().to_string(),
        };

        GitError {
            code,
            message,
            recoverable: code.is_recoverable(),
            details: if raw.is_empty() {
                None
            } else {
                Some(raw.to_string())
            },
        }
    }
}

struct ErrorPattern {
    regex: Regex,
    code: GitErrorCode,
}

fn pattern(expr: &str, code: GitErrorCode) -> ErrorPattern {
    ErrorPattern {
        regex: Regex::new(expr).expect("static git error pattern must compile"),
        code,
    }
}

static PATTERNS: Lazy<Vec<ErrorPattern>> = Lazy::new(|| {
    vec![
        pattern(r"(?i)not a git repository", GitErrorCode::NotARepository),
        // Lock contention (before anything mentioning a ref or file name)
        pattern(
            r"(?i)index\.lock|unable to create '[^']*\.lock'|another git process seems to be running",
            GitErrorCode::LockFileExists,
        ),
        // Operations already in flight
        pattern(
            r"(?i)you have not concluded your merge|merge_head exists|merging is not possible because you have unmerged files",
            GitErrorCode::MergeInProgress,
        ),
        pattern(
            r"(?i)already a rebase-(merge|apply) directory|rebase-merge directory|a rebase is already in progress",
            GitErrorCode::RebaseInProgress,
        ),
        pattern(
            r"(?i)cherry-pick is already in progress|you are in the middle of a cherry-pick|cherry_pick_head",
            GitErrorCode::CherryPickInProgress,
        ),
        // Conflicts: a rebase step failing also prints "Merge conflict in"
        pattern(
            r"(?i)could not apply [0-9a-f]+|resolve all conflicts manually",
            GitErrorCode::RebaseConflict,
        ),
        pattern(
            r"(?i)merge conflict in|conflict \(|automatic merge failed|fix conflicts and then commit",
            GitErrorCode::MergeConflict,
        ),
        pattern(
            r"(?i)your local changes to the following files would be overwritten|please commit your changes or stash them|you have unstaged changes|cannot (rebase|pull|switch).*(unstaged|uncommitted) changes|your index contains uncommitted changes",
            GitErrorCode::UncommittedChanges,
        ),
        pattern(
            r"(?i)a branch named '[^']+' already exists",
            GitErrorCode::BranchExists,
        ),
        pattern(
            r"(?i)cannot delete (the )?branch '[^']+' (checked out|used by worktree)|cannot delete the branch you are currently on",
            GitErrorCode::CannotDeleteCurrent,
        ),
        pattern(
            r"(?i)you are not currently on a branch|head detached",
            GitErrorCode::DetachedHead,
        ),
        pattern(
            r"(?i)\[rejected\]|failed to push some refs|non-fast-forward|updates were rejected",
            GitErrorCode::PushRejected,
        ),
        pattern(
            r"(?i)is not a valid branch name|not a valid ref name",
            GitErrorCode::InvalidBranchName,
        ),
        pattern(
            r"(?i)no stash entries found|stash@\{\d+\} is not a valid reference|is not a stash-like commit|no stash found",
            GitErrorCode::StashNotFound,
        ),
        pattern(
            r"(?i)branch '[^']+' not found|pathspec '[^']+' did not match any file\(s\) known to git|invalid reference:",
            GitErrorCode::BranchNotFound,
        ),
        pattern(
            r"(?i)unknown revision|bad revision|not a valid object name|bad object|needed a single revision|invalid upstream",
            GitErrorCode::CommitNotFound,
        ),
        pattern(
            r"(?i)nothing to commit|no changes added to commit|nothing added to commit",
            GitErrorCode::NothingToCommit,
        ),
        pattern(
            r"(?i)no configured push destination|does not appear to be a git repository|no remote repository specified|no such remote",
            GitErrorCode::NoRemote,
        ),
        pattern(
            r"(?i)shallow (update|file|clone|repository)|--unshallow",
            GitErrorCode::ShallowCloneLimit,
        ),
    ]
});

/// Classify raw git output; unmatched text becomes `UNKNOWN_GIT_ERROR`
pub fn classify_message(message: &str) -> GitError {
    let code = PATTERNS
        .iter()
        .find(|p| p.regex.is_match(message))
        .map(|p| p.code)
        .unwrap_or(GitErrorCode::UnknownGitError);

    tracing::debug!(code = %code, "classified git error");
    GitError::new(code, message)
}

/// Classify any engine error; already-classified errors pass through unchanged
pub fn classify_error(error: &MergePilotError) -> GitError {
    match error {
        MergePilotError::GitCommand(git_error) => git_error.clone(),
        MergePilotError::Git(err) => classify_message(err.message()),
        other => classify_message(&other.to_string()),
    }
}
