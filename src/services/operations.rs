//! Git operations that record themselves on the undo ledger
//!
//! Each function runs one porcelain command and, when HEAD or the stash
//! actually changed, pushes an `UndoableOperation` describing how to get
//! back. Merge and cherry-pick conflicts are reported in the returned
//! `MergeOutcome` rather than as errors.

use serde::{Deserialize, Serialize};

use crate::error::{MergePilotError, Result};
use crate::models::{ConflictState, OperationKind, UndoableOperation};
use crate::services::conflict_resolver::ConflictResolutionApplier;
use crate::services::error_classifier::{classify_message, GitError, GitErrorCode};
use crate::services::undo_ledger::UndoRedoLedger;
use crate::utils::GitCli;

/// Result of a merge or cherry-pick
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub success: bool,
    /// Present when git stopped with conflicted files
    pub conflicts: Option<ConflictState>,
    pub error: Option<GitError>,
}

fn require_head(git: &GitCli) -> Result<String> {
    git.head_oid().ok_or_else(|| {
        MergePilotError::OperationFailed("HEAD does not point to a commit".to_string())
    })
}

/// Run a HEAD-moving command and classify how it ended
///
/// `Ok(None)` means git succeeded; `Ok(Some(..))` means it stopped with
/// conflicts; any other failure, including another operation already in
/// progress, is an error.
fn run_conflicting(
    git: &GitCli,
    applier: &ConflictResolutionApplier,
    args: &[&str],
) -> Result<Option<MergeOutcome>> {
    let output = git.output(args)?;
    if output.success {
        return Ok(None);
    }

    let error = classify_message(&output.failure_message());
    if !matches!(
        error.code,
        GitErrorCode::MergeConflict | GitErrorCode::RebaseConflict
    ) {
        return Err(MergePilotError::GitCommand(error));
    }

    match applier.detect_conflicts() {
        Some(conflicts) => Ok(Some(MergeOutcome {
            success: false,
            conflicts: Some(conflicts),
            error: Some(error),
        })),
        None => Err(MergePilotError::GitCommand(error)),
    }
}

pub fn merge_branch(
    git: &GitCli,
    applier: &ConflictResolutionApplier,
    ledger: &mut UndoRedoLedger,
    branch: &str,
) -> Result<MergeOutcome> {
    let original_head = require_head(git)?;
    let outcome = run_conflicting(git, applier, &["merge", "--no-edit", branch])?;

    ledger.push(UndoableOperation::new(
        OperationKind::Merge {
            original_head,
            source_branch: branch.to_string(),
            new_head: None,
        },
        format!("Merge {}", branch),
    ));

    tracing::info!(branch, conflicted = outcome.is_some(), "merged branch");
    Ok(outcome.unwrap_or(MergeOutcome {
        success: true,
        conflicts: None,
        error: None,
    }))
}

pub fn cherry_pick(
    git: &GitCli,
    applier: &ConflictResolutionApplier,
    ledger: &mut UndoRedoLedger,
    commit: &str,
) -> Result<MergeOutcome> {
    let original_head = require_head(git)?;
    let outcome = run_conflicting(git, applier, &["cherry-pick", commit])?;

    ledger.push(UndoableOperation::new(
        OperationKind::CherryPick {
            original_head,
            commit: commit.to_string(),
            new_head: None,
        },
        format!("Cherry-pick {}", commit),
    ));

    tracing::info!(commit, conflicted = outcome.is_some(), "cherry-picked commit");
    Ok(outcome.unwrap_or(MergeOutcome {
        success: true,
        conflicts: None,
        error: None,
    }))
}

pub fn checkout_branch(git: &GitCli, ledger: &mut UndoRedoLedger, branch: &str) -> Result<()> {
    // Detached HEAD is recorded by commit so undo can still return to it
    let previous_branch = match git.run(&["symbolic-ref", "--quiet", "--short", "HEAD"]) {
        Ok(name) => name,
        Err(_) => require_head(git)?,
    };

    git.run(&["checkout", branch])?;

    ledger.push(UndoableOperation::new(
        OperationKind::Checkout {
            previous_branch: previous_branch.clone(),
            branch: branch.to_string(),
        },
        format!("Checkout {} from {}", branch, previous_branch),
    ));
    Ok(())
}

pub fn stash_save(git: &GitCli, ledger: &mut UndoRedoLedger, message: Option<&str>) -> Result<()> {
    let before = git.run(&["rev-parse", "--verify", "--quiet", "refs/stash"]).ok();

    let mut args = vec!["stash", "push"];
    if let Some(message) = message {
        args.extend(["-m", message]);
    }
    git.run(&args)?;

    let after = git.run(&["rev-parse", "--verify", "--quiet", "refs/stash"]).ok();
    if after.is_none() || after == before {
        return Err(MergePilotError::OperationFailed(
            "No local changes to save".to_string(),
        ));
    }

    ledger.push(UndoableOperation::new(
        OperationKind::Stash {
            message: message.map(str::to_string),
        },
        format!("Stash {}", message.unwrap_or("changes")),
    ));
    Ok(())
}

/// Stage everything and commit; returns the new commit hash
pub fn commit_all(git: &GitCli, ledger: &mut UndoRedoLedger, message: &str) -> Result<String> {
    git.run(&["add", "-A"])?;
    git.run(&["commit", "-m", message])?;
    let hash = require_head(git)?;

    let summary = message.lines().next().unwrap_or("");
    ledger.push(UndoableOperation::new(
        OperationKind::Commit {
            hash: Some(hash.clone()),
        },
        format!("Commit: {}", summary),
    ));
    Ok(hash)
}
