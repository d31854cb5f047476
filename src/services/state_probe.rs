//! Repository state detection from `.git` sentinel files
//!
//! Every read here fails soft: a missing or unparsable sentinel yields
//! `None` rather than an error.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{RebaseProgress, RepositoryOperationState, RepositoryStateInfo};

static MERGE_MSG_BRANCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Merge (?:remote-tracking )?branch '([^']+)'")
        .expect("static merge message pattern must compile")
});

/// Read-only view of a repository's in-progress operation
#[derive(Debug, Clone)]
pub struct RepositoryStateProbe {
    workdir: PathBuf,
    git_dir: PathBuf,
    short_len: usize,
}

impl RepositoryStateProbe {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        let workdir = workdir.into();
        let git_dir = resolve_git_dir(&workdir);
        Self {
            workdir,
            git_dir,
            short_len: 7,
        }
    }

    pub fn with_short_hash_length(mut self, short_len: usize) -> Self {
        self.short_len = short_len.max(4);
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Classify the current operation; the first matching sentinel wins
    pub fn detect_operation(&self) -> RepositoryOperationState {
        let state = if self.git_dir.join("MERGE_HEAD").exists() {
            RepositoryOperationState::Merging
        } else if self.git_dir.join("rebase-merge").exists()
            || self.git_dir.join("rebase-apply").exists()
        {
            RepositoryOperationState::Rebasing
        } else if self.git_dir.join("CHERRY_PICK_HEAD").exists() {
            RepositoryOperationState::CherryPicking
        } else if self.git_dir.join("REVERT_HEAD").exists() {
            RepositoryOperationState::Reverting
        } else if self.git_dir.join("BISECT_LOG").exists() {
            RepositoryOperationState::Bisecting
        } else {
            RepositoryOperationState::Normal
        };

        tracing::trace!(workdir = %self.workdir.display(), state = %state, "probed repository state");
        state
    }

    /// `(current, total)` step counters of an in-flight rebase
    pub fn rebase_progress(&self) -> Option<RebaseProgress> {
        let merge_dir = self.git_dir.join("rebase-merge");
        if merge_dir.exists() {
            return read_progress(&merge_dir.join("msgnum"), &merge_dir.join("end"));
        }

        let apply_dir = self.git_dir.join("rebase-apply");
        if apply_dir.exists() {
            return read_progress(&apply_dir.join("next"), &apply_dir.join("last"));
        }

        None
    }

    /// Full hash of the commit the rebase stopped on
    pub fn current_rebase_commit_full(&self) -> Option<String> {
        read_trimmed(&self.git_dir.join("rebase-merge").join("stopped-sha"))
            .or_else(|| read_trimmed(&self.git_dir.join("REBASE_HEAD")))
    }

    /// Short hash of the commit the rebase stopped on
    pub fn current_rebase_commit(&self) -> Option<String> {
        self.current_rebase_commit_full()
            .map(|hash| self.shorten(&hash))
    }

    /// First message line of the commit being replayed
    pub fn current_rebase_message(&self) -> Option<String> {
        read_first_line(&self.git_dir.join("rebase-merge").join("message"))
            .or_else(|| read_first_line(&self.git_dir.join("rebase-apply").join("msg")))
    }

    /// Short hash from `MERGE_HEAD`
    pub fn merge_head(&self) -> Option<String> {
        read_first_line(&self.git_dir.join("MERGE_HEAD")).map(|hash| self.shorten(&hash))
    }

    /// Branch being merged in, from `MERGE_MSG`, else the `MERGE_HEAD` short hash
    pub fn merge_source_branch(&self) -> Option<String> {
        read_first_line(&self.git_dir.join("MERGE_MSG"))
            .and_then(|line| {
                MERGE_MSG_BRANCH
                    .captures(&line)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
            })
            .or_else(|| self.merge_head())
    }

    /// Branch HEAD points at, or None when detached
    pub fn current_branch(&self) -> Option<String> {
        let head = read_trimmed(&self.git_dir.join("HEAD"))?;
        head.strip_prefix("ref: ")
            .map(|r| r.strip_prefix("refs/heads/").unwrap_or(r).to_string())
    }

    pub fn is_index_locked(&self) -> bool {
        self.git_dir.join("index.lock").exists()
    }

    pub fn state_info(&self) -> RepositoryStateInfo {
        RepositoryStateInfo {
            operation: self.detect_operation(),
            current_branch: self.current_branch(),
            rebase_progress: self.rebase_progress(),
            index_locked: self.is_index_locked(),
        }
    }

    fn shorten(&self, hash: &str) -> String {
        hash.chars().take(self.short_len).collect()
    }
}

/// `.git` may be a directory or a `gitdir: <path>` pointer file (worktrees)
fn resolve_git_dir(workdir: &Path) -> PathBuf {
    let dot_git = workdir.join(".git");
    if dot_git.is_file() {
        if let Some(target) = read_trimmed(&dot_git)
            .as_deref()
            .and_then(|content| content.strip_prefix("gitdir:"))
            .map(str::trim)
        {
            let target = Path::new(target);
            return if target.is_absolute() {
                target.to_path_buf()
            } else {
                workdir.join(target)
            };
        }
    }
    dot_git
}

fn read_trimmed(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn read_first_line(path: &Path) -> Option<String> {
    read_trimmed(path).and_then(|content| content.lines().next().map(|l| l.trim().to_string()))
}

fn read_counter(path: &Path) -> Option<u32> {
    read_trimmed(path)?.parse().ok()
}

fn read_progress(current: &Path, total: &Path) -> Option<RebaseProgress> {
    Some(RebaseProgress {
        current: read_counter(current)?,
        total: read_counter(total)?,
    })
}
