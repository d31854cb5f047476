//! Conflict detection and resolution
//!
//! Hunk-level resolution always re-reads and re-parses the file from disk
//! before splicing, so a resolution never applies to a stale parse.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{
    ConflictHunk, ConflictResolution, ConflictState, FileSide, OperationResult,
    RepositoryOperationState, ThreeWayDiff,
};
use crate::services::conflict_parser::{parse_conflict_markers, parse_conflicted_file};
use crate::services::state_probe::RepositoryStateProbe;
use crate::utils::GitCli;

/// Applies conflict resolutions to one repository
#[derive(Debug, Clone)]
pub struct ConflictResolutionApplier {
    git: GitCli,
    probe: RepositoryStateProbe,
}

impl ConflictResolutionApplier {
    pub fn new(git: GitCli, probe: RepositoryStateProbe) -> Self {
        Self { git, probe }
    }

    pub fn repo_root(&self) -> &Path {
        self.git.workdir()
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.repo_root().join(path)
        }
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(self.repo_root())
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Probe the repository and parse every unmerged file
    ///
    /// Returns `None` when no merge, rebase, cherry-pick or revert is in
    /// progress.
    pub fn detect_conflicts(&self) -> Option<ConflictState> {
        let operation = self.probe.detect_operation();
        if !operation.is_conflict_bearing() {
            return None;
        }

        let paths = self.git.unmerged_paths().unwrap_or_else(|e| {
            tracing::warn!("Failed to list unmerged paths: {}", e);
            Vec::new()
        });

        let files = paths
            .iter()
            .filter_map(|rel| parse_conflicted_file(&self.repo_root().join(rel), self.repo_root()))
            .collect();

        let mut state = ConflictState {
            operation,
            files,
            current_commit: None,
            current_commit_message: None,
            progress: None,
            source_branch: None,
            target_branch: None,
        };

        match operation {
            RepositoryOperationState::Rebasing => {
                state.current_commit = self.probe.current_rebase_commit();
                state.current_commit_message = self.probe.current_rebase_message();
                state.progress = self.probe.rebase_progress();
            }
            RepositoryOperationState::Merging => {
                state.source_branch = self.probe.merge_source_branch();
                state.target_branch = self.probe.current_branch();
            }
            _ => {}
        }

        tracing::info!(
            operation = %operation,
            files = state.files.len(),
            "detected conflicts"
        );
        Some(state)
    }

    /// Replace one hunk's marker block with the chosen side and write the file
    pub fn resolve_hunk(
        &self,
        file: &Path,
        hunk_id: &str,
        resolution: ConflictResolution,
        custom_content: Option<&[String]>,
    ) -> OperationResult {
        let path = self.absolute(file);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                return OperationResult::failure(format!(
                    "File not found: {} ({})",
                    path.display(),
                    e
                ))
            }
        };

        let hunks = parse_conflict_markers(&content);
        let Some(hunk) = hunks.iter().find(|h| h.id == hunk_id) else {
            return OperationResult::failure(format!(
                "Hunk {} not found in {}",
                hunk_id,
                self.relative(&path)
            ));
        };

        let replacement = hunk.replacement_lines(resolution, custom_content);
        let updated = splice_hunks(&content, &[(hunk, replacement)]);

        if let Err(e) = fs::write(&path, updated) {
            return OperationResult::failure(format!(
                "Failed to write {}: {}",
                path.display(),
                e
            ));
        }

        tracing::info!(
            path = %self.relative(&path),
            hunk_id,
            ?resolution,
            remaining = hunks.len() - 1,
            "resolved conflict hunk"
        );
        OperationResult::ok()
    }

    /// Apply one resolution to every hunk of a file in a single write
    pub fn resolve_all_hunks(&self, file: &Path, resolution: ConflictResolution) -> OperationResult {
        let path = self.absolute(file);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                return OperationResult::failure(format!(
                    "File not found: {} ({})",
                    path.display(),
                    e
                ))
            }
        };

        let hunks = parse_conflict_markers(&content);
        if hunks.is_empty() {
            return OperationResult::failure(format!(
                "No conflict hunks found in {}",
                self.relative(&path)
            ));
        }

        let replacements: Vec<(&ConflictHunk, Vec<String>)> = hunks
            .iter()
            .map(|h| (h, h.replacement_lines(resolution, None)))
            .collect();
        let updated = splice_hunks(&content, &replacements);

        match fs::write(&path, updated) {
            Ok(()) => {
                tracing::info!(path = %self.relative(&path), count = hunks.len(), ?resolution, "resolved all hunks");
                OperationResult::ok()
            }
            Err(e) => OperationResult::failure(format!("Failed to write {}: {}", path.display(), e)),
        }
    }

    /// Overwrite a file with editor-merged content
    pub fn write_resolved_content(&self, file: &Path, content: &str) -> OperationResult {
        let path = self.absolute(file);
        match fs::write(&path, content) {
            Ok(()) => OperationResult::ok(),
            Err(e) => OperationResult::failure(format!("Failed to write {}: {}", path.display(), e)),
        }
    }

    /// Take one side for the whole file via `git checkout --ours/--theirs`
    pub fn resolve_file(&self, file: &Path, side: FileSide) -> OperationResult {
        let rel = self.relative(&self.absolute(file));
        self.run_step(&["checkout", side.checkout_flag(), "--", &rel], "resolve file")
    }

    /// Stage a file, marking its conflict resolved
    pub fn mark_file_resolved(&self, file: &Path) -> OperationResult {
        let rel = self.relative(&self.absolute(file));
        self.run_step(&["add", "--", &rel], "mark file resolved")
    }

    pub fn abort_merge(&self) -> OperationResult {
        self.run_step(&["merge", "--abort"], "abort merge")
    }

    pub fn continue_merge(&self) -> OperationResult {
        self.run_step(&["merge", "--continue"], "continue merge")
    }

    pub fn abort_rebase(&self) -> OperationResult {
        self.run_step(&["rebase", "--abort"], "abort rebase")
    }

    pub fn continue_rebase(&self) -> OperationResult {
        self.run_step(&["rebase", "--continue"], "continue rebase")
    }

    pub fn skip_rebase_commit(&self) -> OperationResult {
        self.run_step(&["rebase", "--skip"], "skip rebase commit")
    }

    pub fn continue_cherry_pick(&self) -> OperationResult {
        self.run_step(&["cherry-pick", "--continue"], "continue cherry-pick")
    }

    pub fn abort_cherry_pick(&self) -> OperationResult {
        self.run_step(&["cherry-pick", "--abort"], "abort cherry-pick")
    }

    /// Base/ours/theirs content from index stages 1–3; absent stages are empty
    pub fn get_three_way_diff(&self, file: &Path) -> Result<ThreeWayDiff> {
        let rel = self.relative(&self.absolute(file));
        let repo = git2::Repository::open(self.repo_root())?;
        let index = repo.index()?;

        let mut diff = ThreeWayDiff {
            path: rel.clone(),
            ..Default::default()
        };

        if !index.has_conflicts() {
            return Ok(diff);
        }

        for conflict in index.conflicts()? {
            let conflict = conflict?;
            let entry_path = conflict
                .our
                .as_ref()
                .or(conflict.their.as_ref())
                .or(conflict.ancestor.as_ref())
                .map(|e| String::from_utf8_lossy(&e.path).to_string());

            if entry_path.as_deref() != Some(rel.as_str()) {
                continue;
            }

            diff.base = blob_text(&repo, conflict.ancestor.as_ref());
            diff.ours = blob_text(&repo, conflict.our.as_ref());
            diff.theirs = blob_text(&repo, conflict.their.as_ref());
            break;
        }

        Ok(diff)
    }

    fn run_step(&self, args: &[&str], what: &str) -> OperationResult {
        match self.git.output(args) {
            Ok(output) if output.success => {
                tracing::info!(workdir = %self.repo_root().display(), "{} succeeded", what);
                OperationResult::ok()
            }
            Ok(output) => {
                let message = output.failure_message();
                tracing::warn!("Failed to {}: {}", what, message);
                OperationResult::failure(message)
            }
            Err(e) => OperationResult::failure(e.to_string()),
        }
    }
}

fn blob_text(repo: &git2::Repository, entry: Option<&git2::IndexEntry>) -> String {
    entry
        .and_then(|e| repo.find_blob(e.id).ok())
        .map(|blob| String::from_utf8_lossy(blob.content()).to_string())
        .unwrap_or_default()
}

/// Replace each hunk's `start_line..=end_line` span with its replacement
///
/// `replacements` must be in file order and non-overlapping, which is what
/// the parser produces.
fn splice_hunks(content: &str, replacements: &[(&ConflictHunk, Vec<String>)]) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut cursor = 0;

    for (hunk, replacement) in replacements {
        let start = hunk.start_line.min(lines.len());
        let end = (hunk.end_line + 1).min(lines.len());
        out.extend(lines[cursor..start].iter().map(|l| l.to_string()));
        out.extend(replacement.iter().cloned());
        cursor = end;
    }
    out.extend(lines[cursor..].iter().map(|l| l.to_string()));

    out.join("\n")
}
