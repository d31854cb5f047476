//! Interactive rebase execution state machine
//!
//! Drives `idle -> planning -> executing -> {paused, conflicted} ->
//! {completed, aborted}`. Every git step is followed by a fresh probe of
//! the repository; the state is derived from what git left behind rather
//! than from the step's exit status.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{MergePilotError, Result};
use crate::models::{
    ConflictFile, ConflictFileResolution, ConflictFileStatus, FileSide, OperationKind,
    OperationResult, RebaseAction, RebaseCommit, RebaseConflict, RebaseExecutionState,
    RebaseStatus, RepositoryOperationState, UndoableOperation,
};
use crate::services::conflict_resolver::ConflictResolutionApplier;
use crate::services::error_classifier::{classify_message, GitError, GitErrorCode};
use crate::services::rebase_plan::{load_rebase_commits, RebasePlanModel};
use crate::services::state_probe::RepositoryStateProbe;
use crate::services::undo_ledger::UndoRedoLedger;
use crate::utils::{GitCli, GitOutput};

/// Scratch directory under the git dir for todo and reword message files
const SCRATCH_DIR: &str = "mergepilot-rebase";

#[derive(Debug, Clone)]
pub struct RebaseExecutionStateMachine {
    git: GitCli,
    probe: RepositoryStateProbe,
    applier: ConflictResolutionApplier,
    model: RebasePlanModel,
    state: RebaseExecutionState,
    conflict: Option<RebaseConflict>,
    /// HEAD before the running rebase started
    original_head: Option<String>,
    short_len: usize,
}

impl RebaseExecutionStateMachine {
    pub fn new(git: GitCli, probe: RepositoryStateProbe, short_len: usize) -> Self {
        let applier = ConflictResolutionApplier::new(git.clone(), probe.clone());
        Self {
            git,
            probe,
            applier,
            model: RebasePlanModel::new(),
            state: RebaseExecutionState::Idle,
            conflict: None,
            original_head: None,
            short_len,
        }
    }

    pub fn state(&self) -> RebaseExecutionState {
        self.state
    }

    pub fn model(&self) -> &RebasePlanModel {
        &self.model
    }

    pub fn conflict(&self) -> Option<&RebaseConflict> {
        self.conflict.as_ref()
    }

    fn transition(&mut self, next: RebaseExecutionState) {
        if self.state != next {
            tracing::info!(from = %self.state, to = %next, "rebase state transition");
        }
        self.state = next;
    }

    fn invalid(&self, action: &str) -> MergePilotError {
        MergePilotError::InvalidTransition {
            state: self.state.to_string(),
            action: action.to_string(),
        }
    }

    /// Catch up with a rebase that git finished or aborted on its own
    ///
    /// Another process (a terminal, the plain rebase commands) may have
    /// moved the repository on since the last step. An in-flight machine
    /// with no rebase on disk settles to `Aborted` when HEAD is back at
    /// the recorded original, `Completed` otherwise. While the rebase is
    /// still running, the conflict file list follows the index.
    fn reconcile(&mut self) {
        if !self.state.is_in_flight() {
            return;
        }

        if self.probe.detect_operation() == RepositoryOperationState::Rebasing {
            self.sync_conflict_files();
            return;
        }

        let head = self.git.head_oid();
        let next = if head.is_some() && head == self.original_head {
            RebaseExecutionState::Aborted
        } else {
            RebaseExecutionState::Completed
        };
        tracing::info!(state = %next, "rebase ended outside the state machine");
        self.conflict = None;
        self.remove_scratch();
        self.transition(next);
    }

    fn sync_conflict_files(&mut self) {
        let unmerged = match self.git.unmerged_paths() {
            Ok(paths) => paths,
            Err(e) => {
                tracing::warn!("Failed to list unmerged paths: {}", e);
                return;
            }
        };

        let known = |conflict: &RebaseConflict, path: &String| {
            conflict.files.iter().any(|f| &f.path == path)
        };
        let stopped_elsewhere = match &self.conflict {
            Some(conflict) => {
                conflict.current_commit.hash != self.stopped_commit().hash
                    || unmerged.iter().any(|path| !known(conflict, path))
            }
            None => !unmerged.is_empty(),
        };

        if stopped_elsewhere {
            self.conflict = Some(self.build_conflict(&unmerged));
            self.transition(RebaseExecutionState::Conflicted);
            return;
        }

        // Files staged by hand count as resolved
        if let Some(conflict) = self.conflict.as_mut() {
            for file in conflict.files.iter_mut() {
                if file.status == ConflictFileStatus::Unresolved && !unmerged.contains(&file.path) {
                    file.status = ConflictFileStatus::Resolved;
                }
            }
        }
    }

    /// Run one rebase step and settle; a git that cannot be spawned
    /// leaves the state where it was
    fn step(&mut self, args: &[&str]) -> Result<RebaseStatus> {
        let previous = self.state;
        self.transition(RebaseExecutionState::Executing);
        match self.git.output(args) {
            Ok(output) => self.settle(output, previous),
            Err(e) => {
                self.transition(previous);
                Err(e)
            }
        }
    }

    fn scratch_dir(&self) -> PathBuf {
        self.probe.git_dir().join(SCRATCH_DIR)
    }

    fn remove_scratch(&self) {
        let dir = self.scratch_dir();
        if dir.exists() {
            if let Err(e) = fs::remove_dir_all(&dir) {
                tracing::debug!("Failed to remove {}: {}", dir.display(), e);
            }
        }
    }

    /// Start planning from an explicit commit list (oldest first)
    pub fn init_rebase_plan(
        &mut self,
        commits: Vec<RebaseCommit>,
        onto: &str,
        branch: &str,
    ) -> Result<()> {
        self.reconcile();
        if self.state.is_in_flight() {
            return Err(self.invalid("initialize a plan"));
        }
        self.model.init(commits, onto, branch);
        self.conflict = None;
        self.original_head = None;
        self.transition(RebaseExecutionState::Planning);
        Ok(())
    }

    /// Start planning from the commits between `onto` and HEAD
    pub fn load_rebase_plan(&mut self, onto: &str) -> Result<()> {
        let commits = load_rebase_commits(self.git.workdir(), onto, self.short_len)?;
        let branch = self
            .probe
            .current_branch()
            .unwrap_or_else(|| "HEAD".to_string());
        self.init_rebase_plan(commits, onto, &branch)
    }

    fn require_planning(&self, action: &str) -> Result<()> {
        if self.state == RebaseExecutionState::Planning {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    pub fn set_commit_action(&mut self, hash: &str, action: RebaseAction) -> Result<bool> {
        self.require_planning("edit the plan")?;
        Ok(self.model.set_commit_action(hash, action))
    }

    pub fn set_all_actions(&mut self, action: RebaseAction) -> Result<()> {
        self.require_planning("edit the plan")?;
        self.model.set_all_actions(action);
        Ok(())
    }

    pub fn reword_commit(&mut self, hash: &str, message: &str) -> Result<bool> {
        self.require_planning("edit the plan")?;
        Ok(self.model.reword(hash, message))
    }

    pub fn move_commit(&mut self, from: usize, to: usize) -> Result<()> {
        self.require_planning("edit the plan")?;
        self.model.move_commit(from, to);
        Ok(())
    }

    pub fn swap_commits(&mut self, a: usize, b: usize) -> Result<()> {
        self.require_planning("edit the plan")?;
        self.model.swap_commits(a, b);
        Ok(())
    }

    pub fn reset_to_original(&mut self) -> Result<()> {
        self.require_planning("reset the plan")?;
        self.model.reset_to_original();
        Ok(())
    }

    /// Drop the plan and return to idle; not allowed mid-rebase
    pub fn clear_plan(&mut self) -> Result<()> {
        self.reconcile();
        if self.state.is_in_flight() {
            return Err(self.invalid("clear the plan"));
        }
        self.model.clear();
        self.conflict = None;
        self.original_head = None;
        self.remove_scratch();
        self.transition(RebaseExecutionState::Idle);
        Ok(())
    }

    pub fn validate_plan(&self) -> Vec<String> {
        self.model.validate_plan()
    }

    pub fn can_start_rebase(&self) -> bool {
        self.state == RebaseExecutionState::Planning
            && self.probe.detect_operation() != RepositoryOperationState::Rebasing
            && self.model.is_valid()
    }

    pub fn has_unresolved_conflicts(&self) -> bool {
        self.conflict.as_ref().is_some_and(|c| {
            c.files
                .iter()
                .any(|f| f.status == ConflictFileStatus::Unresolved)
        })
    }

    pub fn can_continue_rebase(&self) -> bool {
        self.state.is_in_flight()
            && self.probe.detect_operation() == RepositoryOperationState::Rebasing
            && !self.has_unresolved_conflicts()
    }

    /// Execute the plan
    ///
    /// The pre-rebase HEAD is recorded on `ledger` before git runs. A
    /// conflict or `edit` stop is a successful return with the matching
    /// state; a failure that leaves no rebase behind returns to planning.
    pub fn start_rebase(&mut self, ledger: &mut UndoRedoLedger) -> Result<RebaseStatus> {
        self.require_planning("start")?;

        let errors = self.model.validate_plan();
        if !errors.is_empty() {
            return Err(MergePilotError::InvalidPlan(errors));
        }
        if self.probe.detect_operation() == RepositoryOperationState::Rebasing {
            return Err(MergePilotError::GitCommand(GitError::new(
                GitErrorCode::RebaseInProgress,
                "a rebase is already in progress",
            )));
        }

        let original_head = self.git.head_oid().ok_or_else(|| {
            MergePilotError::OperationFailed("HEAD does not point to a commit".to_string())
        })?;
        let base = self.model.upstream_base(self.git.workdir())?;
        let (onto, branch) = match self.model.plan() {
            Some(plan) => (plan.onto.clone(), plan.branch.clone()),
            None => return Err(MergePilotError::InvalidPlan(vec!["Rebase plan has no commits".to_string()])),
        };

        self.original_head = Some(original_head.clone());
        ledger.push(UndoableOperation::new(
            OperationKind::Rebase {
                original_head,
                branch: self.probe.current_branch(),
            },
            format!("Rebase {} onto {}", branch, onto),
        ));
        self.transition(RebaseExecutionState::Executing);

        let output = match self.run_plan(&onto, base.as_deref()) {
            Ok(output) => output,
            Err(e) => {
                self.transition(RebaseExecutionState::Planning);
                self.remove_scratch();
                return Err(e);
            }
        };
        self.settle(output, RebaseExecutionState::Planning)
    }

    fn run_plan(&self, onto: &str, base: Option<&str>) -> Result<GitOutput> {
        let mut args = vec!["rebase"];
        let linear = self.model.is_linear_onto_move();
        if !linear {
            args.push("-i");
        }
        args.extend(["--onto", onto]);
        match base {
            Some(base) => args.push(base),
            None => args.push("--root"),
        }

        if linear {
            tracing::info!(onto, "running linear rebase");
            return self.git.output(&args);
        }

        let scratch = self.scratch_dir();
        fs::create_dir_all(&scratch)?;
        let todo = self.model.to_todo(&scratch)?;
        let todo_file = scratch.join("git-rebase-todo");
        fs::write(&todo_file, todo)?;

        let editor = RebasePlanModel::sequence_editor_command(&todo_file);
        tracing::info!(onto, todo = %todo_file.display(), "running interactive rebase");
        self.git
            .output_with_env(&args, &[("GIT_SEQUENCE_EDITOR", editor.as_str())])
    }

    /// Derive the next state from the repository after a git step
    ///
    /// `fallback` is the state to return to when the step failed and no
    /// rebase is left in progress.
    fn settle(&mut self, output: GitOutput, fallback: RebaseExecutionState) -> Result<RebaseStatus> {
        let operation = self.probe.detect_operation();

        if operation == RepositoryOperationState::Rebasing {
            let unmerged = self.git.unmerged_paths()?;
            if unmerged.is_empty() {
                self.conflict = None;
                self.transition(RebaseExecutionState::Paused);
            } else {
                self.conflict = Some(self.build_conflict(&unmerged));
                self.transition(RebaseExecutionState::Conflicted);
            }
            return Ok(self.snapshot());
        }

        if !output.success {
            self.conflict = None;
            self.transition(fallback);
            if !fallback.is_in_flight() {
                self.remove_scratch();
            }
            return Err(MergePilotError::GitCommand(classify_message(
                &output.failure_message(),
            )));
        }

        self.conflict = None;
        self.remove_scratch();
        self.transition(RebaseExecutionState::Completed);
        Ok(self.snapshot())
    }

    fn stopped_commit(&self) -> RebaseCommit {
        let stopped = self.probe.current_rebase_commit_full();

        if let (Some(sha), Some(plan)) = (stopped.as_deref(), self.model.plan()) {
            if let Some(commit) = plan
                .commits
                .iter()
                .find(|c| c.hash.starts_with(sha) || sha.starts_with(&c.hash))
            {
                return commit.clone();
            }
        }

        let hash = stopped.unwrap_or_default();
        RebaseCommit {
            short_hash: hash.chars().take(self.short_len).collect(),
            hash,
            message: self.probe.current_rebase_message().unwrap_or_default(),
            author: String::new(),
            date: String::new(),
            action: RebaseAction::Pick,
            original_index: self.model.plan().map(|p| p.commits.len()).unwrap_or(0),
        }
    }

    fn build_conflict(&self, unmerged: &[String]) -> RebaseConflict {
        let files = unmerged
            .iter()
            .map(|path| {
                let diff = self
                    .applier
                    .get_three_way_diff(Path::new(path))
                    .unwrap_or_else(|e| {
                        tracing::warn!(path = %path, "Failed to read index stages: {}", e);
                        Default::default()
                    });
                ConflictFile {
                    path: path.clone(),
                    status: ConflictFileStatus::Unresolved,
                    ours_content: Some(diff.ours),
                    theirs_content: Some(diff.theirs),
                    merged_content: fs::read_to_string(self.git.workdir().join(path)).ok(),
                }
            })
            .collect();

        RebaseConflict {
            current_commit: self.stopped_commit(),
            files,
        }
    }

    /// Resume after conflicts are resolved or an `edit` stop
    pub fn continue_rebase(&mut self) -> Result<RebaseStatus> {
        self.reconcile();
        if !self.can_continue_rebase() {
            if self.has_unresolved_conflicts() {
                return Err(MergePilotError::OperationFailed(
                    "Resolve all conflicted files before continuing".to_string(),
                ));
            }
            return Err(self.invalid("continue"));
        }

        self.step(&["rebase", "--continue"])
    }

    /// Drop the commit the rebase stopped on and carry on
    pub fn skip_commit(&mut self) -> Result<RebaseStatus> {
        self.reconcile();
        if !self.state.is_in_flight()
            || self.probe.detect_operation() != RepositoryOperationState::Rebasing
        {
            return Err(self.invalid("skip a commit"));
        }

        self.step(&["rebase", "--skip"])
    }

    /// Abort the rebase; git restores the original branch and working tree
    ///
    /// A rebase that was already aborted elsewhere reports `Aborted`.
    pub fn abort_rebase(&mut self) -> Result<RebaseStatus> {
        self.reconcile();
        match self.state {
            RebaseExecutionState::Aborted => return Ok(self.status()),
            state if !state.is_in_flight() => return Err(self.invalid("abort")),
            _ => {}
        }

        self.git.run(&["rebase", "--abort"])?;
        self.conflict = None;
        self.remove_scratch();
        self.transition(RebaseExecutionState::Aborted);
        Ok(self.status())
    }

    fn conflict_file_mut(&mut self, path: &str) -> Option<&mut ConflictFile> {
        self.conflict
            .as_mut()?
            .files
            .iter_mut()
            .find(|f| f.path == path)
    }

    /// Settle one conflicted file and stage it
    pub fn resolve_conflict_file(
        &mut self,
        path: &str,
        resolution: ConflictFileResolution,
    ) -> OperationResult {
        self.reconcile();
        if self.state != RebaseExecutionState::Conflicted {
            return OperationResult::failure(self.invalid("resolve files").to_string());
        }
        if self.conflict_file_mut(path).is_none() {
            return OperationResult::failure(format!("{} is not conflicted", path));
        }

        let applied = match &resolution {
            ConflictFileResolution::Ours => self.applier.resolve_file(Path::new(path), FileSide::Ours),
            ConflictFileResolution::Theirs => {
                self.applier.resolve_file(Path::new(path), FileSide::Theirs)
            }
            ConflictFileResolution::Merged(content) => {
                self.applier.write_resolved_content(Path::new(path), content)
            }
        };
        if !applied.success {
            return applied;
        }

        let staged = self.applier.mark_file_resolved(Path::new(path));
        if !staged.success {
            return staged;
        }

        let merged = fs::read_to_string(self.git.workdir().join(path)).ok();
        if let Some(file) = self.conflict_file_mut(path) {
            file.status = match resolution {
                ConflictFileResolution::Ours => ConflictFileStatus::Ours,
                ConflictFileResolution::Theirs => ConflictFileStatus::Theirs,
                ConflictFileResolution::Merged(_) => ConflictFileStatus::Resolved,
            };
            file.merged_content = merged;
        }

        tracing::info!(path, unresolved = self.has_unresolved_conflicts(), "resolved rebase conflict file");
        OperationResult::ok()
    }

    /// Stage a file the caller has already edited into shape
    pub fn mark_conflict_file_resolved(&mut self, path: &str) -> OperationResult {
        self.reconcile();
        if self.state != RebaseExecutionState::Conflicted {
            return OperationResult::failure(self.invalid("resolve files").to_string());
        }
        if self.conflict_file_mut(path).is_none() {
            return OperationResult::failure(format!("{} is not conflicted", path));
        }

        let staged = self.applier.mark_file_resolved(Path::new(path));
        if !staged.success {
            return staged;
        }

        let merged = fs::read_to_string(self.git.workdir().join(path)).ok();
        if let Some(file) = self.conflict_file_mut(path) {
            file.status = ConflictFileStatus::Resolved;
            file.merged_content = merged;
        }
        OperationResult::ok()
    }

    /// Snapshot for callers, after catching up with the repository
    pub fn status(&mut self) -> RebaseStatus {
        self.reconcile();
        self.snapshot()
    }

    fn snapshot(&self) -> RebaseStatus {
        let progress = if self.state.is_in_flight() {
            self.probe.rebase_progress()
        } else {
            None
        };

        RebaseStatus {
            state: self.state,
            plan: self.model.plan().cloned(),
            original_plan: self.model.original_plan().cloned(),
            conflict: self.conflict.clone(),
            progress,
            has_unresolved_conflicts: self.has_unresolved_conflicts(),
            can_start: self.can_start_rebase(),
            can_continue: self.can_continue_rebase(),
        }
    }
}
