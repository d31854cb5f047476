//! Interactive rebase plan editing and validation

use std::fs;
use std::path::Path;

use crate::error::{MergePilotError, Result};
use crate::models::{RebaseAction, RebaseCommit, RebasePlan};

/// Load `onto..HEAD` as plan entries, oldest first
pub fn load_rebase_commits(
    repo_root: &Path,
    onto: &str,
    short_len: usize,
) -> Result<Vec<RebaseCommit>> {
    let repo = git2::Repository::open(repo_root)
        .map_err(|_| MergePilotError::RepositoryNotFound(repo_root.display().to_string()))?;

    let onto_commit = repo.revparse_single(onto)?.peel_to_commit()?;

    let mut revwalk = repo.revwalk()?;
    revwalk.push_head()?;
    revwalk.hide(onto_commit.id())?;
    revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE)?;

    let mut commits = Vec::new();
    for (index, oid) in revwalk.enumerate() {
        let commit = repo.find_commit(oid?)?;
        commits.push(RebaseCommit::from_git2(&commit, index, short_len));
    }

    Ok(commits)
}

/// Quote a value for the POSIX shell git runs editors and `exec` lines with
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Editable plan plus the snapshot it was initialised from
#[derive(Debug, Clone, Default)]
pub struct RebasePlanModel {
    plan: Option<RebasePlan>,
    original_plan: Option<RebasePlan>,
}

impl RebasePlanModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the plan and snapshot it for `reset_to_original`
    ///
    /// Every commit starts as `pick` and `original_index` is renumbered to
    /// its position in `commits`.
    pub fn init(&mut self, commits: Vec<RebaseCommit>, onto: &str, branch: &str) {
        let commits = commits
            .into_iter()
            .enumerate()
            .map(|(index, mut commit)| {
                commit.action = RebaseAction::Pick;
                commit.original_index = index;
                commit
            })
            .collect();

        let plan = RebasePlan {
            commits,
            onto: onto.to_string(),
            branch: branch.to_string(),
        };
        self.original_plan = Some(plan.clone());
        self.plan = Some(plan);
    }

    pub fn plan(&self) -> Option<&RebasePlan> {
        self.plan.as_ref()
    }

    pub fn original_plan(&self) -> Option<&RebasePlan> {
        self.original_plan.as_ref()
    }

    fn commit_mut(&mut self, hash: &str) -> Option<&mut RebaseCommit> {
        self.plan
            .as_mut()?
            .commits
            .iter_mut()
            .find(|c| c.hash == hash || c.short_hash == hash)
    }

    /// Returns false when no commit matches `hash`
    pub fn set_commit_action(&mut self, hash: &str, action: RebaseAction) -> bool {
        match self.commit_mut(hash) {
            Some(commit) => {
                commit.action = action;
                true
            }
            None => false,
        }
    }

    pub fn set_all_actions(&mut self, action: RebaseAction) {
        if let Some(plan) = self.plan.as_mut() {
            for commit in &mut plan.commits {
                commit.action = action;
            }
        }
    }

    /// Set a new message; the commit's action becomes `reword`
    pub fn reword(&mut self, hash: &str, message: &str) -> bool {
        match self.commit_mut(hash) {
            Some(commit) => {
                commit.message = message.trim_end().to_string();
                commit.action = RebaseAction::Reword;
                true
            }
            None => false,
        }
    }

    /// Move the commit at `from` so it ends up at `to`
    pub fn move_commit(&mut self, from: usize, to: usize) {
        let Some(plan) = self.plan.as_mut() else {
            return;
        };
        let len = plan.commits.len();
        if from >= len || to >= len || from == to {
            return;
        }
        let commit = plan.commits.remove(from);
        plan.commits.insert(to, commit);
    }

    pub fn swap_commits(&mut self, a: usize, b: usize) {
        let Some(plan) = self.plan.as_mut() else {
            return;
        };
        let len = plan.commits.len();
        if a >= len || b >= len {
            return;
        }
        plan.commits.swap(a, b);
    }

    pub fn reset_to_original(&mut self) {
        self.plan = self.original_plan.clone();
    }

    pub fn clear(&mut self) {
        self.plan = None;
        self.original_plan = None;
    }

    /// Human-readable reasons the plan cannot be executed; empty when valid
    pub fn validate_plan(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let commits = match self.plan.as_ref() {
            Some(plan) if !plan.commits.is_empty() => &plan.commits,
            _ => {
                errors.push("Rebase plan has no commits".to_string());
                return errors;
            }
        };

        let mut seen_target = false;
        for commit in commits {
            if commit.action.keeps_commit() {
                seen_target = true;
            } else if commit.action.melds_into_previous() && !seen_target {
                errors.push(format!(
                    "Cannot {} commit {}: squash and fixup must follow a pick, reword or edit",
                    commit.action.keyword(),
                    commit.short_hash
                ));
                break;
            }
        }

        if commits.iter().all(|c| c.action == RebaseAction::Drop) {
            errors.push("Cannot drop every commit in the rebase plan".to_string());
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate_plan().is_empty()
    }

    /// Every commit is a plain `pick` in its original order
    pub fn is_linear_onto_move(&self) -> bool {
        self.plan.as_ref().is_some_and(|plan| {
            plan.commits
                .iter()
                .enumerate()
                .all(|(index, c)| c.action == RebaseAction::Pick && c.original_index == index)
        })
    }

    /// Commit the plan's range starts after, or `None` for a root commit
    ///
    /// The range is `<oldest commit>^..HEAD`, where oldest is by
    /// `original_index` rather than by current position.
    pub fn upstream_base(&self, repo_root: &Path) -> Result<Option<String>> {
        let plan = self
            .plan
            .as_ref()
            .ok_or_else(|| MergePilotError::InvalidPlan(vec!["Rebase plan has no commits".to_string()]))?;
        let oldest = plan
            .commits
            .iter()
            .min_by_key(|c| c.original_index)
            .ok_or_else(|| MergePilotError::InvalidPlan(vec!["Rebase plan has no commits".to_string()]))?;

        let repo = git2::Repository::open(repo_root)?;
        let commit = repo.find_commit(git2::Oid::from_str(&oldest.hash)?)?;
        Ok(commit.parent_id(0).ok().map(|oid| oid.to_string()))
    }

    /// Render the todo list for `git rebase -i`
    ///
    /// Rewords are written as `pick` followed by an `exec` that amends the
    /// message from a file in `message_dir`, so git never opens an editor.
    pub fn to_todo(&self, message_dir: &Path) -> Result<String> {
        let plan = self
            .plan
            .as_ref()
            .ok_or_else(|| MergePilotError::InvalidPlan(vec!["Rebase plan has no commits".to_string()]))?;

        let mut todo = String::new();
        for commit in &plan.commits {
            match commit.action {
                RebaseAction::Reword => {
                    fs::create_dir_all(message_dir)?;
                    let message_file = message_dir.join(format!("message-{}", commit.hash));
                    fs::write(&message_file, format!("{}\n", commit.message))?;

                    todo.push_str(&format!("pick {} {}\n", commit.hash, commit.summary()));
                    todo.push_str(&format!(
                        "exec git commit --amend --only --allow-empty --no-verify -F {}\n",
                        shell_quote(&message_file.to_string_lossy())
                    ));
                }
                action => {
                    todo.push_str(&format!(
                        "{} {} {}\n",
                        action.keyword(),
                        commit.hash,
                        commit.summary()
                    ));
                }
            }
        }

        Ok(todo)
    }

    /// Shell command git should run as its sequence editor to install `todo_file`
    pub fn sequence_editor_command(todo_file: &Path) -> String {
        format!("cp {}", shell_quote(&todo_file.to_string_lossy()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestRepo;
    use tempfile::TempDir;

    fn commit(n: usize) -> RebaseCommit {
        RebaseCommit {
            hash: format!("{:040x}", n + 1),
            short_hash: format!("{:07x}", n + 1),
            message: format!("Commit {}", n),
            author: "Test User".to_string(),
            date: "2026-01-01T00:00:00+00:00".to_string(),
            action: RebaseAction::Pick,
            original_index: n,
        }
    }

    fn model_with(actions: &[RebaseAction]) -> RebasePlanModel {
        let mut model = RebasePlanModel::new();
        model.init((0..actions.len()).map(commit).collect(), "main", "feature");
        for (i, action) in actions.iter().enumerate() {
            model.set_commit_action(&commit(i).hash, *action);
        }
        model
    }

    #[test]
    fn test_init_snapshots_original() {
        let model = model_with(&[RebaseAction::Pick, RebaseAction::Pick]);
        assert_eq!(model.plan(), model.original_plan());
        assert_eq!(model.plan().unwrap().onto, "main");
        assert_eq!(model.plan().unwrap().branch, "feature");
    }

    #[test]
    fn test_validate_pick_then_squash() {
        assert!(model_with(&[RebaseAction::Pick, RebaseAction::Squash]).is_valid());
        assert!(model_with(&[RebaseAction::Pick]).is_valid());
        assert!(model_with(&[RebaseAction::Edit, RebaseAction::Fixup]).is_valid());
    }

    #[test]
    fn test_validate_squash_first_names_the_rule() {
        let errors = model_with(&[RebaseAction::Squash, RebaseAction::Pick]).validate_plan();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("squash and fixup must follow"));
    }

    #[test]
    fn test_validate_squash_after_only_drops() {
        let errors = model_with(&[RebaseAction::Drop, RebaseAction::Fixup]).validate_plan();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_validate_all_drop() {
        let errors = model_with(&[RebaseAction::Drop, RebaseAction::Drop]).validate_plan();
        assert_eq!(errors, vec!["Cannot drop every commit in the rebase plan"]);
    }

    #[test]
    fn test_validate_empty() {
        assert!(!RebasePlanModel::new().is_valid());
        let mut model = RebasePlanModel::new();
        model.init(Vec::new(), "main", "feature");
        assert_eq!(model.validate_plan(), vec!["Rebase plan has no commits"]);
    }

    #[test]
    fn test_reword_forces_action() {
        let mut model = model_with(&[RebaseAction::Drop]);
        assert!(model.reword(&commit(0).short_hash, "Better message\n"));
        let c = &model.plan().unwrap().commits[0];
        assert_eq!(c.action, RebaseAction::Reword);
        assert_eq!(c.message, "Better message");
        assert!(!model.reword("nope", "x"));
    }

    #[test]
    fn test_move_and_swap() {
        let mut model = model_with(&[RebaseAction::Pick; 3]);
        model.move_commit(0, 2);
        let order: Vec<usize> = model.plan().unwrap().commits.iter().map(|c| c.original_index).collect();
        assert_eq!(order, vec![1, 2, 0]);

        model.swap_commits(0, 1);
        let order: Vec<usize> = model.plan().unwrap().commits.iter().map(|c| c.original_index).collect();
        assert_eq!(order, vec![2, 1, 0]);

        // Out of range indices leave the plan untouched
        model.move_commit(5, 0);
        model.swap_commits(0, 3);
        let order: Vec<usize> = model.plan().unwrap().commits.iter().map(|c| c.original_index).collect();
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn test_reset_and_clear() {
        let mut model = model_with(&[RebaseAction::Pick, RebaseAction::Pick]);
        model.set_all_actions(RebaseAction::Drop);
        model.swap_commits(0, 1);
        model.reset_to_original();
        assert_eq!(model.plan(), model.original_plan());
        assert!(model.plan().unwrap().commits.iter().all(|c| c.action == RebaseAction::Pick));

        model.clear();
        assert!(model.plan().is_none());
        assert!(model.original_plan().is_none());
    }

    #[test]
    fn test_linear_onto_move() {
        let mut model = model_with(&[RebaseAction::Pick, RebaseAction::Pick]);
        assert!(model.is_linear_onto_move());
        model.swap_commits(0, 1);
        assert!(!model.is_linear_onto_move());
        model.reset_to_original();
        model.set_commit_action(&commit(1).hash, RebaseAction::Fixup);
        assert!(!model.is_linear_onto_move());
    }

    #[test]
    fn test_to_todo() {
        let dir = TempDir::new().unwrap();
        let mut model = model_with(&[RebaseAction::Pick, RebaseAction::Squash, RebaseAction::Drop]);
        model.reword(&commit(0).hash, "Renamed");

        let todo = model.to_todo(dir.path()).unwrap();
        let lines: Vec<&str> = todo.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], format!("pick {} Renamed", commit(0).hash));
        assert!(lines[1].starts_with("exec git commit --amend --only"));
        assert_eq!(lines[2], format!("squash {} Commit 1", commit(1).hash));
        assert_eq!(lines[3], format!("drop {} Commit 2", commit(2).hash));

        let message = fs::read_to_string(dir.path().join(format!("message-{}", commit(0).hash))).unwrap();
        assert_eq!(message, "Renamed\n");
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/tmp/a b"), "'/tmp/a b'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_load_rebase_commits_oldest_first() {
        let repo = TestRepo::with_initial_commit();
        let base = repo.head_oid().to_string();
        repo.create_commit("First", &[("a.txt", "a")]);
        repo.create_commit("Second", &[("b.txt", "b")]);

        let commits = load_rebase_commits(&repo.path, &base, 7).unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].message, "First");
        assert_eq!(commits[1].message, "Second");
        assert_eq!(commits[1].original_index, 1);
        assert_eq!(commits[0].short_hash.len(), 7);
        assert_eq!(commits[0].author, "Test User");
    }

    #[test]
    fn test_upstream_base() {
        let repo = TestRepo::with_initial_commit();
        let root = repo.head_oid().to_string();
        repo.create_commit("First", &[("a.txt", "a")]);

        let mut model = RebasePlanModel::new();
        model.init(load_rebase_commits(&repo.path, &root, 7).unwrap(), &root, "main");
        assert_eq!(model.upstream_base(&repo.path).unwrap(), Some(root.clone()));

        let all = vec![RebaseCommit::from_git2(
            &repo.repo().find_commit(git2::Oid::from_str(&root).unwrap()).unwrap(),
            0,
            7,
        )];
        model.init(all, &root, "main");
        assert_eq!(model.upstream_base(&repo.path).unwrap(), None);
    }
}
