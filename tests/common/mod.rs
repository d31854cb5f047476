//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

use git2::Repository;
use tempfile::TempDir;

/// Create a test repository with an identity and deterministic merge style
pub fn setup_repo() -> (TempDir, Repository) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let repo = Repository::init(dir.path()).expect("Failed to init repo");

    let mut config = repo.config().expect("Failed to get config");
    config
        .set_str("user.name", "Test User")
        .expect("Failed to set user.name");
    config
        .set_str("user.email", "test@example.com")
        .expect("Failed to set user.email");
    config
        .set_str("merge.conflictStyle", "merge")
        .expect("Failed to set merge.conflictStyle");
    config
        .set_bool("commit.gpgSign", false)
        .expect("Failed to set commit.gpgSign");

    (dir, repo)
}

/// Run git in `dir`, panicking on spawn failure only
pub fn git(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new("git")
        .current_dir(dir)
        .env("GIT_EDITOR", "true")
        .env("GIT_TERMINAL_PROMPT", "0")
        .args(args)
        .output()
        .expect("Failed to run git")
}

/// Write `files`, stage them and commit on the current branch
pub fn commit_files(dir: &Path, message: &str, files: &[(&str, &str)]) -> String {
    for (name, content) in files {
        std::fs::write(dir.join(name), content).expect("Failed to write file");
        assert!(git(dir, &["add", name]).status.success());
    }
    let output = git(dir, &["commit", "-q", "-m", message]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    head(dir)
}

pub fn head(dir: &Path) -> String {
    let output = git(dir, &["rev-parse", "HEAD"]);
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

pub fn current_branch(dir: &Path) -> String {
    let output = git(dir, &["symbolic-ref", "--short", "HEAD"]);
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Subjects of the last `count` commits on HEAD, newest first
pub fn subjects(dir: &Path, count: usize) -> Vec<String> {
    let output = git(dir, &["log", "--format=%s", "-n", &count.to_string()]);
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

/// `main` and `feature` both edit `shared.txt` after a common base.
/// Returns the default branch name; `feature` is checked out.
pub fn diverged_branches(dir: &Path) -> String {
    commit_files(dir, "Initial commit", &[("README.md", "# Test\n"), ("shared.txt", "original\n")]);
    let main = current_branch(dir);

    assert!(git(dir, &["checkout", "-q", "-b", "feature"]).status.success());
    commit_files(dir, "Add a", &[("a.txt", "a\n")]);
    commit_files(dir, "Edit shared on feature", &[("shared.txt", "feature change\n")]);
    commit_files(dir, "Add b", &[("b.txt", "b\n")]);

    assert!(git(dir, &["checkout", "-q", &main]).status.success());
    commit_files(dir, "Edit shared on main", &[("shared.txt", "main change\n")]);

    assert!(git(dir, &["checkout", "-q", "feature"]).status.success());
    main
}

pub fn path_string(dir: &TempDir) -> String {
    dir.path().to_string_lossy().to_string()
}
