//! Command utilities for spawning the git executable
//!
//! This module provides helpers to create commands that don't show
//! console windows on Windows, and a small runner that executes git
//! inside a repository and classifies its failures.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{MergePilotError, Result};
use crate::services::error_classifier::classify_message;

/// Creates a Command with platform-specific settings to hide console windows.
///
/// On Windows, this sets the CREATE_NO_WINDOW flag to prevent CMD popups.
/// On other platforms, it returns a standard Command.
pub fn create_command(program: &str) -> Command {
    let mut cmd = Command::new(program);

    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        // CREATE_NO_WINDOW = 0x08000000
        cmd.creation_flags(0x08000000);
    }

    // Prevent git credential popup dialogs and editor launches
    if is_git_program(program) {
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.env("GIT_EDITOR", "true");
    }

    cmd
}

fn is_git_program(program: &str) -> bool {
    Path::new(program)
        .file_stem()
        .map(|stem| stem == "git")
        .unwrap_or(false)
}

/// Captured output of one git invocation
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// Failure text as git reported it: stderr, or stdout when stderr is empty
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Runs git subcommands inside one working tree
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
    workdir: PathBuf,
}

impl GitCli {
    pub fn new(program: impl Into<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run git and capture its output without interpreting the exit status
    pub fn output(&self, args: &[&str]) -> Result<GitOutput> {
        self.output_with_env(args, &[])
    }

    pub fn output_with_env(&self, args: &[&str], envs: &[(&str, &str)]) -> Result<GitOutput> {
        tracing::debug!(workdir = %self.workdir.display(), "git {}", args.join(" "));

        let mut cmd = create_command(&self.program);
        cmd.current_dir(&self.workdir).args(args);
        for (key, value) in envs {
            cmd.env(key, value);
        }

        let output = cmd.output().map_err(|e| {
            MergePilotError::OperationFailed(format!("Failed to run {}: {}", self.program, e))
        })?;

        Ok(GitOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Run git, returning trimmed stdout or a classified error
    pub fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args)?;
        if output.success {
            Ok(output.stdout.trim().to_string())
        } else {
            Err(MergePilotError::GitCommand(classify_message(
                &output.failure_message(),
            )))
        }
    }

    /// Full hash of HEAD, or None on an unborn branch
    pub fn head_oid(&self) -> Option<String> {
        self.run(&["rev-parse", "--verify", "HEAD"]).ok()
    }

    /// Paths (relative to the working tree) that still have unmerged index entries
    ///
    /// `-z` keeps git from C-quoting names with non-ASCII bytes.
    pub fn unmerged_paths(&self) -> Result<Vec<String>> {
        let output = self.output(&["diff", "--name-only", "-z", "--diff-filter=U"])?;
        if !output.success {
            return Err(MergePilotError::GitCommand(classify_message(
                &output.failure_message(),
            )));
        }
        let mut paths: Vec<String> = output
            .stdout
            .split('\0')
            .filter(|path| !path.is_empty())
            .map(str::to_string)
            .collect();
        paths.dedup();
        Ok(paths)
    }
}
