//! Git adapter for pipeline commands.
//!
//! Provisioning and shipping decide from live repository state, so we keep a
//! small, explicit wrapper around `git` subprocess calls. All invocations go
//! through a [`CommandRunner`] so tests can script them.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use tracing::{debug, instrument};

use crate::io::process::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};

/// Parsed `git status --porcelain` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// 2-letter XY code, or "??" for untracked.
    pub code: String,
    /// Path for the changed file.
    pub path: String,
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git<R: CommandRunner = SystemRunner> {
    workdir: PathBuf,
    runner: R,
}

impl Git<SystemRunner> {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self::with_runner(workdir, SystemRunner)
    }
}

impl<R: CommandRunner> Git<R> {
    pub fn with_runner(workdir: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            workdir: workdir.into(),
            runner,
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// The working directory with symlinks and `..` segments resolved.
    pub fn resolved_workdir(&self) -> PathBuf {
        self.workdir
            .canonicalize()
            .unwrap_or_else(|_| self.workdir.clone())
    }

    /// Resolve a path against the working directory when it is relative.
    pub fn absolute_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        let joined = self.resolved_workdir().join(path);
        joined.canonicalize().unwrap_or(joined)
    }

    /// True when the working directory is inside a git repository.
    pub fn in_repository(&self) -> Result<bool> {
        Ok(self.run(&["rev-parse", "--git-dir"])?.success())
    }

    /// Top-level directory of the repository.
    pub fn repo_root(&self) -> Result<PathBuf> {
        let out = self.run_capture(&["rev-parse", "--show-toplevel"])?;
        Ok(PathBuf::from(out.trim()))
    }

    /// Directory name of the repository root.
    pub fn repo_name(&self) -> Result<String> {
        let root = self.repo_root()?;
        root.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("repository root {} has no name", root.display()))
    }

    /// Current branch name; empty on a detached HEAD.
    #[instrument(skip_all)]
    pub fn current_branch(&self) -> Result<String> {
        let out = self.run_capture(&["branch", "--show-current"])?;
        let name = out.trim().to_string();
        debug!(branch = %name, "current branch");
        Ok(name)
    }

    /// Check whether a local branch exists.
    pub fn branch_exists(&self, branch: &str) -> Result<bool> {
        let out = self.run(&[
            "show-ref",
            "--verify",
            "--quiet",
            &format!("refs/heads/{branch}"),
        ])?;
        Ok(out.success())
    }

    /// Absolute paths of every registered worktree, main checkout included.
    pub fn worktree_paths(&self) -> Result<Vec<PathBuf>> {
        let out = self.run_capture(&["worktree", "list", "--porcelain"])?;
        Ok(out
            .lines()
            .filter_map(|line| line.strip_prefix("worktree "))
            .map(|path| PathBuf::from(path.trim()))
            .collect())
    }

    /// Whether `path` (relative paths resolve against the workdir) is
    /// already registered as a worktree.
    pub fn worktree_exists(&self, path: &Path) -> Result<bool> {
        let target = normalize(&self.absolute_path(path));
        let paths = self.worktree_paths()?;
        Ok(paths.iter().any(|p| normalize(p) == target))
    }

    /// Add a worktree, creating the branch unless `reuse_branch` is set.
    #[instrument(skip_all, fields(path = %path.display(), branch))]
    pub fn worktree_add(&self, path: &Path, branch: &str, reuse_branch: bool) -> Result<()> {
        let path_arg = path.to_string_lossy();
        if reuse_branch {
            debug!("adding worktree on existing branch");
            self.run_checked(&["worktree", "add", &path_arg, branch])?;
        } else {
            debug!("adding worktree with new branch");
            self.run_checked(&["worktree", "add", &path_arg, "-b", branch])?;
        }
        Ok(())
    }

    /// Remove a worktree registration and its directory.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn worktree_remove(&self, path: &Path) -> Result<()> {
        let path_arg = path.to_string_lossy();
        self.run_checked(&["worktree", "remove", &path_arg])?;
        Ok(())
    }

    /// Create and checkout a new branch at current HEAD.
    #[instrument(skip_all, fields(branch))]
    pub fn checkout_new_branch(&self, branch: &str) -> Result<()> {
        debug!(branch, "creating and checking out new branch");
        self.run_checked(&["checkout", "-b", branch])?;
        Ok(())
    }

    /// Stage all changes (respects .gitignore).
    pub fn add_all(&self) -> Result<()> {
        self.run_checked(&["add", "-A"])?;
        Ok(())
    }

    /// True if there is anything staged for commit.
    pub fn has_staged_changes(&self) -> Result<bool> {
        let out = self.run(&["diff", "--cached", "--name-only"])?;
        Ok(!out.stdout.trim().is_empty())
    }

    /// Commit staged changes with a message.
    ///
    /// If there are no staged changes, this returns Ok(false) and does nothing.
    #[instrument(skip_all)]
    pub fn commit_staged(&self, message: &str) -> Result<bool> {
        if !self.has_staged_changes()? {
            debug!("no staged changes, skipping commit");
            return Ok(false);
        }
        debug!("committing staged changes");
        self.run_checked(&["commit", "-m", message])?;
        Ok(true)
    }

    /// Short SHA of the current HEAD.
    pub fn short_head(&self) -> Result<String> {
        let out = self.run_capture(&["rev-parse", "--short", "HEAD"])?;
        Ok(out.trim().to_string())
    }

    /// Get status entries (including untracked) in porcelain format.
    pub fn status_porcelain(&self) -> Result<Vec<StatusEntry>> {
        let out = self.run_capture(&["status", "--porcelain=v1", "-uall"])?;
        let mut entries = Vec::new();
        for line in out.lines() {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(parse_status_line(line)?);
        }
        Ok(entries)
    }

    /// Unstaged diff statistics, as `git diff --stat` prints them.
    pub fn diff_stat(&self) -> Result<String> {
        let out = self.run_capture(&["diff", "--stat"])?;
        Ok(out.trim_end().to_string())
    }

    /// Discard uncommitted changes and untracked files.
    ///
    /// Failures of the individual steps are logged and ignored; a stale
    /// checkout is recoverable, a halted resume is not.
    #[instrument(skip_all)]
    pub fn revert_to_head(&self) -> Result<()> {
        for args in [&["checkout", "--", "."][..], &["clean", "-fd"][..]] {
            let out = self.run(args)?;
            if !out.success() {
                debug!(args = ?args, stderr = %out.stderr.trim(), "revert step failed");
            }
        }
        Ok(())
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        Ok(self.run_checked(args)?.stdout)
    }

    fn run_checked(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = self.run(args)?;
        if !output.success() {
            return Err(anyhow!(
                "git {} failed: {}",
                args.join(" "),
                output.stderr.trim()
            ));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let spec = CommandSpec::new("git", args.iter().copied()).cwd(&self.workdir);
        self.runner.run(&spec)
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn parse_status_line(line: &str) -> Result<StatusEntry> {
    if let Some(path) = line.strip_prefix("?? ") {
        return Ok(StatusEntry {
            code: "??".to_string(),
            path: path.trim().to_string(),
        });
    }
    if line.len() < 4 {
        return Err(anyhow!("unexpected porcelain line: '{line}'"));
    }
    let code = line[..2].to_string();
    let mut path = line[3..].trim().to_string();
    if let Some((_, new)) = path.split_once("->") {
        path = new.trim().to_string();
    }
    Ok(StatusEntry { code, path })
}
