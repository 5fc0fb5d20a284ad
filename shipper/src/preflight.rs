//! Environment checks that run before anything mutates.
//!
//! A missing tool aborts with one diagnostic up front instead of failing
//! halfway through an issue. Checks are ordered from most to least
//! fundamental, and only the first failure is reported.

use std::path::Path;

use anyhow::{Result, bail};
use tracing::debug;

use crate::io::process::{CommandRunner, CommandSpec};

/// Verify the repository and the external tools the pipeline shells out to.
pub fn check_environment<R: CommandRunner>(runner: &R, repo_root: &Path) -> Result<()> {
    let spec = CommandSpec::new("git", ["rev-parse", "--git-dir"]).cwd(repo_root);
    if !command_succeeds(runner, &spec) {
        bail!("not in a git repository");
    }
    if !command_succeeds(runner, &CommandSpec::new("gh", ["--version"])) {
        bail!("GitHub CLI (gh) is not installed");
    }
    if !command_succeeds(runner, &CommandSpec::new("gh", ["auth", "status"])) {
        bail!("GitHub CLI is not authenticated (run: gh auth login)");
    }
    if !command_succeeds(runner, &CommandSpec::new("codex", ["--version"])) {
        bail!("codex CLI is not installed");
    }
    debug!("environment checks passed");
    Ok(())
}

/// True when the command spawns and exits zero. A spawn failure means the
/// binary is absent, which is what the caller is probing for.
fn command_succeeds<R: CommandRunner>(runner: &R, spec: &CommandSpec) -> bool {
    runner
        .run(spec)
        .map(|output| output.success())
        .unwrap_or(false)
}
