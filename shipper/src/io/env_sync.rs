//! Environment propagation into fresh workspaces.
//!
//! Worktrees start without the untracked files a dev environment needs, so
//! new workspaces get the primary checkout's env files copied over and their
//! packages installed before the agent runs.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::io::config::EnvSyncConfig;
use crate::io::process::{CommandRunner, CommandSpec};

/// What one sync pass actually did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvSyncReport {
    /// Environment files copied from the primary checkout.
    pub copied: Vec<String>,
    /// Whether `.env` was seeded from `.env.example`.
    pub created_env: bool,
    /// Whether `npm install` ran to completion.
    pub npm_installed: bool,
}

/// Copy environment files into `workspace` and install packages.
///
/// Copying never overwrites: a file already present in the workspace is the
/// workspace's own. Package installation is best-effort; a failed install
/// logs a warning and the sync still succeeds.
#[instrument(skip_all, fields(workspace = %workspace.display()))]
pub fn sync_environment<R: CommandRunner>(
    runner: &R,
    primary_root: &Path,
    workspace: &Path,
    config: &EnvSyncConfig,
) -> Result<EnvSyncReport> {
    let mut report = EnvSyncReport::default();

    for name in &config.files {
        let source = primary_root.join(name);
        let target = workspace.join(name);
        if source.is_file() && !target.exists() {
            fs::copy(&source, &target)
                .with_context(|| format!("copy {} into {}", name, workspace.display()))?;
            debug!(file = %name, "copied environment file");
            report.copied.push(name.clone());
        }
    }

    let example = workspace.join(".env.example");
    let env = workspace.join(".env");
    if example.is_file() && !env.exists() {
        fs::copy(&example, &env).context("seed .env from .env.example")?;
        debug!("seeded .env from .env.example");
        report.created_env = true;
    }

    if config.npm_install && workspace.join("package.json").is_file() {
        info!("running npm install");
        let spec = CommandSpec::new("npm", ["install", "--silent"]).cwd(workspace);
        match runner.run(&spec) {
            Ok(out) if out.success() => report.npm_installed = true,
            Ok(out) => warn!(exit_code = ?out.exit_code, "npm install failed"),
            Err(err) => warn!(err = %err, "npm install could not run"),
        }
    }

    Ok(report)
}
