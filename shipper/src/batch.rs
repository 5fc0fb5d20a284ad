//! Batch processing of an inclusive issue range, resumable after failure.
//!
//! The on-disk record tracks only the range and a cursor; everything else is
//! re-derived from the live repository on each attempt. A failing issue halts
//! the batch with the cursor still on it, so a resume retries that issue
//! before moving on.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use tracing::{debug, info, instrument};

use crate::core::checkpoint::Checkpoint;
use crate::core::directive::extract_directive;
use crate::core::naming::suggest_workspace;
use crate::core::types::{
    ApprovalMode, ProvisionAction, WorkspaceDirective, WorkspaceMode, WorkspaceRequest,
};
use crate::io::agent::{Agent, AgentRequest, implement_and_report};
use crate::io::batch_state::{BatchRecord, BatchStore};
use crate::io::briefing::write_briefing;
use crate::io::config::ShipperConfig;
use crate::io::env_sync::sync_environment;
use crate::io::git::Git;
use crate::io::paths::ShipperPaths;
use crate::io::process::{CommandRunner, SystemRunner};
use crate::io::tracker::IssueTracker;
use crate::provision::provision_workspace;
use crate::ship::{ShipRequest, ship};

static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)-(\d+)$").expect("range regex should be valid"));
static SINGLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#?(\d+)$").expect("single-issue regex should be valid"));

/// Parse an issue selector into an inclusive `(start, end)` range.
///
/// Accepts a bare number (`42`), a hash-prefixed number (`#42`), or a range
/// (`10-12`). A single number is the one-element range `(n, n)`.
pub fn parse_issue_selector(arg: &str) -> Result<(u64, u64)> {
    if let Some(caps) = RANGE_RE.captures(arg) {
        let start: u64 = caps[1]
            .parse()
            .with_context(|| format!("parse issue range '{arg}'"))?;
        let end: u64 = caps[2]
            .parse()
            .with_context(|| format!("parse issue range '{arg}'"))?;
        if start > end {
            bail!("invalid issue range '{arg}' (start exceeds end)");
        }
        return Ok((start, end));
    }
    if let Some(caps) = SINGLE_RE.captures(arg) {
        let number: u64 = caps[1]
            .parse()
            .with_context(|| format!("parse issue number '{arg}'"))?;
        return Ok((number, number));
    }
    bail!("invalid issue selector '{arg}' (expected <number> or <start>-<end>)")
}

/// Fixed collaborators for one batch run.
pub struct BatchContext<'a, T: IssueTracker, A: Agent> {
    /// Primary checkout the batch operates from.
    pub repo_root: PathBuf,
    pub tracker: &'a T,
    pub agent: &'a A,
    pub config: ShipperConfig,
    /// Process issues the tracker reports as closed instead of refusing.
    pub include_closed: bool,
}

/// Store for the batch record of the repository at `repo_root`.
pub fn batch_store(repo_root: &Path) -> BatchStore {
    BatchStore::new(ShipperPaths::new(repo_root).state_path)
}

/// Run a fresh batch over `start..=end`, replacing any previous record.
#[instrument(skip_all, fields(start, end))]
pub fn run_batch<T: IssueTracker, A: Agent>(
    ctx: &BatchContext<'_, T, A>,
    original_args: &[String],
    start: u64,
    end: u64,
) -> Result<()> {
    let store = batch_store(&ctx.repo_root);
    let record = store.init(original_args, start, end)?;
    info!(start, end, "starting batch");
    process_range(ctx, &store, &record, start, false)?;
    store.complete()?;
    info!("batch completed");
    Ok(())
}

/// Resume an interrupted batch from its cursor.
#[instrument(skip_all)]
pub fn resume_batch<T: IssueTracker, A: Agent>(ctx: &BatchContext<'_, T, A>) -> Result<()> {
    let store = batch_store(&ctx.repo_root);
    let record = store.load_for_resume()?;
    info!(
        from = record.current_issue,
        end = record.end_issue,
        "resuming batch"
    );
    process_range(ctx, &store, &record, record.current_issue, true)?;
    store.complete()?;
    info!("batch completed");
    Ok(())
}

fn process_range<T: IssueTracker, A: Agent>(
    ctx: &BatchContext<'_, T, A>,
    store: &BatchStore,
    record: &BatchRecord,
    from: u64,
    resuming: bool,
) -> Result<()> {
    let total = record.end_issue - record.start_issue + 1;
    for issue in from..=record.end_issue {
        let position = issue - record.start_issue + 1;
        info!(issue, position, total, "processing issue");
        let is_resume = resuming && issue == from;
        process_issue(ctx, store, issue, is_resume)?;
        store.record_success(issue)?;
    }
    Ok(())
}

/// Take one issue through provisioning, implementation, and shipping.
///
/// The cursor is advanced before any work, so a failure anywhere leaves the
/// record pointing at this issue for the next resume.
#[instrument(skip_all, fields(issue))]
fn process_issue<T: IssueTracker, A: Agent>(
    ctx: &BatchContext<'_, T, A>,
    store: &BatchStore,
    issue: u64,
    is_resume: bool,
) -> Result<()> {
    store.advance_cursor(issue)?;

    let details = ctx
        .tracker
        .fetch(issue)
        .with_context(|| format!("fetch issue #{issue}"))?;
    if details.state.eq_ignore_ascii_case("closed") && !ctx.include_closed {
        bail!("issue #{issue} is already closed (rerun with --include-closed to process it anyway)");
    }

    let git = Git::new(&ctx.repo_root);
    let directive = if is_resume {
        Some(resume_directive(&git, issue, &details.title)?)
    } else {
        extract_directive(&details.body)
    };

    let request = WorkspaceRequest {
        issue_number: issue,
        title: details.title.clone(),
        body: details.body.clone(),
        approval: ApprovalMode::Yolo,
        directive,
    };
    let decision = provision_workspace(&git, &ctx.config, &request, None)?;
    match decision.action_taken {
        ProvisionAction::Skipped | ProvisionAction::Reused | ProvisionAction::Created => {}
        ProvisionAction::Conflict | ProvisionAction::Error => {
            let message = decision
                .checkpoint
                .as_ref()
                .map(Checkpoint::message)
                .unwrap_or("unknown provisioning failure");
            bail!("workspace setup failed for issue #{issue}: {message}");
        }
        ProvisionAction::Pending => {
            bail!("unexpected pending workspace decision in batch mode")
        }
    }
    let workspace = decision
        .workspace_path
        .ok_or_else(|| anyhow!("workspace decision for issue #{issue} is missing a path"))?;
    let branch = decision
        .workspace_branch
        .ok_or_else(|| anyhow!("workspace decision for issue #{issue} is missing a branch"))?;
    let mode = decision
        .workspace_mode
        .ok_or_else(|| anyhow!("workspace decision for issue #{issue} is missing a mode"))?;

    if mode == WorkspaceMode::Worktree {
        sync_environment(&SystemRunner, &ctx.repo_root, &workspace, &ctx.config.env_sync)?;
    }

    let paths = ShipperPaths::new(&workspace);
    paths.ensure_dir()?;
    let briefing = write_briefing(&paths.briefing_path(issue), &details, &workspace, &branch)?;

    let agent_request = AgentRequest {
        workdir: workspace.clone(),
        briefing,
        report_path: paths.agent_report_path(issue),
        log_path: paths.agent_log_path(issue),
        timeout: Duration::from_secs(ctx.config.agent.timeout_secs),
        output_limit_bytes: ctx.config.agent.output_limit_bytes,
    };
    let report = implement_and_report(ctx.agent, &agent_request)
        .with_context(|| format!("implementation failed for issue #{issue}"))?;

    let ship_request = ShipRequest {
        repo_root: ctx.repo_root.clone(),
        workspace_path: workspace,
        workspace_mode: mode,
        workspace_branch: branch,
        issue_number: issue,
        issue_title: details.title,
        summary: report.summary,
        tests_passed: report.tests_passed,
        approval: ApprovalMode::Yolo,
        review_approved: true,
        cleanup: None,
    };
    let outcome = ship(ctx.tracker, &ship_request)?;
    if let Some(Checkpoint::Error { message }) = &outcome.checkpoint {
        bail!("shipping failed for issue #{issue}: {message}");
    }
    info!(
        issue,
        commit = outcome.commit_hash.as_deref().unwrap_or("none"),
        closed = outcome.issue_closed,
        "issue processed"
    );
    Ok(())
}

/// Point a retried issue back at its workspace from the failed attempt.
///
/// The suggested path and branch are deterministic, so they name whatever
/// that attempt left behind. An existing worktree is restored to its last
/// commit first; a missing one will be created fresh by provisioning.
fn resume_directive<R: CommandRunner>(
    git: &Git<R>,
    issue: u64,
    title: &str,
) -> Result<WorkspaceDirective> {
    let repo_name = git.repo_name()?;
    let suggestion = suggest_workspace(&repo_name, issue, title);
    if git.worktree_exists(&suggestion.path)? {
        let path = git.absolute_path(&suggestion.path);
        info!(path = %path.display(), "reverting workspace from the failed attempt");
        Git::new(&path).revert_to_head()?;
    } else {
        debug!("no workspace left from the failed attempt, creating fresh");
    }
    Ok(WorkspaceDirective {
        path: suggestion.path,
        branch: suggestion.branch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_parses_single_issue() {
        let range = parse_issue_selector("42").expect("selector should parse");
        assert_eq!(range, (42, 42));
    }

    #[test]
    fn selector_parses_hash_prefixed_issue() {
        let range = parse_issue_selector("#7").expect("selector should parse");
        assert_eq!(range, (7, 7));
    }

    #[test]
    fn selector_parses_inclusive_range() {
        let range = parse_issue_selector("10-12").expect("selector should parse");
        assert_eq!(range, (10, 12));
    }

    #[test]
    fn selector_rejects_reversed_range() {
        let err = parse_issue_selector("12-10").expect_err("reversed range should fail");
        assert!(
            err.to_string().contains("start exceeds end"),
            "unexpected error: {err:#}"
        );
    }

    #[test]
    fn selector_rejects_garbage() {
        let err = parse_issue_selector("ten").expect_err("word should fail");
        assert!(
            err.to_string().contains("invalid issue selector"),
            "unexpected error: {err:#}"
        );
    }

    #[test]
    fn selector_rejects_trailing_text() {
        parse_issue_selector("42 now").expect_err("trailing text should fail");
    }
}
