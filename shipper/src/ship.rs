//! Orchestration of the shipping phase: commit, comment, closure, cleanup.
//!
//! Phases run in a fixed order and degrade independently. A failed commit
//! stops everything behind an error checkpoint; a failed comment or close is
//! a warning, because the commit already exists and rerunning the whole
//! phase would do more harm than a missing annotation.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::checkpoint::Checkpoint;
use crate::core::closure::evaluate_closure;
use crate::core::types::{ApprovalMode, ShippingOutcome, WorkspaceMode, WorktreeDisposition};
use crate::io::briefing::render_comment;
use crate::io::git::Git;
use crate::io::tracker::IssueTracker;

/// Operator's answer to a worktree-cleanup checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupChoice {
    Remove,
    Keep,
}

/// Everything the shipping phase needs to know about one finished
/// implementation run.
#[derive(Debug, Clone)]
pub struct ShipRequest {
    /// Primary checkout, used for worktree removal.
    pub repo_root: PathBuf,
    pub workspace_path: PathBuf,
    pub workspace_mode: WorkspaceMode,
    pub workspace_branch: String,
    pub issue_number: u64,
    pub issue_title: String,
    /// Agent's implementation summary, also the closure-analysis input.
    pub summary: String,
    pub tests_passed: bool,
    pub approval: ApprovalMode,
    /// True once an operator approved a pre-commit review checkpoint.
    pub review_approved: bool,
    /// Answer to an earlier cleanup checkpoint, if any.
    pub cleanup: Option<CleanupChoice>,
}

/// Ship one implemented issue.
#[instrument(skip_all, fields(issue = request.issue_number))]
pub fn ship<T: IssueTracker>(tracker: &T, request: &ShipRequest) -> Result<ShippingOutcome> {
    let git = Git::new(&request.workspace_path);

    let entries = git.status_porcelain()?;
    let diff_stat = git.diff_stat()?;
    let files_changed = entries.len();
    info!(files_changed, "gathered workspace changes");

    if request.approval == ApprovalMode::Normal && !request.review_approved {
        debug!("pausing for pre-commit review");
        let status_output = entries
            .iter()
            .map(|entry| format!("{} {}", entry.code, entry.path))
            .collect::<Vec<_>>()
            .join("\n");
        return Ok(ShippingOutcome {
            commit_hash: None,
            files_changed,
            issue_closed: false,
            closure_blockers: Vec::new(),
            worktree_disposition: WorktreeDisposition::Pending,
            comment_url: None,
            checkpoint: Some(Checkpoint::PreCommitReview {
                message: "Review changes before committing".to_string(),
                workspace_path: request.workspace_path.clone(),
                workspace_branch: request.workspace_branch.clone(),
                status_output,
                diff_stat,
                files_changed,
            }),
        });
    }

    let message = format!(
        "{}\n\nImplements #{}",
        request.issue_title, request.issue_number
    );
    git.add_all()?;
    let committed = match git.commit_staged(&message) {
        Ok(committed) => committed,
        Err(err) => {
            warn!(err = %err, "commit failed");
            return Ok(ShippingOutcome {
                commit_hash: None,
                files_changed,
                issue_closed: false,
                closure_blockers: vec![format!("Commit failed: {err:#}")],
                worktree_disposition: WorktreeDisposition::Kept,
                comment_url: None,
                checkpoint: Some(Checkpoint::error(format!(
                    "Failed to commit changes: {err:#}"
                ))),
            });
        }
    };
    if !committed {
        warn!("no changes to commit, skipping comment and closure");
        return Ok(ShippingOutcome {
            commit_hash: None,
            files_changed,
            issue_closed: false,
            closure_blockers: Vec::new(),
            worktree_disposition: WorktreeDisposition::Kept,
            comment_url: None,
            checkpoint: None,
        });
    }
    let commit_hash = git.short_head()?;
    info!(commit = %commit_hash, "committed implementation");

    let comment = render_comment(
        &request.summary,
        &request.workspace_branch,
        request.approval.is_yolo(),
    )?;
    let comment_url = match tracker.comment(request.issue_number, &comment) {
        Ok(()) => {
            info!("posted implementation summary comment");
            resolve_comment_url(tracker, request.issue_number)
        }
        Err(err) => {
            warn!(err = %err, "failed to post comment");
            None
        }
    };

    let evaluation = evaluate_closure(&request.summary, request.tests_passed);
    let issue_closed = if evaluation.eligible {
        match tracker.close(request.issue_number) {
            Ok(()) => {
                info!("closed issue");
                true
            }
            Err(err) => {
                warn!(err = %err, "failed to close issue");
                false
            }
        }
    } else {
        debug!(blockers = evaluation.blockers.len(), "closure withheld");
        false
    };

    let mut checkpoint = None;
    let worktree_disposition = match request.workspace_mode {
        WorkspaceMode::InPlace => WorktreeDisposition::Kept,
        WorkspaceMode::Worktree => match (request.approval, request.cleanup) {
            (_, Some(CleanupChoice::Remove)) => {
                let primary = Git::new(&request.repo_root);
                match primary.worktree_remove(&request.workspace_path) {
                    Ok(()) => {
                        info!("removed worktree");
                        WorktreeDisposition::Removed
                    }
                    Err(err) => {
                        warn!(err = %err, "worktree removal failed");
                        WorktreeDisposition::Kept
                    }
                }
            }
            (_, Some(CleanupChoice::Keep)) | (ApprovalMode::Yolo, None) => {
                WorktreeDisposition::Kept
            }
            (ApprovalMode::Normal, None) => {
                checkpoint = Some(Checkpoint::WorktreeCleanup {
                    message: "Implementation complete. Remove worktree?".to_string(),
                    worktree_path: request.workspace_path.clone(),
                    workspace_branch: request.workspace_branch.clone(),
                    issue_closed,
                });
                WorktreeDisposition::Pending
            }
        },
    };

    Ok(ShippingOutcome {
        commit_hash: Some(commit_hash),
        files_changed,
        issue_closed,
        closure_blockers: evaluation.blockers,
        worktree_disposition,
        comment_url,
        checkpoint,
    })
}

fn resolve_comment_url<T: IssueTracker>(tracker: &T, issue_number: u64) -> Option<String> {
    match tracker.repo_url() {
        Ok(Some(url)) => Some(format!("{url}/issues/{issue_number}#issuecomment")),
        Ok(None) => None,
        Err(err) => {
            debug!(err = %err, "repository url lookup failed");
            None
        }
    }
}
