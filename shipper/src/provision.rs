//! Orchestration of workspace provisioning for one issue.
//!
//! Planning is pure and lives in [`crate::core::plan`]; this module gathers
//! live repository facts, executes the plan, and shapes the outcome into a
//! [`WorkspaceDecision`]. Nothing about previous decisions is read back:
//! rerunning against an unchanged repository reproduces the same decision.

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::checkpoint::Checkpoint;
use crate::core::naming::{WorkspaceSuggestion, is_protected, suggest_workspace};
use crate::core::plan::{ProvisionFacts, SyncGate, WorkspacePlan, plan_workspace};
use crate::core::types::{ProvisionAction, WorkspaceDecision, WorkspaceMode, WorkspaceRequest};
use crate::io::config::ShipperConfig;
use crate::io::git::Git;
use crate::io::process::CommandRunner;

/// Workspace shape chosen by the operator after a choice checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceChoice {
    Worktree,
    InPlace,
}

/// Provision a workspace for one issue.
///
/// `choice` carries the operator's answer to an earlier workspace-choice
/// checkpoint; without one, the decision ladder runs on live facts and may
/// pause instead of mutating anything.
#[instrument(skip_all, fields(issue = request.issue_number))]
pub fn provision_workspace<R: CommandRunner>(
    git: &Git<R>,
    config: &ShipperConfig,
    request: &WorkspaceRequest,
    choice: Option<WorkspaceChoice>,
) -> Result<WorkspaceDecision> {
    let repo_name = git.repo_name()?;
    let suggestion = suggest_workspace(&repo_name, request.issue_number, &request.title);

    if let Some(choice) = choice {
        return apply_choice(git, &suggestion, choice);
    }

    let current_branch = git.current_branch()?;
    let facts = ProvisionFacts {
        current_is_protected: is_protected(&current_branch, &config.protected_branches),
        current_branch,
        directive_worktree_exists: match &request.directive {
            Some(directive) => git.worktree_exists(&directive.path)?,
            None => false,
        },
        directive_branch_exists: match &request.directive {
            Some(directive) => git.branch_exists(&directive.branch)?,
            None => false,
        },
        suggested_branch_exists: git.branch_exists(&suggestion.branch)?,
    };
    debug!(?facts, "gathered provisioning facts");

    execute_plan(git, plan_workspace(request, &suggestion, &facts))
}

fn execute_plan<R: CommandRunner>(git: &Git<R>, plan: WorkspacePlan) -> Result<WorkspaceDecision> {
    match plan {
        WorkspacePlan::UseCurrent { branch } => {
            info!(branch = %branch, "already on a feature branch, using current checkout");
            Ok(WorkspaceDecision {
                workspace_path: Some(git.resolved_workdir()),
                workspace_branch: Some(branch),
                workspace_mode: Some(WorkspaceMode::InPlace),
                action_taken: ProvisionAction::Skipped,
                checkpoint: None,
            })
        }
        WorkspacePlan::ReuseWorktree { path, branch } => {
            let resolved = git.absolute_path(&path);
            info!(path = %resolved.display(), "reusing existing worktree");
            Ok(WorkspaceDecision {
                workspace_path: Some(resolved),
                workspace_branch: Some(branch),
                workspace_mode: Some(WorkspaceMode::Worktree),
                action_taken: ProvisionAction::Reused,
                checkpoint: None,
            })
        }
        WorkspacePlan::CreateWorktree {
            path,
            branch,
            reuse_branch,
            sync_gate,
        } => create_worktree(git, &path, &branch, reuse_branch, sync_gate),
        WorkspacePlan::Conflict { checkpoint } => {
            debug!("suggested branch already exists");
            Ok(pending_decision(ProvisionAction::Conflict, checkpoint))
        }
        WorkspacePlan::AwaitChoice { checkpoint } => {
            Ok(pending_decision(ProvisionAction::Pending, checkpoint))
        }
    }
}

/// Carry out an operator's workspace choice.
///
/// The choice answers the workspace question only; a collision on the
/// suggested branch still surfaces its own checkpoint.
fn apply_choice<R: CommandRunner>(
    git: &Git<R>,
    suggestion: &WorkspaceSuggestion,
    choice: WorkspaceChoice,
) -> Result<WorkspaceDecision> {
    if git.branch_exists(&suggestion.branch)? {
        debug!("suggested branch already exists");
        return Ok(pending_decision(
            ProvisionAction::Conflict,
            Checkpoint::branch_conflict(&suggestion.branch),
        ));
    }
    match choice {
        WorkspaceChoice::Worktree => create_worktree(
            git,
            &suggestion.path,
            &suggestion.branch,
            false,
            SyncGate::Confirm,
        ),
        WorkspaceChoice::InPlace => {
            if let Err(err) = git.checkout_new_branch(&suggestion.branch) {
                warn!(err = %err, "branch creation failed");
                return Ok(pending_decision(
                    ProvisionAction::Error,
                    Checkpoint::error(format!("Failed to create branch: {err:#}")),
                ));
            }
            info!(branch = %suggestion.branch, "created branch in current directory");
            Ok(WorkspaceDecision {
                workspace_path: Some(git.resolved_workdir()),
                workspace_branch: Some(suggestion.branch.clone()),
                workspace_mode: Some(WorkspaceMode::InPlace),
                action_taken: ProvisionAction::Created,
                checkpoint: None,
            })
        }
    }
}

fn create_worktree<R: CommandRunner>(
    git: &Git<R>,
    path: &Path,
    branch: &str,
    reuse_branch: bool,
    sync_gate: SyncGate,
) -> Result<WorkspaceDecision> {
    if let Err(err) = git.worktree_add(path, branch, reuse_branch) {
        warn!(err = %err, "worktree creation failed");
        return Ok(pending_decision(
            ProvisionAction::Error,
            Checkpoint::error(format!("Failed to create worktree: {err:#}")),
        ));
    }
    let resolved = git.absolute_path(path);
    info!(path = %resolved.display(), branch, "worktree created");
    let checkpoint = match sync_gate {
        SyncGate::Confirm => Checkpoint::env_sync_confirm(&resolved),
        SyncGate::Auto => Checkpoint::env_sync_yolo(&resolved),
    };
    Ok(WorkspaceDecision {
        workspace_path: Some(resolved),
        workspace_branch: Some(branch.to_string()),
        workspace_mode: Some(WorkspaceMode::Worktree),
        action_taken: ProvisionAction::Created,
        checkpoint: Some(checkpoint),
    })
}

fn pending_decision(action: ProvisionAction, checkpoint: Checkpoint) -> WorkspaceDecision {
    WorkspaceDecision {
        workspace_path: None,
        workspace_branch: None,
        workspace_mode: None,
        action_taken: action,
        checkpoint: Some(checkpoint),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ApprovalMode, WorkspaceDirective};
    use crate::test_support::TestRepo;
    use std::fs;

    fn request(approval: ApprovalMode) -> WorkspaceRequest {
        WorkspaceRequest {
            issue_number: 42,
            title: "Add retry logic".to_string(),
            body: String::new(),
            approval,
            directive: None,
        }
    }

    /// Verifies an existing feature branch is adopted without touching git.
    #[test]
    fn feature_branch_is_used_in_place() {
        let repo = TestRepo::new();
        repo.checkout_feature("feat/already-working");

        let decision = provision_workspace(
            &repo.git(),
            &ShipperConfig::default(),
            &request(ApprovalMode::Normal),
            None,
        )
        .expect("provision");

        assert_eq!(decision.action_taken, ProvisionAction::Skipped);
        assert_eq!(decision.workspace_mode, Some(WorkspaceMode::InPlace));
        assert_eq!(
            decision.workspace_branch,
            Some("feat/already-working".to_string())
        );
        assert!(decision.checkpoint.is_none());
    }

    /// Verifies normal mode pauses without creating anything.
    #[test]
    fn normal_mode_pauses_and_mutates_nothing() {
        let repo = TestRepo::new();

        let decision = provision_workspace(
            &repo.git(),
            &ShipperConfig::default(),
            &request(ApprovalMode::Normal),
            None,
        )
        .expect("provision");

        assert_eq!(decision.action_taken, ProvisionAction::Pending);
        assert!(decision.is_pending());
        assert!(decision.workspace_path.is_none());
        assert!(
            !repo
                .git()
                .branch_exists("feat/issue-42-add-retry-logic")
                .expect("branch check")
        );
        assert!(!repo.parent().join("repo-worktrees").exists());
    }

    /// Verifies yolo mode creates the suggested worktree and reports the
    /// sync notice without pausing.
    #[test]
    fn yolo_mode_creates_worktree() {
        let repo = TestRepo::new();

        let decision = provision_workspace(
            &repo.git(),
            &ShipperConfig::default(),
            &request(ApprovalMode::Yolo),
            None,
        )
        .expect("provision");

        assert_eq!(decision.action_taken, ProvisionAction::Created);
        assert_eq!(decision.workspace_mode, Some(WorkspaceMode::Worktree));
        assert!(!decision.is_pending());
        let path = decision.workspace_path.expect("path");
        assert!(path.is_dir());
        assert!(path.ends_with("repo-worktrees/42"));
        let checkpoint = decision.checkpoint.expect("checkpoint");
        assert_eq!(checkpoint.kind(), "env_sync_yolo");
        assert!(
            repo.git()
                .branch_exists("feat/issue-42-add-retry-logic")
                .expect("branch check")
        );
    }

    /// Verifies a directive worktree that already exists is reused as-is.
    #[test]
    fn directive_worktree_is_reused_without_mutation() {
        let repo = TestRepo::new();
        let mut req = request(ApprovalMode::Yolo);
        req.directive = Some(WorkspaceDirective {
            path: "../repo-worktrees/42".into(),
            branch: "feat/issue-42-pinned".to_string(),
        });

        let first = provision_workspace(&repo.git(), &ShipperConfig::default(), &req, None)
            .expect("first");
        assert_eq!(first.action_taken, ProvisionAction::Created);

        let worktrees_before = repo.git().worktree_paths().expect("worktrees");
        let second = provision_workspace(&repo.git(), &ShipperConfig::default(), &req, None)
            .expect("second");

        assert_eq!(second.action_taken, ProvisionAction::Reused);
        assert!(second.checkpoint.is_none());
        assert_eq!(
            repo.git().worktree_paths().expect("worktrees"),
            worktrees_before
        );
        assert_eq!(second.workspace_path, first.workspace_path);
    }

    /// Verifies a collision on the suggested branch pauses both modes.
    #[test]
    fn branch_collision_pauses_instead_of_resolving() {
        let repo = TestRepo::new();
        repo.create_branch("feat/issue-42-add-retry-logic");

        for approval in [ApprovalMode::Normal, ApprovalMode::Yolo] {
            let decision = provision_workspace(
                &repo.git(),
                &ShipperConfig::default(),
                &request(approval),
                None,
            )
            .expect("provision");
            assert_eq!(decision.action_taken, ProvisionAction::Conflict);
            assert!(decision.is_pending());
        }
    }

    /// Verifies the in-place choice creates and switches to the branch.
    #[test]
    fn in_place_choice_switches_branch() {
        let repo = TestRepo::new();

        let decision = provision_workspace(
            &repo.git(),
            &ShipperConfig::default(),
            &request(ApprovalMode::Normal),
            Some(WorkspaceChoice::InPlace),
        )
        .expect("provision");

        assert_eq!(decision.action_taken, ProvisionAction::Created);
        assert_eq!(decision.workspace_mode, Some(WorkspaceMode::InPlace));
        assert!(decision.checkpoint.is_none());
        assert_eq!(
            repo.git().current_branch().expect("branch"),
            "feat/issue-42-add-retry-logic"
        );
    }

    /// Verifies a failed creation leaves no partial workspace behind.
    #[test]
    fn failed_creation_is_all_or_nothing() {
        let repo = TestRepo::new();
        // A file where the worktree parent directory should go makes the
        // creation fail.
        fs::write(repo.parent().join("repo-worktrees"), "in the way").expect("block path");

        let decision = provision_workspace(
            &repo.git(),
            &ShipperConfig::default(),
            &request(ApprovalMode::Yolo),
            None,
        )
        .expect("provision");

        assert_eq!(decision.action_taken, ProvisionAction::Error);
        assert!(decision.workspace_path.is_none());
        let checkpoint = decision.checkpoint.expect("checkpoint");
        assert!(checkpoint.message().starts_with("Failed to create worktree:"));
        assert!(
            !repo
                .git()
                .branch_exists("feat/issue-42-add-retry-logic")
                .expect("branch check")
        );
    }

    /// Verifies repeated calls against an unchanged repository reach the
    /// same decision.
    #[test]
    fn decisions_are_repeatable() {
        let repo = TestRepo::new();
        let req = request(ApprovalMode::Normal);

        let first = provision_workspace(&repo.git(), &ShipperConfig::default(), &req, None)
            .expect("first");
        let second = provision_workspace(&repo.git(), &ShipperConfig::default(), &req, None)
            .expect("second");

        assert_eq!(
            serde_json::to_value(&first).expect("json"),
            serde_json::to_value(&second).expect("json")
        );
    }
}
