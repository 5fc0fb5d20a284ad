//! Pure workspace planning.
//!
//! [`plan_workspace`] maps a request plus freshly gathered repository facts
//! to a plan, with no side effects and no hidden state. Callers gather the
//! facts live on every invocation; nothing about a previous decision is
//! consulted, so repeating a call against an unchanged repository yields the
//! identical plan.
//!
//! The ladder is evaluated strictly in order:
//!
//! 1. Already on a non-protected branch → work in place, touch nothing.
//! 2. Explicit directive → reuse its worktree, or create it.
//! 3. Suggested branch collides → conflict gate, in every approval mode.
//! 4. Yolo → create the suggested worktree.
//! 5. Otherwise → pause for a workspace choice.

use std::path::PathBuf;

use crate::core::checkpoint::Checkpoint;
use crate::core::naming::WorkspaceSuggestion;
use crate::core::types::WorkspaceRequest;

/// Repository facts gathered immediately before planning.
///
/// Always rebuilt from live queries; never cached across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionFacts {
    /// Current branch name, empty on a detached HEAD.
    pub current_branch: String,
    pub current_is_protected: bool,
    /// Whether the directive's worktree path is already registered.
    pub directive_worktree_exists: bool,
    /// Whether the directive's branch already exists.
    pub directive_branch_exists: bool,
    /// Whether the suggested branch name already exists.
    pub suggested_branch_exists: bool,
}

/// How environment sync is gated after a worktree is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncGate {
    /// Ask before syncing.
    Confirm,
    /// Sync without asking; surface a notice only.
    Auto,
}

/// The planned course of action, ready for an executor to carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspacePlan {
    /// Stay where we are; the current checkout is already a workspace.
    UseCurrent { branch: String },
    /// Adopt an existing worktree without mutating anything.
    ReuseWorktree { path: PathBuf, branch: String },
    /// Create a worktree, on an existing branch when `reuse_branch` is set.
    CreateWorktree {
        path: PathBuf,
        branch: String,
        reuse_branch: bool,
        sync_gate: SyncGate,
    },
    /// A branch collision needs an external decision before anything runs.
    Conflict { checkpoint: Checkpoint },
    /// Normal mode with nothing decided; pause for a workspace choice.
    AwaitChoice { checkpoint: Checkpoint },
}

/// Decide what to do for one issue. Pure: same inputs, same plan.
pub fn plan_workspace(
    request: &WorkspaceRequest,
    suggestion: &WorkspaceSuggestion,
    facts: &ProvisionFacts,
) -> WorkspacePlan {
    if !facts.current_branch.is_empty() && !facts.current_is_protected {
        return WorkspacePlan::UseCurrent {
            branch: facts.current_branch.clone(),
        };
    }

    if let Some(directive) = &request.directive {
        if facts.directive_worktree_exists {
            return WorkspacePlan::ReuseWorktree {
                path: directive.path.clone(),
                branch: directive.branch.clone(),
            };
        }
        return WorkspacePlan::CreateWorktree {
            path: directive.path.clone(),
            branch: directive.branch.clone(),
            reuse_branch: facts.directive_branch_exists,
            sync_gate: SyncGate::Confirm,
        };
    }

    if facts.suggested_branch_exists {
        return WorkspacePlan::Conflict {
            checkpoint: Checkpoint::branch_conflict(&suggestion.branch),
        };
    }

    if request.approval.is_yolo() {
        return WorkspacePlan::CreateWorktree {
            path: suggestion.path.clone(),
            branch: suggestion.branch.clone(),
            reuse_branch: false,
            sync_gate: SyncGate::Auto,
        };
    }

    WorkspacePlan::AwaitChoice {
        checkpoint: Checkpoint::workspace_choice(
            request.issue_number,
            &request.title,
            &facts.current_branch,
            &suggestion.path,
            &suggestion.branch,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::naming::suggest_workspace;
    use crate::core::types::{ApprovalMode, WorkspaceDirective};

    fn request(approval: ApprovalMode, directive: Option<WorkspaceDirective>) -> WorkspaceRequest {
        WorkspaceRequest {
            issue_number: 42,
            title: "Add retry logic".to_string(),
            body: String::new(),
            approval,
            directive,
        }
    }

    fn on_main() -> ProvisionFacts {
        ProvisionFacts {
            current_branch: "main".to_string(),
            current_is_protected: true,
            directive_worktree_exists: false,
            directive_branch_exists: false,
            suggested_branch_exists: false,
        }
    }

    fn directive() -> WorkspaceDirective {
        WorkspaceDirective {
            path: PathBuf::from("../widget-worktrees/42"),
            branch: "feat/issue-42-pinned".to_string(),
        }
    }

    fn suggestion() -> WorkspaceSuggestion {
        suggest_workspace("widget", 42, "Add retry logic")
    }

    /// Verifies a feature branch wins over every later rule, directive and
    /// collision included.
    #[test]
    fn feature_branch_short_circuits_everything() {
        let facts = ProvisionFacts {
            current_branch: "feat/other-work".to_string(),
            current_is_protected: false,
            directive_worktree_exists: true,
            directive_branch_exists: true,
            suggested_branch_exists: true,
        };
        let plan = plan_workspace(
            &request(ApprovalMode::Normal, Some(directive())),
            &suggestion(),
            &facts,
        );
        assert_eq!(
            plan,
            WorkspacePlan::UseCurrent {
                branch: "feat/other-work".to_string()
            }
        );
    }

    #[test]
    fn directive_reuses_existing_worktree() {
        let facts = ProvisionFacts {
            directive_worktree_exists: true,
            ..on_main()
        };
        let plan = plan_workspace(
            &request(ApprovalMode::Normal, Some(directive())),
            &suggestion(),
            &facts,
        );
        assert_eq!(
            plan,
            WorkspacePlan::ReuseWorktree {
                path: PathBuf::from("../widget-worktrees/42"),
                branch: "feat/issue-42-pinned".to_string(),
            }
        );
    }

    #[test]
    fn directive_creates_worktree_reusing_existing_branch() {
        let facts = ProvisionFacts {
            directive_branch_exists: true,
            ..on_main()
        };
        let plan = plan_workspace(
            &request(ApprovalMode::Normal, Some(directive())),
            &suggestion(),
            &facts,
        );
        assert_eq!(
            plan,
            WorkspacePlan::CreateWorktree {
                path: PathBuf::from("../widget-worktrees/42"),
                branch: "feat/issue-42-pinned".to_string(),
                reuse_branch: true,
                sync_gate: SyncGate::Confirm,
            }
        );
    }

    /// Verifies a directive wins over a collision on the suggested name: the
    /// directive names its own branch, so the suggestion never applies.
    #[test]
    fn directive_ignores_suggested_branch_collision() {
        let facts = ProvisionFacts {
            suggested_branch_exists: true,
            ..on_main()
        };
        let plan = plan_workspace(
            &request(ApprovalMode::Yolo, Some(directive())),
            &suggestion(),
            &facts,
        );
        assert!(matches!(plan, WorkspacePlan::CreateWorktree { .. }));
    }

    #[test]
    fn suggested_collision_gates_in_both_modes() {
        let facts = ProvisionFacts {
            suggested_branch_exists: true,
            ..on_main()
        };
        for approval in [ApprovalMode::Normal, ApprovalMode::Yolo] {
            let plan = plan_workspace(&request(approval, None), &suggestion(), &facts);
            let WorkspacePlan::Conflict { checkpoint } = plan else {
                panic!("expected conflict in {approval:?}");
            };
            let Checkpoint::BranchConflict { options, .. } = checkpoint else {
                panic!("expected branch conflict checkpoint");
            };
            assert_eq!(options.len(), 3);
        }
    }

    #[test]
    fn yolo_creates_suggested_worktree() {
        let plan = plan_workspace(&request(ApprovalMode::Yolo, None), &suggestion(), &on_main());
        assert_eq!(
            plan,
            WorkspacePlan::CreateWorktree {
                path: PathBuf::from("../widget-worktrees/42"),
                branch: "feat/issue-42-add-retry-logic".to_string(),
                reuse_branch: false,
                sync_gate: SyncGate::Auto,
            }
        );
    }

    #[test]
    fn normal_mode_pauses_for_workspace_choice() {
        let plan = plan_workspace(&request(ApprovalMode::Normal, None), &suggestion(), &on_main());
        let WorkspacePlan::AwaitChoice { checkpoint } = plan else {
            panic!("expected workspace choice");
        };
        assert!(checkpoint.requires_decision());
        let Checkpoint::WorkspaceChoice { options, .. } = checkpoint else {
            panic!("expected workspace choice checkpoint");
        };
        let values: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["worktree", "in_place", "custom"]);
    }

    /// Verifies a detached HEAD is not treated as a usable feature branch.
    #[test]
    fn detached_head_falls_through_to_choice() {
        let facts = ProvisionFacts {
            current_branch: String::new(),
            current_is_protected: false,
            ..on_main()
        };
        let plan = plan_workspace(&request(ApprovalMode::Normal, None), &suggestion(), &facts);
        assert!(matches!(plan, WorkspacePlan::AwaitChoice { .. }));
    }

    #[test]
    fn planning_is_deterministic() {
        let req = request(ApprovalMode::Normal, None);
        let facts = on_main();
        assert_eq!(
            plan_workspace(&req, &suggestion(), &facts),
            plan_workspace(&req, &suggestion(), &facts)
        );
    }
}
