//! Decision-gate payloads surfaced when the pipeline pauses.
//!
//! A checkpoint is a pure data value: a named situation plus the fields that
//! situation needs, safe to serialize, log, or hand to a UI. The enum is
//! closed. Every gate the pipeline can reach has exactly one variant here,
//! so consumers match instead of probing string-keyed bags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One selectable choice within a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointOption {
    pub label: String,
    /// Machine value the resuming caller passes back.
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CheckpointOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            description: None,
        }
    }

    pub fn with_description(
        label: impl Into<String>,
        value: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            description: Some(description.into()),
        }
    }
}

/// A serializable request for an external decision, or an informational
/// notice attached to an already-final decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Checkpoint {
    /// Normal mode reached setup with no directive and no conflict.
    WorkspaceChoice {
        message: String,
        issue_number: u64,
        issue_title: String,
        suggested_path: PathBuf,
        suggested_branch: String,
        options: Vec<CheckpointOption>,
    },
    /// The suggested branch name already exists.
    BranchConflict {
        message: String,
        suggested_branch: String,
        options: Vec<CheckpointOption>,
    },
    /// A worktree was created from an explicit directive; syncing the
    /// environment is the recommended next step.
    EnvSyncConfirm {
        message: String,
        worktree_path: PathBuf,
    },
    /// A worktree was auto-created in yolo mode; environment sync follows by
    /// default and is surfaced here for traceability.
    EnvSyncYolo {
        message: String,
        worktree_path: PathBuf,
    },
    /// Changes are gathered and awaiting review before any commit.
    PreCommitReview {
        message: String,
        workspace_path: PathBuf,
        workspace_branch: String,
        status_output: String,
        diff_stat: String,
        files_changed: usize,
    },
    /// Shipping finished from a worktree; decide whether to remove it.
    WorktreeCleanup {
        message: String,
        worktree_path: PathBuf,
        workspace_branch: String,
        issue_closed: bool,
    },
    /// A phase failed in a way the pipeline cannot resolve on its own.
    Error { message: String },
}

impl Checkpoint {
    /// True when the pipeline must stop until a choice is supplied.
    ///
    /// Env-sync notices and errors are informational: the decision they ride
    /// on is already final, they only name a recommended follow-up.
    pub fn requires_decision(&self) -> bool {
        matches!(
            self,
            Checkpoint::WorkspaceChoice { .. }
                | Checkpoint::BranchConflict { .. }
                | Checkpoint::PreCommitReview { .. }
                | Checkpoint::WorktreeCleanup { .. }
        )
    }

    /// Situation tag as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Checkpoint::WorkspaceChoice { .. } => "workspace_choice",
            Checkpoint::BranchConflict { .. } => "branch_conflict",
            Checkpoint::EnvSyncConfirm { .. } => "env_sync_confirm",
            Checkpoint::EnvSyncYolo { .. } => "env_sync_yolo",
            Checkpoint::PreCommitReview { .. } => "pre_commit_review",
            Checkpoint::WorktreeCleanup { .. } => "worktree_cleanup",
            Checkpoint::Error { .. } => "error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Checkpoint::WorkspaceChoice { message, .. }
            | Checkpoint::BranchConflict { message, .. }
            | Checkpoint::EnvSyncConfirm { message, .. }
            | Checkpoint::EnvSyncYolo { message, .. }
            | Checkpoint::PreCommitReview { message, .. }
            | Checkpoint::WorktreeCleanup { message, .. }
            | Checkpoint::Error { message } => message,
        }
    }

    /// Branch-name collision on the suggested branch. Fires in every
    /// approval mode; collisions are never auto-resolved.
    pub fn branch_conflict(suggested_branch: &str) -> Self {
        Checkpoint::BranchConflict {
            message: format!("Branch '{suggested_branch}' already exists"),
            suggested_branch: suggested_branch.to_string(),
            options: vec![
                CheckpointOption::new("Use existing branch", "use_existing"),
                CheckpointOption::new(
                    format!("Create with suffix: {suggested_branch}-v2"),
                    "add_suffix",
                ),
                CheckpointOption::new("Custom branch name", "custom"),
            ],
        }
    }

    /// Workspace choice offered in normal mode when nothing was decided yet.
    pub fn workspace_choice(
        issue_number: u64,
        issue_title: &str,
        current_branch: &str,
        suggested_path: &Path,
        suggested_branch: &str,
    ) -> Self {
        let location = if current_branch.is_empty() {
            "a detached HEAD".to_string()
        } else {
            format!("'{current_branch}'")
        };
        Checkpoint::WorkspaceChoice {
            message: format!("You're on {location}. Choose workspace setup approach."),
            issue_number,
            issue_title: issue_title.to_string(),
            suggested_path: suggested_path.to_path_buf(),
            suggested_branch: suggested_branch.to_string(),
            options: vec![
                CheckpointOption::with_description(
                    "Create isolated worktree (recommended)",
                    "worktree",
                    format!("Creates worktree at {}", suggested_path.display()),
                ),
                CheckpointOption::with_description(
                    "Switch this directory to new branch",
                    "in_place",
                    format!("Creates branch {suggested_branch} in current directory"),
                ),
                CheckpointOption::with_description(
                    "Custom worktree path and/or branch name",
                    "custom",
                    "Specify custom path and branch",
                ),
            ],
        }
    }

    pub fn env_sync_confirm(worktree_path: &Path) -> Self {
        Checkpoint::EnvSyncConfirm {
            message: "Worktree created from issue config. Sync environment files?".to_string(),
            worktree_path: worktree_path.to_path_buf(),
        }
    }

    pub fn env_sync_yolo(worktree_path: &Path) -> Self {
        Checkpoint::EnvSyncYolo {
            message: "Auto-created worktree (YOLO mode). Auto-sync environment?".to_string(),
            worktree_path: worktree_path.to_path_buf(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Checkpoint::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_snake_case_type_tag() {
        let checkpoint = Checkpoint::branch_conflict("feat/issue-7-retry");
        let json = serde_json::to_value(&checkpoint).expect("serialize");
        assert_eq!(json["type"], "branch_conflict");
        assert_eq!(json["suggested_branch"], "feat/issue-7-retry");
    }

    #[test]
    fn round_trips_through_json() {
        let checkpoint = Checkpoint::workspace_choice(
            12,
            "Add retry logic",
            "main",
            Path::new("../widget-worktrees/12"),
            "feat/issue-12-add-retry-logic",
        );
        let json = serde_json::to_string(&checkpoint).expect("serialize");
        let parsed: Checkpoint = serde_json::from_str(&json).expect("parse");
        assert_eq!(parsed, checkpoint);
    }

    #[test]
    fn conflict_offers_exactly_three_options() {
        let Checkpoint::BranchConflict { options, .. } = Checkpoint::branch_conflict("feat/x")
        else {
            panic!("expected branch conflict");
        };
        let values: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["use_existing", "add_suffix", "custom"]);
    }

    #[test]
    fn blocking_and_informational_checkpoints_are_partitioned() {
        let blocking = [
            Checkpoint::workspace_choice(1, "t", "main", Path::new("../w/1"), "feat/issue-1-t"),
            Checkpoint::branch_conflict("feat/issue-1-t"),
        ];
        for checkpoint in blocking {
            assert!(checkpoint.requires_decision(), "{}", checkpoint.kind());
        }

        let informational = [
            Checkpoint::env_sync_confirm(Path::new("/tmp/w")),
            Checkpoint::env_sync_yolo(Path::new("/tmp/w")),
            Checkpoint::error("boom"),
        ];
        for checkpoint in informational {
            assert!(!checkpoint.requires_decision(), "{}", checkpoint.kind());
        }
    }

    #[test]
    fn option_description_is_omitted_when_absent() {
        let option = CheckpointOption::new("Use existing branch", "use_existing");
        let json = serde_json::to_string(&option).expect("serialize");
        assert!(!json.contains("description"));
    }
}
