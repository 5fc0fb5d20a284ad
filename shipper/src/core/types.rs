//! Shared data model for provisioning and shipping decisions.
//!
//! These types are the stable contract between the pure planning logic, the
//! orchestrators, and the JSON the CLI prints. They carry no behavior beyond
//! small accessors and must remain deterministic across runs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::checkpoint::Checkpoint;

/// Approval regime for decision gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalMode {
    /// Fully autonomous: default choices are taken without stopping.
    Yolo,
    /// Human-gated: blocking checkpoints pause the pipeline for a decision.
    Normal,
}

impl ApprovalMode {
    pub fn is_yolo(self) -> bool {
        self == ApprovalMode::Yolo
    }
}

/// Where implementation work happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkspaceMode {
    /// A linked worktree in a sibling directory.
    Worktree,
    /// The current checkout, on a dedicated branch.
    InPlace,
}

/// Action tag describing how a provisioning call concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionAction {
    /// An existing worktree was treated as authoritative; no mutation.
    Reused,
    /// A worktree or branch was created.
    Created,
    /// Already inside a feature workspace; no setup necessary.
    Skipped,
    /// A branch-name collision needs an external decision.
    Conflict,
    /// Creation failed; nothing usable exists.
    Error,
    /// Waiting on a workspace choice; no mutation yet.
    Pending,
}

/// An explicit workspace directive: a worktree path paired with a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceDirective {
    pub path: PathBuf,
    pub branch: String,
}

/// Immutable input to one provisioning decision.
#[derive(Debug, Clone)]
pub struct WorkspaceRequest {
    pub issue_number: u64,
    pub title: String,
    pub body: String,
    pub approval: ApprovalMode,
    /// Explicit directive from the CLI or the issue body, if any.
    pub directive: Option<WorkspaceDirective>,
}

/// Output of one provisioning decision.
///
/// Either the decision is final (path, branch and mode are resolved) or it
/// carries a checkpoint that requires a decision, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceDecision {
    pub workspace_path: Option<PathBuf>,
    pub workspace_branch: Option<String>,
    pub workspace_mode: Option<WorkspaceMode>,
    pub action_taken: ProvisionAction,
    pub checkpoint: Option<Checkpoint>,
}

impl WorkspaceDecision {
    /// True when the caller must supply a choice before work can proceed.
    pub fn is_pending(&self) -> bool {
        self.checkpoint
            .as_ref()
            .is_some_and(Checkpoint::requires_decision)
    }
}

/// Worktree disposition after shipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorktreeDisposition {
    Kept,
    Removed,
    Pending,
}

/// Result of the shipping phase for one issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingOutcome {
    /// Short hash of the created commit, absent when nothing was committed.
    pub commit_hash: Option<String>,
    pub files_changed: usize,
    pub issue_closed: bool,
    /// Reasons closure was withheld, in evaluation order.
    pub closure_blockers: Vec<String>,
    pub worktree_disposition: WorktreeDisposition,
    /// Best-effort reference to the posted comment.
    pub comment_url: Option<String>,
    pub checkpoint: Option<Checkpoint>,
}

impl ShippingOutcome {
    pub fn is_pending(&self) -> bool {
        self.checkpoint
            .as_ref()
            .is_some_and(Checkpoint::requires_decision)
    }
}

/// Structured report produced by an agent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReport {
    /// Free-text implementation summary, consumed by closure analysis.
    pub summary: String,
    /// Whether the agent observed the test suite passing.
    #[serde(default)]
    pub tests_passed: bool,
}
