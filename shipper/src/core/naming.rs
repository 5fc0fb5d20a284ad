//! Deterministic branch and worktree naming.
//!
//! The same (issue, title) pair must always suggest the same path and branch
//! so a resumed run converges on the workspace it already created instead of
//! provisioning a duplicate.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

const SLUG_MAX_LEN: usize = 50;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug regex should be valid"));

/// Suggested workspace location for an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSuggestion {
    /// Worktree path relative to the repository root.
    pub path: PathBuf,
    pub branch: String,
}

/// Derive the suggested worktree path and branch for an issue.
///
/// Branch: `feat/issue-<id>-<slug>` (no slug segment when the title
/// normalizes to nothing). Path: `../<repo>-worktrees/<id>`.
pub fn suggest_workspace(repo_name: &str, issue_number: u64, title: &str) -> WorkspaceSuggestion {
    let slug = slugify(title);
    let branch = if slug.is_empty() {
        format!("feat/issue-{issue_number}")
    } else {
        format!("feat/issue-{issue_number}-{slug}")
    };
    WorkspaceSuggestion {
        path: PathBuf::from(format!("../{repo_name}-worktrees/{issue_number}")),
        branch,
    }
}

/// Normalize a title into a branch-safe slug.
///
/// Lower-cases, collapses every run of non-alphanumerics into a single
/// hyphen, trims leading/trailing hyphens, and truncates to 50 characters
/// without leaving a trailing hyphen behind.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let collapsed = NON_ALNUM.replace_all(&lowered, "-");
    let mut slug: String = collapsed.trim_matches('-').chars().take(SLUG_MAX_LEN).collect();
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// True iff `name` is one of the reserved trunk branches.
pub fn is_protected(name: &str, protected: &[String]) -> bool {
    protected.iter().any(|p| p == name)
}
