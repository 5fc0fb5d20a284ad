//! Explicit workspace directives from issue bodies or the command line.
//!
//! An issue body can pin its workspace with a fixed block:
//!
//! ```markdown
//! ## Git Workspace
//! - Worktree: ../widget-worktrees/42
//! - Branch: `feat/issue-42-retry`
//! ```
//!
//! Body parsing is tolerant: a body without the block simply carries no
//! directive. A `path:branch` pair passed explicitly on the CLI is strict;
//! the caller named a workspace, so a malformed pair is an error rather than
//! a silent fall-through to suggestions.

use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::{Result, bail};
use regex::Regex;

use crate::core::types::WorkspaceDirective;

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"## Git Workspace\s*\n\s*-\s*Worktree:\s*([^\n]+)\s*\n\s*-\s*Branch:\s*`([^`]+)`")
        .expect("directive regex should be valid")
});

/// Extract an embedded workspace directive from an issue body.
pub fn extract_directive(body: &str) -> Option<WorkspaceDirective> {
    let caps = DIRECTIVE_RE.captures(body)?;
    Some(WorkspaceDirective {
        path: PathBuf::from(caps[1].trim()),
        branch: caps[2].trim().to_string(),
    })
}

/// Parse an explicit `path:branch` pair from the command line.
pub fn parse_directive_arg(arg: &str) -> Result<WorkspaceDirective> {
    match arg.split_once(':') {
        Some((path, branch)) if !path.trim().is_empty() && !branch.trim().is_empty() => {
            Ok(WorkspaceDirective {
                path: PathBuf::from(path.trim()),
                branch: branch.trim().to_string(),
            })
        }
        _ => bail!("invalid workspace directive '{arg}' (expected path:branch)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_directive_block() {
        let body = "Some intro.\n\n## Git Workspace\n- Worktree: ../widget-worktrees/42\n- Branch: `feat/issue-42-retry`\n\nMore text.";
        let directive = extract_directive(body).expect("directive");
        assert_eq!(directive.path, PathBuf::from("../widget-worktrees/42"));
        assert_eq!(directive.branch, "feat/issue-42-retry");
    }

    #[test]
    fn tolerates_extra_whitespace() {
        let body = "## Git Workspace\n  -  Worktree:   ../w/7  \n  -  Branch:   `feat/x`";
        let directive = extract_directive(body).expect("directive");
        assert_eq!(directive.path, PathBuf::from("../w/7"));
        assert_eq!(directive.branch, "feat/x");
    }

    #[test]
    fn absent_block_is_not_an_error() {
        assert_eq!(extract_directive("Just a regular issue body."), None);
        assert_eq!(extract_directive(""), None);
    }

    #[test]
    fn unquoted_branch_does_not_match() {
        let body = "## Git Workspace\n- Worktree: ../w/7\n- Branch: feat/x";
        assert_eq!(extract_directive(body), None);
    }

    #[test]
    fn parses_cli_pair() {
        let directive = parse_directive_arg("../w/9:feat/issue-9-thing").expect("parse");
        assert_eq!(directive.path, PathBuf::from("../w/9"));
        assert_eq!(directive.branch, "feat/issue-9-thing");
    }

    #[test]
    fn rejects_malformed_cli_pair() {
        assert!(parse_directive_arg("no-colon-here").is_err());
        assert!(parse_directive_arg(":feat/x").is_err());
        assert!(parse_directive_arg("../w/9:").is_err());
    }
}
