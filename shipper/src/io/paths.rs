//! Canonical paths within `.shipper/` for a checkout.
//!
//! The primary checkout keeps batch state and config here; each workspace
//! gets its own `.shipper/` for briefings, reports, and agent logs. The
//! directory ignores itself so staging everything in a workspace never
//! commits pipeline artifacts.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

const SELF_IGNORE: &str = "*\n";

/// All canonical paths within `.shipper/` for a root directory.
#[derive(Debug, Clone)]
pub struct ShipperPaths {
    pub root: PathBuf,
    pub shipper_dir: PathBuf,
    pub state_path: PathBuf,
    pub config_path: PathBuf,
    pub gitignore_path: PathBuf,
}

impl ShipperPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let shipper_dir = root.join(".shipper");
        Self {
            state_path: shipper_dir.join("state.json"),
            config_path: shipper_dir.join("config.toml"),
            gitignore_path: shipper_dir.join(".gitignore"),
            shipper_dir,
            root,
        }
    }

    pub fn briefing_path(&self, issue: u64) -> PathBuf {
        self.shipper_dir.join(format!("briefing_{issue}.md"))
    }

    pub fn agent_report_path(&self, issue: u64) -> PathBuf {
        self.shipper_dir.join(format!("report_{issue}.json"))
    }

    pub fn agent_log_path(&self, issue: u64) -> PathBuf {
        self.shipper_dir.join(format!("agent_{issue}.log"))
    }

    /// Create `.shipper/` and make it ignore itself.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.shipper_dir)
            .with_context(|| format!("create directory {}", self.shipper_dir.display()))?;
        if !self.gitignore_path.exists() {
            fs::write(&self.gitignore_path, SELF_IGNORE)
                .with_context(|| format!("write {}", self.gitignore_path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_dir_creates_self_ignoring_layout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = ShipperPaths::new(temp.path());

        paths.ensure_dir().expect("ensure");

        assert!(paths.shipper_dir.is_dir());
        let gitignore = fs::read_to_string(&paths.gitignore_path).expect("read");
        assert_eq!(gitignore, SELF_IGNORE);
    }

    #[test]
    fn per_issue_paths_are_marked_with_the_issue_number() {
        let paths = ShipperPaths::new("/workspace");
        assert_eq!(
            paths.briefing_path(42),
            PathBuf::from("/workspace/.shipper/briefing_42.md")
        );
        assert_eq!(
            paths.agent_report_path(42),
            PathBuf::from("/workspace/.shipper/report_42.json")
        );
        assert_eq!(
            paths.agent_log_path(42),
            PathBuf::from("/workspace/.shipper/agent_42.log")
        );
    }
}
