//! Pipeline configuration stored under `.shipper/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Pipeline configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShipperConfig {
    /// Branches never treated as feature workspaces.
    pub protected_branches: Vec<String>,

    pub agent: AgentConfig,

    pub env_sync: EnvSyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum wall-clock time for one implementation run, in seconds.
    pub timeout_secs: u64,

    /// Truncate agent stdout/stderr logs beyond this many bytes.
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EnvSyncConfig {
    /// Environment files copied from the primary checkout into new
    /// worktrees when present.
    pub files: Vec<String>,

    /// Run `npm install` in workspaces that carry a `package.json`.
    pub npm_install: bool,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            protected_branches: vec!["main".to_string(), "master".to_string()],
            agent: AgentConfig::default(),
            env_sync: EnvSyncConfig::default(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60 * 60,
            output_limit_bytes: 200_000,
        }
    }
}

impl Default for EnvSyncConfig {
    fn default() -> Self {
        Self {
            files: vec![".env".to_string(), ".env.local".to_string()],
            npm_install: true,
        }
    }
}

impl ShipperConfig {
    pub fn validate(&self) -> Result<()> {
        if self.agent.timeout_secs == 0 {
            return Err(anyhow!("agent.timeout_secs must be > 0"));
        }
        if self.agent.output_limit_bytes == 0 {
            return Err(anyhow!("agent.output_limit_bytes must be > 0"));
        }
        if self
            .protected_branches
            .iter()
            .any(|branch| branch.trim().is_empty())
        {
            return Err(anyhow!("protected_branches entries must be non-empty"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ShipperConfig::default()`.
pub fn load_config(path: &Path) -> Result<ShipperConfig> {
    if !path.exists() {
        let cfg = ShipperConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ShipperConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, ShipperConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "protected_branches = [\"main\", \"develop\"]\n\n[agent]\ntimeout_secs = 120\n",
        )
        .expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(
            cfg.protected_branches,
            vec!["main".to_string(), "develop".to_string()]
        );
        assert_eq!(cfg.agent.timeout_secs, 120);
        assert_eq!(cfg.agent.output_limit_bytes, 200_000);
        assert!(cfg.env_sync.npm_install);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[agent]\ntimeout_secs = 0\n").expect("write");
        assert!(load_config(&path).is_err());
    }
}
