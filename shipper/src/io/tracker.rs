//! Issue tracker access through the `gh` command-line client.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::io::process::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};

/// Issue fields the pipeline consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDetails {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub url: String,
    /// Tracker-reported state, e.g. `OPEN` or `CLOSED`.
    pub state: String,
}

/// Capability seam over the tracker.
///
/// Fetching is required to proceed; commenting and closing are invoked
/// best-effort by shipping, so implementations should surface failures as
/// plain errors and let callers decide severity.
pub trait IssueTracker {
    fn fetch(&self, number: u64) -> Result<IssueDetails>;
    fn comment(&self, number: u64, body: &str) -> Result<()>;
    fn close(&self, number: u64) -> Result<()>;
    /// Web URL of the repository, when it can be resolved.
    fn repo_url(&self) -> Result<Option<String>>;
}

/// Tracker backed by `gh`, which resolves the repository from the working
/// directory's git remotes.
#[derive(Debug, Clone)]
pub struct GhTracker<R: CommandRunner = SystemRunner> {
    workdir: PathBuf,
    runner: R,
}

impl GhTracker<SystemRunner> {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self::with_runner(workdir, SystemRunner)
    }
}

impl<R: CommandRunner> GhTracker<R> {
    pub fn with_runner(workdir: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            workdir: workdir.into(),
            runner,
        }
    }

    fn run_checked(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = self.run(args)?;
        if !output.success() {
            return Err(anyhow!(
                "gh {} failed: {}",
                args.join(" "),
                output.stderr.trim()
            ));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let spec = CommandSpec::new("gh", args.iter().copied()).cwd(&self.workdir);
        self.runner.run(&spec)
    }
}

impl<R: CommandRunner> IssueTracker for GhTracker<R> {
    #[instrument(skip_all, fields(issue = number))]
    fn fetch(&self, number: u64) -> Result<IssueDetails> {
        let out = self.run_checked(&[
            "issue",
            "view",
            &number.to_string(),
            "--json",
            "number,title,body,url,state",
        ])?;
        let details: IssueDetails = serde_json::from_str(&out.stdout)
            .with_context(|| format!("parse issue #{number} json"))?;
        debug!(title = %details.title, state = %details.state, "fetched issue");
        Ok(details)
    }

    fn comment(&self, number: u64, body: &str) -> Result<()> {
        self.run_checked(&["issue", "comment", &number.to_string(), "--body", body])?;
        Ok(())
    }

    fn close(&self, number: u64) -> Result<()> {
        self.run_checked(&["issue", "close", &number.to_string(), "--reason", "completed"])?;
        Ok(())
    }

    fn repo_url(&self) -> Result<Option<String>> {
        let out = self.run(&["repo", "view", "--json", "url", "--jq", ".url"])?;
        if !out.success() {
            debug!("could not resolve repository url");
            return Ok(None);
        }
        let url = out.stdout.trim().to_string();
        Ok((!url.is_empty()).then_some(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedRunner;

    #[test]
    fn fetch_parses_issue_json() {
        let runner = ScriptedRunner::new();
        runner.push(
            "gh",
            CommandOutput::ok(
                r#"{"number": 7, "title": "Fix parser", "body": "", "url": "https://example.com/widget/issues/7", "state": "OPEN"}"#,
            ),
        );
        let tracker = GhTracker::with_runner("/repo", runner);
        let details = tracker.fetch(7).expect("fetch");
        assert_eq!(details.number, 7);
        assert_eq!(details.title, "Fix parser");
        assert_eq!(details.state, "OPEN");
    }

    #[test]
    fn fetch_failure_carries_stderr() {
        let runner = ScriptedRunner::new();
        runner.push("gh", CommandOutput::failure(1, "could not find issue"));
        let tracker = GhTracker::with_runner("/repo", runner);
        let err = tracker.fetch(999).expect_err("should fail");
        assert!(err.to_string().contains("could not find issue"));
    }

    #[test]
    fn repo_url_failure_is_not_an_error() {
        let runner = ScriptedRunner::new();
        runner.push("gh", CommandOutput::failure(1, "no default remote"));
        let tracker = GhTracker::with_runner("/repo", runner);
        assert_eq!(tracker.repo_url().expect("call"), None);
    }

    #[test]
    fn close_passes_completed_reason() {
        let runner = ScriptedRunner::new();
        runner.push("gh", CommandOutput::ok(""));
        let tracker = GhTracker::with_runner("/repo", runner);
        tracker.close(7).expect("close");
        let calls = runner_calls(&tracker);
        assert_eq!(
            calls[0].args,
            vec!["issue", "close", "7", "--reason", "completed"]
        );
    }

    fn runner_calls(tracker: &GhTracker<ScriptedRunner>) -> Vec<CommandSpec> {
        tracker.runner.calls()
    }
}
