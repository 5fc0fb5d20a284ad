//! Test-only fixtures and doubles shared across the crate.
//!
//! `TestRepo` stands up a real throwaway git repository. The scripted
//! doubles stand in for the process, tracker, and agent seams, replaying
//! queued outcomes and recording the calls they receive.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use anyhow::{Result, anyhow, bail};
use tempfile::TempDir;

use crate::core::types::AgentReport;
use crate::io::agent::{Agent, AgentRequest};
use crate::io::git::Git;
use crate::io::process::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
use crate::io::tracker::{IssueDetails, IssueTracker};

/// A real git repository in a temp directory.
///
/// The repository directory is named `repo`, so suggested worktrees land
/// under `<parent>/repo-worktrees/`. Starts on `main` with one commit.
pub struct TestRepo {
    temp: TempDir,
    repo_path: PathBuf,
}

impl TestRepo {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let repo_path = temp.path().join("repo");
        fs::create_dir(&repo_path).expect("create repo dir");
        run_git(&repo_path, &["init"]);
        run_git(&repo_path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        run_git(&repo_path, &["config", "user.name", "Test"]);
        run_git(&repo_path, &["config", "user.email", "test@example.com"]);
        run_git(&repo_path, &["config", "commit.gpgsign", "false"]);
        fs::write(repo_path.join("README.md"), "test repo\n").expect("write readme");
        run_git(&repo_path, &["add", "-A"]);
        run_git(&repo_path, &["commit", "-m", "initial commit"]);
        Self { temp, repo_path }
    }

    /// Repository root.
    pub fn path(&self) -> &Path {
        &self.repo_path
    }

    /// Directory containing the repository, where worktrees get created.
    pub fn parent(&self) -> &Path {
        self.temp.path()
    }

    /// Fresh handle on the repository.
    pub fn git(&self) -> Git<SystemRunner> {
        Git::new(&self.repo_path)
    }

    /// Create `branch` and switch to it.
    pub fn checkout_feature(&self, branch: &str) {
        run_git(&self.repo_path, &["checkout", "-b", branch]);
    }

    /// Create `branch` without switching to it.
    pub fn create_branch(&self, branch: &str) {
        run_git(&self.repo_path, &["branch", branch]);
    }

    /// Write a file relative to the repository root, creating parents.
    pub fn write_file(&self, rel: &str, contents: &str) {
        let path = self.repo_path.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write file");
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Open issue with deterministic fields.
pub fn issue(number: u64, title: &str) -> IssueDetails {
    IssueDetails {
        number,
        title: title.to_string(),
        body: String::new(),
        url: format!("https://example.com/widget/issues/{number}"),
        state: "OPEN".to_string(),
    }
}

/// Command runner that replays queued outputs and records every spec.
///
/// Each pushed entry names the program it answers; a mismatch or an
/// unscripted call panics so tests notice drifting call order.
#[derive(Default)]
pub struct ScriptedRunner {
    queue: Mutex<VecDeque<(String, CommandOutput)>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the output for the next command, which must be `program`.
    pub fn push(&self, program: &str, output: CommandOutput) {
        self.queue
            .lock()
            .expect("queue lock")
            .push_back((program.to_string(), output));
    }

    /// Every command spec run so far.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Panic if queued outputs were never consumed.
    pub fn assert_drained(&self) {
        let queue = self.queue.lock().expect("queue lock");
        assert!(queue.is_empty(), "unused scripted outputs: {}", queue.len());
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.lock().expect("calls lock").push(spec.clone());
        let (program, output) = self
            .queue
            .lock()
            .expect("queue lock")
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted command: {} {:?}", spec.program, spec.args));
        assert_eq!(
            program, spec.program,
            "scripted output was queued for a different program"
        );
        Ok(output)
    }
}

/// Issue tracker double that records comments and closes.
#[derive(Default)]
pub struct ScriptedTracker {
    issues: HashMap<u64, IssueDetails>,
    repo_url: Option<String>,
    fail_comments: bool,
    fail_close: bool,
    comments: Mutex<Vec<(u64, String)>>,
    closes: Mutex<Vec<u64>>,
}

impl ScriptedTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an issue for `fetch`.
    pub fn with_issue(mut self, details: IssueDetails) -> Self {
        self.issues.insert(details.number, details);
        self
    }

    pub fn with_repo_url(mut self, url: &str) -> Self {
        self.repo_url = Some(url.to_string());
        self
    }

    /// Make every comment call fail.
    pub fn failing_comments(mut self) -> Self {
        self.fail_comments = true;
        self
    }

    /// Make every close call fail.
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Comments posted so far, as `(issue, body)` pairs.
    pub fn comments(&self) -> Vec<(u64, String)> {
        self.comments.lock().expect("comments lock").clone()
    }

    /// Issues closed so far.
    pub fn closes(&self) -> Vec<u64> {
        self.closes.lock().expect("closes lock").clone()
    }
}

impl IssueTracker for ScriptedTracker {
    fn fetch(&self, number: u64) -> Result<IssueDetails> {
        self.issues
            .get(&number)
            .cloned()
            .ok_or_else(|| anyhow!("no scripted issue #{number}"))
    }

    fn comment(&self, number: u64, body: &str) -> Result<()> {
        if self.fail_comments {
            bail!("comment rejected");
        }
        self.comments
            .lock()
            .expect("comments lock")
            .push((number, body.to_string()));
        Ok(())
    }

    fn close(&self, number: u64) -> Result<()> {
        if self.fail_close {
            bail!("close rejected");
        }
        self.closes.lock().expect("closes lock").push(number);
        Ok(())
    }

    fn repo_url(&self) -> Result<Option<String>> {
        Ok(self.repo_url.clone())
    }
}

/// One scripted agent invocation: files to drop in the workspace and the
/// report to leave behind. `report: None` simulates a crashed run.
pub struct ScriptedRun {
    pub files: Vec<(String, String)>,
    pub report: Option<AgentReport>,
}

impl ScriptedRun {
    /// Successful run that writes `files` and reports `summary`.
    pub fn success(files: Vec<(String, String)>, summary: &str) -> Self {
        Self {
            files,
            report: Some(AgentReport {
                summary: summary.to_string(),
                tests_passed: true,
            }),
        }
    }

    /// Run that writes `files` and then dies without leaving a report.
    pub fn crash(files: Vec<(String, String)>) -> Self {
        Self {
            files,
            report: None,
        }
    }
}

/// Agent double that plays queued runs instead of spawning a process.
#[derive(Default)]
pub struct ScriptedAgent {
    runs: Mutex<VecDeque<ScriptedRun>>,
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next run.
    pub fn push(&self, run: ScriptedRun) {
        self.runs.lock().expect("runs lock").push_back(run);
    }

    /// Panic if queued runs were never consumed.
    pub fn assert_drained(&self) {
        let runs = self.runs.lock().expect("runs lock");
        assert!(runs.is_empty(), "unused scripted agent runs: {}", runs.len());
    }
}

impl Agent for ScriptedAgent {
    fn implement(&self, request: &AgentRequest) -> Result<()> {
        let run = self
            .runs
            .lock()
            .expect("runs lock")
            .pop_front()
            .ok_or_else(|| anyhow!("unscripted agent invocation"))?;
        for (rel, contents) in &run.files {
            let path = request.workdir.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, contents)?;
        }
        match run.report {
            Some(report) => {
                let mut payload = serde_json::to_string_pretty(&report)?;
                payload.push('\n');
                fs::write(&request.report_path, payload)?;
                Ok(())
            }
            None => bail!("agent process failed"),
        }
    }
}
