//! Agent abstraction for implementation runs.
//!
//! The [`Agent`] trait decouples the pipeline from the actual code-writing
//! backend (currently `codex exec`). The backend is opaque: it receives a
//! briefing, mutates the workspace, and leaves a JSON report behind. Tests
//! use scripted agents that write predetermined reports without spawning
//! processes.

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::types::AgentReport;
use crate::io::process::{CapturedOutput, run_with_timeout};

/// Parameters for one agent invocation.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// Workspace the agent works in.
    pub workdir: PathBuf,
    /// Briefing text fed to the agent.
    pub briefing: String,
    /// Path where the agent must leave its JSON report.
    pub report_path: PathBuf,
    /// Path to write the agent stdout/stderr log.
    pub log_path: PathBuf,
    /// Maximum time to wait for the agent to complete.
    pub timeout: Duration,
    /// Truncate agent output logs beyond this many bytes.
    pub output_limit_bytes: usize,
}

/// Abstraction over code-writing backends.
pub trait Agent {
    /// Run the agent. Must leave a report at `request.report_path`.
    fn implement(&self, request: &AgentRequest) -> Result<()>;
}

/// Agent that spawns `codex exec`.
pub struct CodexAgent;

impl Agent for CodexAgent {
    #[instrument(skip_all, fields(timeout_secs = request.timeout.as_secs()))]
    fn implement(&self, request: &AgentRequest) -> Result<()> {
        info!(workdir = %request.workdir.display(), "starting codex exec");

        if let Some(parent) = request.report_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create report dir {}", parent.display()))?;
        }
        let mut cmd = Command::new("codex");
        cmd.arg("exec")
            .arg("-c")
            .arg("model_reasoning_effort=medium")
            .arg("--sandbox")
            .arg("danger-full-access")
            // Scripted test workspaces are not always git checkouts.
            .arg("--skip-git-repo-check")
            .arg("--output-last-message")
            .arg(&request.report_path)
            .arg("-")
            .current_dir(&request.workdir);

        let output = run_with_timeout(
            cmd,
            Some(request.briefing.as_bytes()),
            request.timeout,
            request.output_limit_bytes,
        )
        .context("run codex exec")?;

        write_agent_log(&request.log_path, &output, request.output_limit_bytes)?;

        if output.timed_out {
            warn!(
                timeout_secs = request.timeout.as_secs(),
                "codex exec timed out"
            );
            return Err(anyhow!("codex exec timed out after {:?}", request.timeout));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "codex exec failed");
            return Err(anyhow!(
                "codex exec failed with status {:?}",
                output.status.code()
            ));
        }

        debug!("codex exec completed successfully");
        Ok(())
    }
}

/// Run the agent and load the report it left behind.
#[instrument(skip_all, fields(report_path = %request.report_path.display()))]
pub fn implement_and_report<A: Agent>(agent: &A, request: &AgentRequest) -> Result<AgentReport> {
    agent.implement(request)?;
    if !request.report_path.exists() {
        return Err(anyhow!(
            "missing agent report {}",
            request.report_path.display()
        ));
    }
    let contents = fs::read_to_string(&request.report_path)
        .with_context(|| format!("read agent report {}", request.report_path.display()))?;
    let report: AgentReport = serde_json::from_str(&contents)
        .with_context(|| format!("parse {}", request.report_path.display()))?;
    debug!(tests_passed = report.tests_passed, "parsed agent report");
    Ok(report)
}

fn write_agent_log(
    path: &std::path::Path,
    output: &CapturedOutput,
    output_limit: usize,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create agent log dir {}", parent.display()))?;
    }
    let mut buf = String::new();
    buf.push_str("=== stdout ===\n");
    buf.push_str(&String::from_utf8_lossy(&output.stdout));
    buf.push_str(&output.stdout_truncated_notice("agent"));
    buf.push_str("\n=== stderr ===\n");
    buf.push_str(&String::from_utf8_lossy(&output.stderr));
    buf.push_str(&output.stderr_truncated_notice("agent"));
    if output.timed_out {
        buf.push_str("\n[agent timed out]\n");
    }

    if buf.len() > output_limit {
        // Snap to a char boundary; lossy conversion can leave multi-byte
        // sequences anywhere in the buffer.
        let mut cut = output_limit;
        while !buf.is_char_boundary(cut) {
            cut -= 1;
        }
        let truncated = format!("{}\n[truncated {} bytes]\n", &buf[..cut], buf.len() - cut);
        fs::write(path, truncated)
            .with_context(|| format!("write agent log {}", path.display()))?;
        return Ok(());
    }

    fs::write(path, buf).with_context(|| format!("write agent log {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeAgent {
        report: Option<AgentReport>,
    }

    impl Agent for FakeAgent {
        fn implement(&self, request: &AgentRequest) -> Result<()> {
            if let Some(report) = &self.report {
                let mut buf = serde_json::to_string_pretty(report)?;
                buf.push('\n');
                fs::write(&request.report_path, buf)?;
            }
            Ok(())
        }
    }

    fn request(dir: &std::path::Path) -> AgentRequest {
        AgentRequest {
            workdir: dir.to_path_buf(),
            briefing: "briefing".to_string(),
            report_path: dir.join("report.json"),
            log_path: dir.join("agent.log"),
            timeout: Duration::from_secs(1),
            output_limit_bytes: 1000,
        }
    }

    /// Verifies implement_and_report parses the report a run leaves behind.
    #[test]
    fn implement_and_report_reads_report() {
        let temp = tempfile::tempdir().expect("tempdir");
        let fake = FakeAgent {
            report: Some(AgentReport {
                summary: "done".to_string(),
                tests_passed: true,
            }),
        };

        let report = implement_and_report(&fake, &request(temp.path())).expect("load");
        assert_eq!(report.summary, "done");
        assert!(report.tests_passed);
    }

    /// Verifies a run that leaves no report behind is an error.
    #[test]
    fn implement_and_report_errors_on_missing_report() {
        let temp = tempfile::tempdir().expect("tempdir");
        let fake = FakeAgent { report: None };

        let err = implement_and_report(&fake, &request(temp.path())).unwrap_err();
        assert!(err.to_string().contains("missing agent report"));
    }
}
