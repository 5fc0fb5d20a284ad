//! CLI entry point for the issue-to-implementation pipeline.
//!
//! `run` and `resume` drive whole batches end to end. `setup`, `ship`, and
//! `sync` are single-phase commands that print their result as JSON on
//! stdout, so an outer orchestrator can chain them and answer checkpoints
//! across invocations.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use shipper::batch::{self, BatchContext};
use shipper::core::directive::{extract_directive, parse_directive_arg};
use shipper::core::types::{ApprovalMode, WorkspaceMode, WorkspaceRequest};
use shipper::io::agent::CodexAgent;
use shipper::io::config::{ShipperConfig, load_config};
use shipper::io::env_sync::sync_environment;
use shipper::io::git::Git;
use shipper::io::paths::ShipperPaths;
use shipper::io::process::SystemRunner;
use shipper::io::tracker::{GhTracker, IssueTracker};
use shipper::provision::{WorkspaceChoice, provision_workspace};
use shipper::ship::{CleanupChoice, ShipRequest, ship};
use shipper::{exit_codes, logging, preflight};

#[derive(Parser)]
#[command(
    name = "shipper",
    version,
    about = "Issue-to-implementation pipeline for tracked work items"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process an issue or an inclusive range end to end.
    Run {
        /// Issue selector: a number (`42`, `#42`) or a range (`10-12`).
        issues: String,
        /// Process issues the tracker reports as closed.
        #[arg(long)]
        include_closed: bool,
    },
    /// Resume an interrupted batch from its saved cursor.
    Resume {
        /// Process issues the tracker reports as closed.
        #[arg(long)]
        include_closed: bool,
    },
    /// Delete any saved batch state.
    Clear,
    /// Provision a workspace for one issue and print the decision as JSON.
    Setup {
        /// Issue number.
        #[arg(long)]
        issue: u64,
        /// Issue title, used to derive the workspace name. Fetched from the
        /// tracker when omitted.
        #[arg(long)]
        title: Option<String>,
        /// Issue body, scanned for an embedded workspace directive.
        #[arg(long)]
        body: Option<String>,
        /// Explicit workspace directive `path:branch`.
        #[arg(long, conflicts_with = "choose")]
        workspace: Option<String>,
        /// Provision autonomously instead of pausing for decisions.
        #[arg(long)]
        yolo: bool,
        /// Answer to an earlier workspace-choice checkpoint.
        #[arg(long, value_enum)]
        choose: Option<ChooseArg>,
    },
    /// Ship a finished implementation and print the outcome as JSON.
    Ship {
        /// Workspace directory holding the implementation.
        #[arg(long)]
        workspace: PathBuf,
        /// How the workspace was provisioned.
        #[arg(long, value_enum)]
        mode: ModeArg,
        /// Branch the implementation lives on.
        #[arg(long)]
        branch: String,
        /// Issue number.
        #[arg(long)]
        issue: u64,
        /// Issue title, used for the commit message.
        #[arg(long)]
        title: String,
        /// Agent's implementation summary.
        #[arg(long)]
        summary: String,
        /// Whether the agent reported its tests passing.
        #[arg(long, action = ArgAction::Set)]
        tests_passed: bool,
        /// Ship autonomously instead of pausing for review.
        #[arg(long)]
        yolo: bool,
        /// Commit without pausing: a review checkpoint was already answered.
        #[arg(long)]
        approved: bool,
        /// Answer to a worktree-cleanup checkpoint: remove the worktree.
        #[arg(long, conflicts_with = "keep_worktree")]
        remove_worktree: bool,
        /// Answer to a worktree-cleanup checkpoint: keep the worktree.
        #[arg(long)]
        keep_worktree: bool,
    },
    /// Copy environment files from the primary checkout into a workspace.
    Sync {
        /// Workspace directory to sync into.
        workspace: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ChooseArg {
    Worktree,
    InPlace,
}

impl From<ChooseArg> for WorkspaceChoice {
    fn from(arg: ChooseArg) -> Self {
        match arg {
            ChooseArg::Worktree => WorkspaceChoice::Worktree,
            ChooseArg::InPlace => WorkspaceChoice::InPlace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Worktree,
    InPlace,
}

impl From<ModeArg> for WorkspaceMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Worktree => WorkspaceMode::Worktree,
            ModeArg::InPlace => WorkspaceMode::InPlace,
        }
    }
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            issues,
            include_closed,
        } => cmd_run(&issues, include_closed),
        Command::Resume { include_closed } => cmd_resume(include_closed),
        Command::Clear => cmd_clear(),
        Command::Setup {
            issue,
            title,
            body,
            workspace,
            yolo,
            choose,
        } => cmd_setup(issue, title, body, workspace, yolo, choose),
        Command::Ship {
            workspace,
            mode,
            branch,
            issue,
            title,
            summary,
            tests_passed,
            yolo,
            approved,
            remove_worktree,
            keep_worktree,
        } => {
            let cleanup = if remove_worktree {
                Some(CleanupChoice::Remove)
            } else if keep_worktree {
                Some(CleanupChoice::Keep)
            } else {
                None
            };
            let request = ShipRequest {
                repo_root: Git::new(".").repo_root()?,
                workspace_path: workspace,
                workspace_mode: mode.into(),
                workspace_branch: branch,
                issue_number: issue,
                issue_title: title,
                summary,
                tests_passed,
                approval: approval_mode(yolo),
                review_approved: approved,
                cleanup,
            };
            cmd_ship(request)
        }
        Command::Sync { workspace } => cmd_sync(&workspace),
    }
}

fn cmd_run(selector: &str, include_closed: bool) -> Result<i32> {
    let (start, end) = batch::parse_issue_selector(selector)?;
    preflight::check_environment(&SystemRunner, Path::new("."))?;
    let repo_root = Git::new(".").repo_root()?;
    let config = load_repo_config(&repo_root)?;
    let tracker = GhTracker::new(&repo_root);
    let ctx = BatchContext {
        repo_root,
        tracker: &tracker,
        agent: &CodexAgent,
        config,
        include_closed,
    };
    let original_args: Vec<String> = std::env::args().skip(1).collect();
    batch::run_batch(&ctx, &original_args, start, end)?;
    Ok(exit_codes::OK)
}

fn cmd_resume(include_closed: bool) -> Result<i32> {
    let repo_root = Git::new(".").repo_root()?;
    // Fail on a missing or finished record before probing the environment.
    batch::batch_store(&repo_root).load_for_resume()?;
    preflight::check_environment(&SystemRunner, &repo_root)?;
    let config = load_repo_config(&repo_root)?;
    let tracker = GhTracker::new(&repo_root);
    let ctx = BatchContext {
        repo_root,
        tracker: &tracker,
        agent: &CodexAgent,
        config,
        include_closed,
    };
    batch::resume_batch(&ctx)?;
    Ok(exit_codes::OK)
}

fn cmd_clear() -> Result<i32> {
    let repo_root = Git::new(".").repo_root()?;
    batch::batch_store(&repo_root).clear()?;
    Ok(exit_codes::OK)
}

fn cmd_setup(
    issue: u64,
    title: Option<String>,
    body: Option<String>,
    workspace: Option<String>,
    yolo: bool,
    choose: Option<ChooseArg>,
) -> Result<i32> {
    let repo_root = Git::new(".").repo_root()?;
    let git = Git::new(&repo_root);
    let config = load_repo_config(&repo_root)?;
    let (title, body) = match title {
        Some(title) => (title, body.unwrap_or_default()),
        None => {
            let details = GhTracker::new(&repo_root).fetch(issue)?;
            (details.title, body.unwrap_or(details.body))
        }
    };
    let directive = match &workspace {
        Some(raw) => Some(parse_directive_arg(raw)?),
        None => extract_directive(&body),
    };
    let request = WorkspaceRequest {
        issue_number: issue,
        title,
        body,
        approval: approval_mode(yolo),
        directive,
    };
    let decision = provision_workspace(&git, &config, &request, choose.map(Into::into))?;
    print_json(&decision)?;
    Ok(if decision.is_pending() {
        exit_codes::PENDING
    } else {
        exit_codes::OK
    })
}

fn cmd_ship(request: ShipRequest) -> Result<i32> {
    let tracker = GhTracker::new(&request.workspace_path);
    let outcome = ship(&tracker, &request)?;
    print_json(&outcome)?;
    Ok(if outcome.is_pending() {
        exit_codes::PENDING
    } else {
        exit_codes::OK
    })
}

fn cmd_sync(workspace: &Path) -> Result<i32> {
    let repo_root = Git::new(".").repo_root()?;
    let config = load_repo_config(&repo_root)?;
    let report = sync_environment(&SystemRunner, &repo_root, workspace, &config.env_sync)?;
    print_json(&report)?;
    Ok(exit_codes::OK)
}

fn load_repo_config(repo_root: &Path) -> Result<ShipperConfig> {
    load_config(&ShipperPaths::new(repo_root).config_path)
}

fn approval_mode(yolo: bool) -> ApprovalMode {
    if yolo {
        ApprovalMode::Yolo
    } else {
        ApprovalMode::Normal
    }
}

/// Print `value` to stdout as pretty JSON with a trailing newline.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
