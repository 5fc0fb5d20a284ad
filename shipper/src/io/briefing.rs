//! Rendering of agent briefings and tracker comments.
//!
//! Both documents are templated so their shape stays reviewable in one
//! place. The briefing is written into the workspace for traceability; the
//! comment is posted on the issue after shipping.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::io::tracker::IssueDetails;

const BRIEFING_TEMPLATE: &str = include_str!("templates/briefing.md");
const COMMENT_TEMPLATE: &str = include_str!("templates/comment.md");

/// Template engine wrapper around minijinja.
struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("briefing", BRIEFING_TEMPLATE)
            .expect("briefing template should be valid");
        env.add_template("comment", COMMENT_TEMPLATE)
            .expect("comment template should be valid");
        Self { env }
    }
}

/// Render the implementation briefing fed to the agent.
pub fn render_briefing(details: &IssueDetails, workspace: &Path, branch: &str) -> Result<String> {
    let engine = TemplateEngine::new();
    let template = engine.env.get_template("briefing")?;
    let rendered = template.render(context! {
        number => details.number,
        title => details.title.trim(),
        url => details.url,
        body => (!details.body.trim().is_empty()).then(|| details.body.trim()),
        workspace => workspace.display().to_string(),
        branch => branch,
    })?;
    Ok(rendered)
}

/// Render the briefing and write it to `path`, returning the text.
pub fn write_briefing(
    path: &Path,
    details: &IssueDetails,
    workspace: &Path,
    branch: &str,
) -> Result<String> {
    let briefing = render_briefing(details, workspace, branch)?;
    fs::write(path, &briefing).with_context(|| format!("write briefing {}", path.display()))?;
    Ok(briefing)
}

/// Render the implementation-summary comment posted on the issue.
pub fn render_comment(summary: &str, branch: &str, yolo: bool) -> Result<String> {
    let engine = TemplateEngine::new();
    let template = engine.env.get_template("comment")?;
    let mode = if yolo { "YOLO mode" } else { "Normal mode" };
    let rendered = template.render(context! {
        summary => summary.trim(),
        branch => branch,
        mode => mode,
    })?;
    Ok(rendered)
}
