//! Batch progress storage for resumable issue ranges.
//!
//! The record is the only thing the pipeline persists between issues.
//! Workspace decisions are always re-derived from live repository state, so
//! the store stays narrow: init, advance the cursor, record success, mark
//! complete, clear.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Lifecycle of a recorded batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    InProgress,
    Completed,
}

/// Persisted progress of one batch (`.shipper/state.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchRecord {
    /// Arguments the batch was started with, echoed for traceability.
    pub original_args: Vec<String>,
    pub start_issue: u64,
    pub end_issue: u64,
    /// Issue being processed, and the one a resume starts from.
    pub current_issue: u64,
    /// Last issue that fully shipped, if any.
    pub last_success: Option<u64>,
    /// UTC start time, `%Y-%m-%dT%H:%M:%SZ`.
    pub started_at: String,
    pub status: BatchStatus,
}

/// Store for the batch record at a fixed path.
#[derive(Debug, Clone)]
pub struct BatchStore {
    path: PathBuf,
}

impl BatchStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start a new record, replacing any previous one.
    pub fn init(
        &self,
        original_args: &[String],
        start_issue: u64,
        end_issue: u64,
    ) -> Result<BatchRecord> {
        let record = BatchRecord {
            original_args: original_args.to_vec(),
            start_issue,
            end_issue,
            current_issue: start_issue,
            last_success: None,
            started_at: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            status: BatchStatus::InProgress,
        };
        self.write(&record)?;
        Ok(record)
    }

    /// Move the cursor to `issue`. A missing record is a no-op.
    pub fn advance_cursor(&self, issue: u64) -> Result<()> {
        self.update(|record| record.current_issue = issue)
    }

    /// Record `issue` as fully shipped. A missing record is a no-op.
    pub fn record_success(&self, issue: u64) -> Result<()> {
        self.update(|record| record.last_success = Some(issue))
    }

    /// Mark the batch finished. A missing record is a no-op.
    pub fn complete(&self) -> Result<()> {
        self.update(|record| record.status = BatchStatus::Completed)
    }

    /// Load the record a resume continues from.
    ///
    /// Missing and completed records both refuse: there is nothing to
    /// resume, and silently restarting would reprocess shipped issues.
    pub fn load_for_resume(&self) -> Result<BatchRecord> {
        if !self.path.exists() {
            bail!("no batch state found (nothing to resume)");
        }
        let record = self.load()?;
        if record.status == BatchStatus::Completed {
            bail!("previous batch already completed (nothing to resume)");
        }
        Ok(record)
    }

    /// Delete the record if present.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("remove batch state {}", self.path.display()))?;
            debug!(path = %self.path.display(), "batch state cleared");
        }
        Ok(())
    }

    fn update(&self, mutate: impl FnOnce(&mut BatchRecord)) -> Result<()> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no batch state to update");
            return Ok(());
        }
        let mut record = self.load()?;
        mutate(&mut record);
        self.write(&record)
    }

    fn load(&self) -> Result<BatchRecord> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("read batch state {}", self.path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parse batch state {}", self.path.display()))
    }

    fn write(&self, record: &BatchRecord) -> Result<()> {
        debug!(path = %self.path.display(), current_issue = record.current_issue, "writing batch state");
        let mut buf = serde_json::to_string_pretty(record)?;
        buf.push('\n');
        write_atomic(&self.path, &buf)
    }
}

/// Atomically write the record to disk (temp file + rename).
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("batch state path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp batch state {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("replace batch state {}", path.display()))?;
    Ok(())
}
