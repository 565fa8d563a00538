//! Run report and failure attachments.
//!
//! Each finished test appends one JSON object to
//! `<report_dir>/results.jsonl`. Failure screenshots are written as
//! `<screenshot_dir>/<test name>.png` and referenced from the entry.

use crate::config::Config;
use crate::fixture::TestTag;
use crate::result::E2eResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// File name of the JSON-lines report
pub const REPORT_FILE: &str = "results.jsonl";

/// Test result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Test passed
    Passed,
    /// Test failed
    Failed,
    /// Test was not selected for this run
    Skipped,
}

impl TestStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Check if status is failing
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Individual test result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultEntry {
    /// Test name
    pub name: String,
    /// Test tag
    pub tag: TestTag,
    /// Test status
    pub status: TestStatus,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
    /// Error message if failed
    pub error: Option<String>,
    /// When the test finished
    pub timestamp: DateTime<Utc>,
    /// Files attached to the result (screenshots)
    #[serde(default)]
    pub attachments: Vec<PathBuf>,
}

impl TestResultEntry {
    fn new(name: impl Into<String>, tag: TestTag, status: TestStatus, duration: Duration) -> Self {
        Self {
            name: name.into(),
            tag,
            status,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            error: None,
            timestamp: Utc::now(),
            attachments: Vec::new(),
        }
    }

    /// Create a passing test result
    #[must_use]
    pub fn passed(name: impl Into<String>, tag: TestTag, duration: Duration) -> Self {
        Self::new(name, tag, TestStatus::Passed, duration)
    }

    /// Create a failing test result
    #[must_use]
    pub fn failed(
        name: impl Into<String>,
        tag: TestTag,
        duration: Duration,
        error: impl Into<String>,
    ) -> Self {
        let mut entry = Self::new(name, tag, TestStatus::Failed, duration);
        entry.error = Some(error.into());
        entry
    }

    /// Create a skipped test result
    #[must_use]
    pub fn skipped(name: impl Into<String>, tag: TestTag) -> Self {
        Self::new(name, tag, TestStatus::Skipped, Duration::ZERO)
    }

    /// Attach a file to the result
    #[must_use]
    pub fn with_attachment(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(path.into());
        self
    }
}

/// Pass/fail/skip counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Passed tests
    pub passed: usize,
    /// Failed tests
    pub failed: usize,
    /// Skipped tests
    pub skipped: usize,
}

/// Collects results and writes report artifacts
#[derive(Debug)]
pub struct Reporter {
    screenshot_dir: PathBuf,
    report_dir: PathBuf,
    entries: Mutex<Vec<TestResultEntry>>,
}

impl Reporter {
    /// Reporter writing into the given directories
    pub fn new(screenshot_dir: impl Into<PathBuf>, report_dir: impl Into<PathBuf>) -> Self {
        Self {
            screenshot_dir: screenshot_dir.into(),
            report_dir: report_dir.into(),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Reporter using the configured directories
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.screenshot_dir.clone(), config.report_dir.clone())
    }

    /// Path of the JSON-lines report
    #[must_use]
    pub fn report_path(&self) -> PathBuf {
        self.report_dir.join(REPORT_FILE)
    }

    /// Path a failure screenshot for `test_name` is written to
    #[must_use]
    pub fn screenshot_path(&self, test_name: &str) -> PathBuf {
        self.screenshot_dir
            .join(format!("{}.png", sanitize_test_name(test_name)))
    }

    /// Write a PNG for `test_name`, replacing any earlier one
    pub async fn attach_screenshot(&self, test_name: &str, png: &[u8]) -> E2eResult<PathBuf> {
        let path = self.screenshot_path(test_name);
        ensure_dir(&self.screenshot_dir).await?;
        tokio::fs::write(&path, png).await?;
        debug!(path = %path.display(), bytes = png.len(), "screenshot attached");
        Ok(path)
    }

    /// Append `entry` to the report
    pub async fn record(&self, entry: TestResultEntry) -> E2eResult<()> {
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        ensure_dir(&self.report_dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.report_path())
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        self.lock_entries().push(entry);
        Ok(())
    }

    /// Entries recorded by this reporter
    #[must_use]
    pub fn entries(&self) -> Vec<TestResultEntry> {
        self.lock_entries().clone()
    }

    /// Counts by status
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        self.lock_entries()
            .iter()
            .fold(RunSummary::default(), |mut summary, entry| {
                match entry.status {
                    TestStatus::Passed => summary.passed += 1,
                    TestStatus::Failed => summary.failed += 1,
                    TestStatus::Skipped => summary.skipped += 1,
                }
                summary
            })
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, Vec<TestResultEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

async fn ensure_dir(dir: &Path) -> E2eResult<()> {
    if !dir.as_os_str().is_empty() {
        tokio::fs::create_dir_all(dir).await?;
    }
    Ok(())
}

/// File-system safe form of a test name
#[must_use]
pub fn sanitize_test_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "test".to_string()
    } else {
        cleaned.to_string()
    }
}
