//! Progress log - the columned, colored lines a person watches during a run
//!
//! Each line carries a timestamp, a category, a status, a message and an
//! optional `n/max` retry counter. Lines go to stdout, are mirrored to
//! `tracing::debug!`, and can be appended to a plain-text log file. Writing the
//! log file is fail-open: a failed write only warns.

use chrono::{SecondsFormat, Utc};
use colored::{ColoredString, Colorize};
use imgdrop_core::fail_open::fail_open;
use imgdrop_core::Result;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// What part of the run a line is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Setup,
    Files,
    Upload,
    Cleanup,
    Retry,
    Summary,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Setup => "SETUP",
            Self::Files => "FILES",
            Self::Upload => "UPLOAD",
            Self::Cleanup => "CLEANUP",
            Self::Retry => "RETRY",
            Self::Summary => "SUMMARY",
        }
    }

    fn paint(&self, text: String) -> ColoredString {
        match self {
            Self::Setup => text.bright_cyan(),
            Self::Files => text.cyan(),
            Self::Upload => text.blue(),
            Self::Cleanup => text.magenta(),
            Self::Retry => text.yellow(),
            Self::Summary => text.bold(),
        }
    }
}

/// How that part went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Info,
    Wait,
    Ok,
    Warn,
    Fail,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Wait => "WAIT",
            Self::Ok => "OK",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
        }
    }

    fn paint(&self, text: String) -> ColoredString {
        match self {
            Self::Info => text.normal(),
            Self::Wait => text.bright_black(),
            Self::Ok => text.green(),
            Self::Warn => text.yellow(),
            Self::Fail => text.red().bold(),
        }
    }
}

/// One progress line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEntry {
    pub timestamp: String,
    pub category: Category,
    pub status: Status,
    pub message: String,
    /// `(attempt, max)`
    pub retry: Option<(u32, u32)>,
}

impl ProgressEntry {
    pub fn new(category: Category, status: Status, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            category,
            status,
            message: message.into(),
            retry: None,
        }
    }

    pub fn with_retry(mut self, attempt: u32, max: u32) -> Self {
        self.retry = Some((attempt, max));
        self
    }

    fn retry_suffix(&self) -> String {
        match self.retry {
            Some((attempt, max)) => format!(" || {}/{}", attempt, max),
            None => String::new(),
        }
    }

    /// Line without color codes, as written to the log file
    pub fn plain(&self) -> String {
        format!(
            "{} {:<12} {:<8} {:<40}{}",
            self.timestamp,
            self.category.label(),
            self.status.label(),
            self.message,
            self.retry_suffix()
        )
    }

    /// Line for the terminal
    pub fn colored(&self) -> String {
        // Pad before painting so escape codes do not count towards the width
        format!(
            "{} {} {} {:<40}{}",
            self.timestamp.bright_black(),
            self.category.paint(format!("{:<12}", self.category.label())),
            self.status.paint(format!("{:<8}", self.status.label())),
            self.message,
            self.retry_suffix().bright_black()
        )
    }
}

/// Sink for progress lines
#[derive(Debug, Clone, Default)]
pub struct ProgressLog {
    log_file: Option<PathBuf>,
    quiet: bool,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also append every line to `path`
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Do not print to stdout (the log file and tracing still get every line)
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    pub async fn info(&self, category: Category, message: impl Into<String>) {
        self.emit(ProgressEntry::new(category, Status::Info, message)).await;
    }

    pub async fn ok(&self, category: Category, message: impl Into<String>) {
        self.emit(ProgressEntry::new(category, Status::Ok, message)).await;
    }

    pub async fn warn(&self, category: Category, message: impl Into<String>) {
        self.emit(ProgressEntry::new(category, Status::Warn, message)).await;
    }

    pub async fn fail(&self, category: Category, message: impl Into<String>) {
        self.emit(ProgressEntry::new(category, Status::Fail, message)).await;
    }

    /// One attempt of a bounded poll
    pub async fn attempt(&self, category: Category, message: impl Into<String>, attempt: u32, max: u32) {
        self.emit(ProgressEntry::new(category, Status::Wait, message).with_retry(attempt, max))
            .await;
    }

    pub async fn emit(&self, entry: ProgressEntry) {
        let plain = entry.plain();
        debug!("{}", plain);

        if !self.quiet {
            println!("{}", entry.colored());
        }

        if let Some(path) = &self.log_file {
            fail_open("progress::log_file", || append_line(path, &plain)).await;
        }
    }
}

async fn append_line(path: &PathBuf, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixed(entry: ProgressEntry) -> ProgressEntry {
        ProgressEntry {
            timestamp: "2026-01-01T00:00:00.000Z".to_string(),
            ..entry
        }
    }

    #[test]
    fn test_plain_columns() {
        let entry = fixed(ProgressEntry::new(Category::Upload, Status::Ok, "a.jpg uploaded"));
        let line = entry.plain();

        assert!(line.starts_with("2026-01-01T00:00:00.000Z UPLOAD       OK       a.jpg uploaded"));
        assert!(!line.contains("||"));
    }

    #[test]
    fn test_retry_counter_suffix() {
        let entry = fixed(
            ProgressEntry::new(Category::Upload, Status::Wait, "waiting for Upload to enable")
                .with_retry(3, 100),
        );
        assert!(entry.plain().ends_with(" || 3/100"));
    }

    #[tokio::test]
    async fn test_log_file_appends() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.log");
        let log = ProgressLog::new().quiet().with_log_file(&path);

        log.info(Category::Setup, "first").await;
        log.fail(Category::Upload, "second").await;

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("SETUP"));
        assert!(lines[1].contains("FAIL"));
    }

    #[tokio::test]
    async fn test_unwritable_log_file_is_ignored() {
        let temp = TempDir::new().unwrap();
        let log = ProgressLog::new()
            .quiet()
            .with_log_file(temp.path().join("missing").join("run.log"));

        // Must not panic or error
        log.warn(Category::Cleanup, "still running").await;
    }
}
