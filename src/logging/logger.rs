//! Structured logger with summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET};
use super::types::{EntryRecord, EntryStatus, Log};

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Logger that forwards messages to `tracing` and collects entry records for
/// the end-of-run summary.
#[derive(Debug)]
pub struct Logger {
    entries: Mutex<Vec<EntryRecord>>,
    log_file: Option<PathBuf>,
}

/// Per-status tallies for the summary line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SummaryCounts {
    /// Entries changed.
    pub ok: usize,
    /// Entries already in place.
    pub unchanged: usize,
    /// Entries deliberately left alone.
    pub skipped: usize,
    /// Entries completed with a warning.
    pub warning: usize,
    /// Entries that failed.
    pub failed: usize,
}

impl SummaryCounts {
    /// Tally `entries` by status.
    #[must_use]
    pub fn from_entries(entries: &[EntryRecord]) -> Self {
        entries.iter().fold(Self::default(), |mut c, e| {
            match e.status {
                EntryStatus::Ok => c.ok += 1,
                EntryStatus::Unchanged => c.unchanged += 1,
                EntryStatus::Skipped => c.skipped += 1,
                EntryStatus::Warning => c.warning += 1,
                EntryStatus::Failed => c.failed += 1,
            }
            c
        })
    }

    /// Total number of entries.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.ok + self.unchanged + self.skipped + self.warning + self.failed
    }
}

/// Render the one-line run summary.
#[must_use]
pub fn summary_line(counts: &SummaryCounts, dry_run: bool) -> String {
    let changed = if dry_run { "would change" } else { "changed" };
    format!(
        "{} entries: {} {changed}, {} unchanged, {} skipped, {} warnings, {} failed",
        counts.total(),
        counts.ok,
        counts.unchanged,
        counts.skipped,
        counts.warning,
        counts.failed,
    )
}

impl Logger {
    /// Create a logger; `log_file` is only shown in the summary.
    #[must_use]
    pub const fn new(log_file: Option<PathBuf>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            log_file,
        }
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run notice.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Record an entry result for the summary.
    pub fn record(&self, subject: &str, status: EntryStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.push(EntryRecord {
                subject: subject.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Return a clone of all recorded entries.
    #[must_use]
    pub fn entries(&self) -> Vec<EntryRecord> {
        self.entries.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Count the number of failed entries.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.entries.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|e| e.status == EntryStatus::Failed)
                .count()
        })
    }

    /// Print the summary of all recorded entries.
    ///
    /// Unchanged entries are listed at debug level only.
    pub fn print_summary(&self, dry_run: bool) {
        let entries = self.entries();
        if entries.is_empty() {
            return;
        }

        self.stage("Summary");
        for entry in &entries {
            let (icon, color) = match entry.status {
                EntryStatus::Ok => ("✓", "\x1b[32m"),
                EntryStatus::Unchanged => ("·", "\x1b[2m"),
                EntryStatus::Skipped => ("○", "\x1b[33m"),
                EntryStatus::Warning => ("!", "\x1b[33m"),
                EntryStatus::Failed => ("✗", "\x1b[31m"),
            };
            let suffix = entry
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));
            let line = format!("{color}{icon} {}{suffix}\x1b[0m", entry.subject);
            if entry.status == EntryStatus::Unchanged {
                self.debug(&line);
            } else {
                self.info(&line);
            }
        }

        self.info(&summary_line(&SummaryCounts::from_entries(&entries), dry_run));
        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn record(&self, subject: &str, status: EntryStatus, message: Option<&str>) {
        self.record(subject, status, message);
    }
}
