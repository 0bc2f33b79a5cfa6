//! Core logging types: per-entry records, their status, and the [`Log`] trait.

/// Result of reconciling one dotfile, kept for the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    /// What the record is about, usually the destination path.
    pub subject: String,
    /// Final status of the entry.
    pub status: EntryStatus,
    /// Optional detail (e.g. skip reason or error description).
    pub message: Option<String>,
}

/// Status of a reconciled entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// A change was made (or would be, in a dry run).
    Ok,
    /// Already in the desired state; nothing to do.
    Unchanged,
    /// Deliberately left alone.
    Skipped,
    /// Completed, but with something the user should look at.
    Warning,
    /// The entry could not be reconciled.
    Failed,
}

/// Abstraction over logging backends.
///
/// [`Logger`](super::logger::Logger) forwards to `tracing` and keeps the
/// summary; tests use an in-memory implementation so output can be asserted.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (shown on the console only when verbose).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run notice.
    fn dry_run(&self, msg: &str);
    /// Record an entry result for the summary.
    fn record(&self, subject: &str, status: EntryStatus, message: Option<&str>);
}
