//! Logging infrastructure for console and file output.

mod logger;
mod subscriber;
mod types;
mod utils;

pub use logger::{Logger, SummaryCounts, summary_line};
pub use subscriber::init_subscriber;
pub use types::{EntryRecord, EntryStatus, Log};

/// In-memory [`Log`] for unit tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryLog {
    lines: std::sync::Mutex<Vec<(&'static str, String)>>,
    records: std::sync::Mutex<Vec<EntryRecord>>,
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl MemoryLog {
    fn push(&self, level: &'static str, msg: &str) {
        self.lines
            .lock()
            .expect("memory log poisoned")
            .push((level, msg.to_string()));
    }

    /// Messages logged at `level` (`"stage"`, `"info"`, `"debug"`, `"warn"`,
    /// `"error"` or `"dry_run"`).
    pub(crate) fn messages(&self, level: &str) -> Vec<String> {
        self.lines
            .lock()
            .expect("memory log poisoned")
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub(crate) fn records(&self) -> Vec<EntryRecord> {
        self.records.lock().expect("memory log poisoned").clone()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl Log for MemoryLog {
    fn stage(&self, msg: &str) {
        self.push("stage", msg);
    }
    fn info(&self, msg: &str) {
        self.push("info", msg);
    }
    fn debug(&self, msg: &str) {
        self.push("debug", msg);
    }
    fn warn(&self, msg: &str) {
        self.push("warn", msg);
    }
    fn error(&self, msg: &str) {
        self.push("error", msg);
    }
    fn dry_run(&self, msg: &str) {
        self.push("dry_run", msg);
    }
    fn record(&self, subject: &str, status: EntryStatus, message: Option<&str>) {
        self.records
            .lock()
            .expect("memory log poisoned")
            .push(EntryRecord {
                subject: subject.to_string(),
                status,
                message: message.map(String::from),
            });
    }
}
