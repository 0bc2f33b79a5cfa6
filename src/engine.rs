//! Reconciliation engine: link entries into place, take them back out, and
//! adopt new files into the store.
//!
//! Every decision is made by inspecting the live filesystem; every mutation
//! goes through the injected [`FileOperator`]. A dry run therefore reaches the
//! same decisions and produces the same reports as a real run.
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::{self, OVERRIDES};
use crate::error::DfmanError;
use crate::filemap::FileMap;
use crate::logging::{EntryStatus, Log};
use crate::operations::FileOperator;
use crate::resources::{BackupOutcome, BackupStore, LinkState, RestoreOutcome};

/// Why an entry was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The source no longer exists in the store.
    MissingSource,
    /// The destination already resolves to the source.
    AlreadyLinked,
    /// The backup slot for the destination is occupied.
    BackupConflict,
    /// The destination is not a link to the source.
    NotLinked,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingSource => "missing source",
            Self::AlreadyLinked => "already linked",
            Self::BackupConflict => "backup conflict",
            Self::NotLinked => "not linked",
        })
    }
}

/// Result of reconciling one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A link to the source was created.
    Linked,
    /// The link was removed and no restore was expected.
    Unlinked,
    /// The link was removed and the backed-up original moved back.
    Restored,
    /// The link was removed but no backup was found to put back.
    RestoreMissing,
    /// Nothing was done.
    Skipped(SkipReason),
    /// A filesystem operation failed.
    Failed(String),
}

impl Outcome {
    /// Summary status for this outcome.
    #[must_use]
    pub const fn status(&self) -> EntryStatus {
        match self {
            Self::Linked | Self::Unlinked | Self::Restored => EntryStatus::Ok,
            Self::Skipped(SkipReason::AlreadyLinked | SkipReason::NotLinked) => {
                EntryStatus::Unchanged
            }
            Self::Skipped(_) => EntryStatus::Skipped,
            Self::RestoreMissing => EntryStatus::Warning,
            Self::Failed(_) => EntryStatus::Failed,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linked => f.write_str("linked"),
            Self::Unlinked => f.write_str("unlinked"),
            Self::Restored => f.write_str("restored"),
            Self::RestoreMissing => f.write_str("unlinked, no backup to restore"),
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Outcome for one file map entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    /// Path in the store.
    pub source: PathBuf,
    /// Path in the live filesystem.
    pub dest: PathBuf,
    /// What happened.
    pub outcome: Outcome,
}

/// Applies a [`FileMap`] to the filesystem.
#[derive(Clone, Copy)]
pub struct Reconciler<'a> {
    ops: &'a dyn FileOperator,
    log: &'a dyn Log,
    backups: &'a BackupStore,
    parallel: bool,
}

impl fmt::Debug for Reconciler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("ops", &self.ops)
            .field("backups", &self.backups)
            .field("parallel", &self.parallel)
            .finish_non_exhaustive()
    }
}

impl<'a> Reconciler<'a> {
    /// Create a sequential reconciler.
    #[must_use]
    pub const fn new(
        ops: &'a dyn FileOperator,
        log: &'a dyn Log,
        backups: &'a BackupStore,
    ) -> Self {
        Self {
            ops,
            log,
            backups,
            parallel: false,
        }
    }

    /// Process install entries on the rayon pool.
    #[must_use]
    pub const fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Link every entry of `map` into place, backing up what was there.
    ///
    /// Per-entry problems are reported, never returned. Reports are sorted by
    /// destination.
    pub fn install(&self, map: &FileMap) -> Vec<EntryReport> {
        let entries: Vec<(&Path, &Path)> = map.iter().collect();
        let mut reports = if self.parallel {
            self.install_parallel(entries)
        } else {
            entries
                .into_iter()
                .map(|(source, dest)| self.install_report(source, dest))
                .collect()
        };
        reports.sort_by(|a, b| a.dest.cmp(&b.dest));
        for report in &reports {
            self.log_report(report);
        }
        reports
    }

    /// Install entries in parallel. Entries whose destinations share a
    /// basename compete for the same backup slot, so each such group runs on
    /// one worker.
    fn install_parallel(&self, entries: Vec<(&Path, &Path)>) -> Vec<EntryReport> {
        use rayon::prelude::*;

        let mut groups: BTreeMap<Option<OsString>, Vec<(&Path, &Path)>> = BTreeMap::new();
        for (source, dest) in entries {
            groups
                .entry(dest.file_name().map(OsString::from))
                .or_default()
                .push((source, dest));
        }
        groups
            .into_par_iter()
            .flat_map_iter(|(_, group)| {
                group
                    .into_iter()
                    .map(|(source, dest)| self.install_report(source, dest))
            })
            .collect()
    }

    fn install_report(&self, source: &Path, dest: &Path) -> EntryReport {
        EntryReport {
            source: source.to_path_buf(),
            dest: dest.to_path_buf(),
            outcome: self.install_entry(source, dest),
        }
    }

    fn install_entry(&self, source: &Path, dest: &Path) -> Outcome {
        if !source.exists() {
            return Outcome::Skipped(SkipReason::MissingSource);
        }
        if LinkState::inspect(source, dest).is_linked() {
            return Outcome::Skipped(SkipReason::AlreadyLinked);
        }
        match self.backups.backup(dest, self.ops) {
            Ok(BackupOutcome::Failed) => return Outcome::Skipped(SkipReason::BackupConflict),
            Ok(BackupOutcome::Backed | BackupOutcome::Skipped) => {}
            Err(e) => return Outcome::Failed(format!("backup of {}: {e}", dest.display())),
        }
        match self.ops.symlink(source, dest) {
            Ok(()) => Outcome::Linked,
            Err(e) => Outcome::Failed(format!("link {}: {e}", dest.display())),
        }
    }

    /// Remove the links of `map` and put backed-up originals back.
    ///
    /// # Errors
    ///
    /// Returns [`DfmanError::NotFound`] if the backup directory does not exist.
    /// A dry run never creates it, so there a missing directory just means
    /// nothing can be restored.
    pub fn uninstall(&self, map: &FileMap) -> Result<Vec<EntryReport>, DfmanError> {
        if !self.ops.is_dry_run() && !self.backups.dir().is_dir() {
            return Err(DfmanError::NotFound {
                what: "backup directory",
                path: self.backups.dir().to_path_buf(),
            });
        }
        let mut reports: Vec<EntryReport> = map
            .iter()
            .map(|(source, dest)| EntryReport {
                source: source.to_path_buf(),
                dest: dest.to_path_buf(),
                outcome: self.uninstall_entry(source, dest),
            })
            .collect();
        reports.sort_by(|a, b| a.dest.cmp(&b.dest));
        for report in &reports {
            self.log_report(report);
        }
        Ok(reports)
    }

    fn uninstall_entry(&self, source: &Path, dest: &Path) -> Outcome {
        match LinkState::inspect(source, dest) {
            LinkState::Linked => {}
            LinkState::LinkedViaParent => {
                self.log.debug(&format!(
                    "{} resolves to the store through a linked parent directory",
                    dest.display()
                ));
                return Outcome::Skipped(SkipReason::NotLinked);
            }
            _ => return Outcome::Skipped(SkipReason::NotLinked),
        }
        if let Err(e) = self.ops.unlink(dest) {
            return Outcome::Failed(format!("unlink {}: {e}", dest.display()));
        }
        if !self.backups.restorable() {
            return Outcome::Unlinked;
        }
        match self.backups.restore(dest, self.ops) {
            Ok(RestoreOutcome::Restored) => Outcome::Restored,
            Ok(RestoreOutcome::Missing) => Outcome::RestoreMissing,
            Err(e) => Outcome::Failed(format!("restore {}: {e}", dest.display())),
        }
    }

    fn log_report(&self, report: &EntryReport) {
        let dest = report.dest.display();
        let source = report.source.display();
        match &report.outcome {
            Outcome::Linked => self.log.info(&format!("linked {dest} -> {source}")),
            Outcome::Unlinked => self.log.info(&format!("unlinked {dest}")),
            Outcome::Restored => self.log.info(&format!("restored {dest}")),
            Outcome::RestoreMissing => {
                self.log.warn(&format!("unlinked {dest}; no backup to restore"));
            }
            Outcome::Skipped(SkipReason::MissingSource) => {
                self.log.warn(&format!("skipping {dest}: {source} does not exist"));
            }
            Outcome::Skipped(SkipReason::BackupConflict) => {
                let slot = self
                    .backups
                    .slot(&report.dest)
                    .unwrap_or_else(|| self.backups.dir().to_path_buf());
                self.log.warn(&format!(
                    "skipping {dest}: a backup already exists at {}",
                    slot.display()
                ));
            }
            Outcome::Skipped(reason) => self.log.debug(&format!("{dest}: {reason}")),
            Outcome::Failed(reason) => self.log.error(reason),
        }
        let message = match &report.outcome {
            Outcome::Linked | Outcome::Unlinked | Outcome::Restored => None,
            other => Some(other.to_string()),
        };
        self.log
            .record(&dest.to_string(), report.outcome.status(), message.as_deref());
    }
}

/// What [`add_entry`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddReport {
    /// Where the file now lives in the store.
    pub store_path: PathBuf,
    /// Where the file used to live (and where it will be linked back).
    pub original: PathBuf,
    /// Override appended to the config file, as written (`key`, raw value).
    pub override_entry: Option<(String, String)>,
}

/// Move `existing` into the store and record where it came from.
///
/// When `existing` is not at its default location (`config_root/<name>`), an
/// override `<name> = <original path>` is appended to `config_file` under an
/// `[Overrides]` header, using `~/` for paths inside `home`.
///
/// # Errors
///
/// Returns [`DfmanError::NotFound`] if `existing` or the store is missing,
/// [`DfmanError::AlreadyExists`] if the store already tracks an entry with
/// that name, or [`DfmanError::Io`] if a move or write fails.
pub fn add_entry(
    existing: &Path,
    store_root: &Path,
    config_root: &Path,
    config_file: &Path,
    home: &Path,
    ops: &dyn FileOperator,
) -> Result<AddReport, DfmanError> {
    let original = std::path::absolute(existing)
        .map_err(|e| DfmanError::io(format!("resolving {}", existing.display()), e))?;
    let not_found = || DfmanError::NotFound {
        what: "file to add",
        path: original.clone(),
    };
    if fs::symlink_metadata(&original).is_err() {
        return Err(not_found());
    }
    let name = original.file_name().ok_or_else(not_found)?.to_os_string();
    if !store_root.is_dir() {
        return Err(DfmanError::NotFound {
            what: "dotfile store",
            path: store_root.to_path_buf(),
        });
    }
    let store_path = store_root.join(&name);
    if fs::symlink_metadata(&store_path).is_ok() {
        return Err(DfmanError::AlreadyExists {
            what: "store entry",
            path: store_path,
        });
    }

    let default_dest = std::path::absolute(config_root)
        .map_or_else(|_| config_root.join(&name), |root| root.join(&name));
    let override_entry = (original != default_dest).then(|| {
        (
            name.to_string_lossy().into_owned(),
            config::escape(&home_relative(&original, home)),
        )
    });
    let existing_text = match &override_entry {
        Some(_) => read_config_text(config_file)?,
        None => String::new(),
    };

    ops.move_path(&original, &store_path).map_err(|e| {
        DfmanError::io(
            format!(
                "moving {} to {}",
                original.display(),
                store_path.display()
            ),
            e,
        )
    })?;

    if let Some((key, value)) = &override_entry {
        ops.append(config_file, &override_text(&existing_text, key, value))
            .map_err(|e| DfmanError::io(format!("updating {}", config_file.display()), e))?;
    }

    Ok(AddReport {
        store_path,
        original,
        override_entry,
    })
}

/// Current config text; a config file that does not exist yet is empty.
fn read_config_text(config_file: &Path) -> Result<String, DfmanError> {
    match fs::read_to_string(config_file) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(DfmanError::io(
            format!("reading {}", config_file.display()),
            e,
        )),
    }
}

/// Text to append to a config file whose current content is `existing` so
/// that `key = value` lands in `[Overrides]`.
fn override_text(existing: &str, key: &str, value: &str) -> String {
    let mut text = String::new();
    if !existing.is_empty() && !existing.ends_with('\n') {
        text.push('\n');
    }
    if config::ini::last_section_header(existing).as_deref() != Some(OVERRIDES) {
        if !existing.is_empty() {
            text.push('\n');
        }
        text.push_str(&format!("[{OVERRIDES}]\n"));
    }
    text.push_str(&format!("{key} = {value}\n"));
    text
}

/// `~/rest` for paths under `home`, the full path otherwise.
fn home_relative(path: &Path, home: &Path) -> String {
    match path.strip_prefix(home) {
        Ok(rest) if !home.as_os_str().is_empty() => format!("~/{}", rest.display()),
        _ => path.display().to_string(),
    }
}
