//! Backup store for originals displaced by links.
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::operations::FileOperator;

/// How backup slots are named.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BackupStyle {
    /// One slot per destination basename: `backup_dir/<basename>`.
    #[default]
    Slot,
    /// Timestamped copies: `backup_dir/<basename>-<timestamp>`. These are kept
    /// as an archive and never restored automatically.
    Archive {
        /// `chrono` format string for the timestamp suffix.
        format: String,
    },
}

/// Result of [`BackupStore::backup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// The destination is free: it was moved aside, or there was nothing there.
    Backed,
    /// A dangling link at the destination was removed; nothing was kept.
    Skipped,
    /// The backup slot is already occupied; the destination was left alone.
    Failed,
}

/// Result of [`BackupStore::restore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The original was moved back to the destination.
    Restored,
    /// No restorable backup exists for the destination.
    Missing,
}

/// The backup directory and its naming style.
///
/// Slot occupancy is read from disk, overlaid with the moves this store has
/// requested during the run. A dry-run operator never fills or empties a
/// slot, so the overlay is what keeps its decisions equal to a real run's.
#[derive(Debug)]
pub struct BackupStore {
    dir: PathBuf,
    style: BackupStyle,
    /// Slot → occupied, for every slot this run moved something into or out of.
    moved: Mutex<BTreeMap<PathBuf, bool>>,
}

impl BackupStore {
    /// Create a store rooted at `dir`.
    #[must_use]
    pub const fn new(dir: PathBuf, style: BackupStyle) -> Self {
        Self {
            dir,
            style,
            moved: Mutex::new(BTreeMap::new()),
        }
    }

    /// The backup directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether uninstall can put backups back (archives are never restored).
    #[must_use]
    pub const fn restorable(&self) -> bool {
        matches!(self.style, BackupStyle::Slot)
    }

    /// The fixed slot for `dest`: `backup_dir/basename(dest)`.
    ///
    /// Returns `None` for paths without a final component (e.g. `/`).
    #[must_use]
    pub fn slot(&self, dest: &Path) -> Option<PathBuf> {
        dest.file_name().map(|name| self.dir.join(name))
    }

    /// The slot a backup made now would use.
    fn target_slot(&self, dest: &Path) -> Option<PathBuf> {
        match &self.style {
            BackupStyle::Slot => self.slot(dest),
            BackupStyle::Archive { format } => dest.file_name().map(|name| {
                let mut stamped = OsString::from(name);
                stamped.push(format!("-{}", chrono::Local::now().format(format)));
                self.dir.join(stamped)
            }),
        }
    }

    /// Move whatever occupies `dest` into the backup directory.
    ///
    /// # Errors
    ///
    /// Returns an error if `dest` has no file name or a filesystem operation
    /// fails.
    pub fn backup(&self, dest: &Path, ops: &dyn FileOperator) -> io::Result<BackupOutcome> {
        let Ok(meta) = fs::symlink_metadata(dest) else {
            return Ok(BackupOutcome::Backed);
        };
        let slot = self.target_slot(dest).ok_or_else(|| no_file_name(dest))?;
        let mut moved = self.moved.lock().unwrap_or_else(PoisonError::into_inner);
        if occupied(&moved, &slot) {
            return Ok(BackupOutcome::Failed);
        }
        if meta.file_type().is_symlink() && fs::metadata(dest).is_err() {
            ops.unlink(dest)?;
            return Ok(BackupOutcome::Skipped);
        }
        ops.move_path(dest, &slot)?;
        moved.insert(slot, true);
        Ok(BackupOutcome::Backed)
    }

    /// Move the backup for `dest` back into place.
    ///
    /// Archive backups are never restored.
    ///
    /// # Errors
    ///
    /// Returns an error if `dest` has no file name or the move fails.
    pub fn restore(&self, dest: &Path, ops: &dyn FileOperator) -> io::Result<RestoreOutcome> {
        if !self.restorable() {
            return Ok(RestoreOutcome::Missing);
        }
        let slot = self.slot(dest).ok_or_else(|| no_file_name(dest))?;
        let mut moved = self.moved.lock().unwrap_or_else(PoisonError::into_inner);
        if !occupied(&moved, &slot) {
            return Ok(RestoreOutcome::Missing);
        }
        ops.move_path(&slot, dest)?;
        moved.insert(slot, false);
        Ok(RestoreOutcome::Restored)
    }
}

/// Whether `slot` holds a backup, preferring this run's own moves over disk.
fn occupied(moved: &BTreeMap<PathBuf, bool>, slot: &Path) -> bool {
    moved
        .get(slot)
        .copied()
        .unwrap_or_else(|| fs::symlink_metadata(slot).is_ok())
}

fn no_file_name(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("path has no file name: {}", path.display()),
    )
}
