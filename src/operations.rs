//! Filesystem mutation abstractions.
//!
//! Every change dfman makes to the filesystem goes through a [`FileOperator`].
//! Production code uses [`SystemFileOperator`]; `--dry-run` swaps in
//! [`DryRunFileOperator`], which accepts every request and touches nothing.
//! State queries (does the destination exist, where does a link point) are
//! always made against the real filesystem.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Performs (or pretends to perform) filesystem mutations.
pub trait FileOperator: Send + Sync + fmt::Debug {
    /// Move `from` to `to`, creating the parent directory of `to`.
    ///
    /// Falls back to copy-then-delete when `from` and `to` live on different
    /// filesystems.
    ///
    /// # Errors
    ///
    /// Returns an error if the move fails.
    fn move_path(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Create a symbolic link at `link` pointing to `target`, creating the
    /// parent directory of `link`.
    ///
    /// # Errors
    ///
    /// Returns an error if `link` exists or cannot be created.
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()>;

    /// Remove the symbolic link or file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails.
    fn unlink(&self, path: &Path) -> io::Result<()>;

    /// Append `text` to the file at `path`, creating it (and its parent
    /// directory) if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or written.
    fn append(&self, path: &Path, text: &str) -> io::Result<()>;

    /// Whether mutations are suppressed.
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Select the operator for the requested mode.
#[must_use]
pub fn for_mode(dry_run: bool) -> Box<dyn FileOperator> {
    if dry_run {
        Box::new(DryRunFileOperator)
    } else {
        Box::new(SystemFileOperator)
    }
}

/// Production [`FileOperator`] that delegates to [`std::fs`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFileOperator;

impl FileOperator for SystemFileOperator {
    fn move_path(&self, from: &Path, to: &Path) -> io::Result<()> {
        create_parent(to)?;
        match fs::rename(from, to) {
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                copy_recursive(from, to)?;
                remove_recursive(from)
            }
            other => other,
        }
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        create_parent(link)?;
        create_symlink(target, link)
    }

    fn unlink(&self, path: &Path) -> io::Result<()> {
        let meta = fs::symlink_metadata(path)?;
        if meta.is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        }
    }

    fn append(&self, path: &Path, text: &str) -> io::Result<()> {
        create_parent(path)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        file.write_all(text.as_bytes())
    }
}

/// [`FileOperator`] that reports success for every request and changes
/// nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunFileOperator;

impl FileOperator for DryRunFileOperator {
    fn move_path(&self, _from: &Path, _to: &Path) -> io::Result<()> {
        Ok(())
    }

    fn symlink(&self, _target: &Path, _link: &Path) -> io::Result<()> {
        Ok(())
    }

    fn unlink(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn append(&self, _path: &Path, _text: &str) -> io::Result<()> {
        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}

fn create_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

/// Copy a file, symlink, or directory tree, preserving symlinks as links.
fn copy_recursive(from: &Path, to: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(from)?;
    if meta.file_type().is_symlink() {
        create_symlink(&fs::read_link(from)?, to)
    } else if meta.is_dir() {
        fs::create_dir_all(to)?;
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &to.join(entry.file_name()))?;
        }
        Ok(())
    } else {
        fs::copy(from, to).map(|_| ())
    }
}

fn remove_recursive(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// A filesystem mutation recorded by [`RecordingFileOperator`].
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOp {
    /// `move_path(from, to)`.
    Move(std::path::PathBuf, std::path::PathBuf),
    /// `symlink(target, link)`.
    Symlink(std::path::PathBuf, std::path::PathBuf),
    /// `unlink(path)`.
    Unlink(std::path::PathBuf),
    /// `append(path, text)`.
    Append(std::path::PathBuf, String),
}

/// Test [`FileOperator`] that records every request before forwarding it.
///
/// Wrap [`SystemFileOperator`] to observe real runs, or
/// [`DryRunFileOperator`] to observe what a dry run would have done.
#[cfg(test)]
#[derive(Debug)]
pub struct RecordingFileOperator {
    inner: Box<dyn FileOperator>,
    ops: std::sync::Mutex<Vec<FileOp>>,
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl RecordingFileOperator {
    /// Record every request, then forward it to `inner`.
    pub fn new(inner: Box<dyn FileOperator>) -> Self {
        Self {
            inner,
            ops: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Recorded operations, sorted so parallel runs compare deterministically.
    pub fn ops(&self) -> Vec<FileOp> {
        let mut ops = self.ops.lock().expect("recorded ops poisoned").clone();
        ops.sort_by_key(|op| format!("{op:?}"));
        ops
    }

    fn push(&self, op: FileOp) {
        self.ops.lock().expect("recorded ops poisoned").push(op);
    }
}

#[cfg(test)]
impl FileOperator for RecordingFileOperator {
    fn move_path(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.push(FileOp::Move(from.to_path_buf(), to.to_path_buf()));
        self.inner.move_path(from, to)
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        self.push(FileOp::Symlink(target.to_path_buf(), link.to_path_buf()));
        self.inner.symlink(target, link)
    }

    fn unlink(&self, path: &Path) -> io::Result<()> {
        self.push(FileOp::Unlink(path.to_path_buf()));
        self.inner.unlink(path)
    }

    fn append(&self, path: &Path, text: &str) -> io::Result<()> {
        self.push(FileOp::Append(path.to_path_buf(), text.to_string()));
        self.inner.append(path, text)
    }

    fn is_dry_run(&self) -> bool {
        self.inner.is_dry_run()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn move_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a");
        let to = dir.path().join("nested/deeper/a");
        fs::write(&from, "x").unwrap();
        SystemFileOperator.move_path(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "x");
    }

    #[test]
    fn move_directory() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("nvim");
        fs::create_dir_all(from.join("lua")).unwrap();
        fs::write(from.join("lua/init.lua"), "--").unwrap();
        let to = dir.path().join("store/nvim");
        SystemFileOperator.move_path(&from, &to).unwrap();
        assert!(to.join("lua/init.lua").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn copy_recursive_preserves_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("tree");
        fs::create_dir(&from).unwrap();
        std::os::unix::fs::symlink("/nowhere", from.join("link")).unwrap();
        let to = dir.path().join("copy");
        copy_recursive(&from, &to).unwrap();
        assert_eq!(
            fs::read_link(to.join("link")).unwrap(),
            std::path::PathBuf::from("/nowhere")
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlink_and_unlink() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        fs::write(&target, "x").unwrap();
        let link = dir.path().join("sub/link");
        SystemFileOperator.symlink(&target, &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), target);
        SystemFileOperator.unlink(&link).unwrap();
        assert!(fs::symlink_metadata(&link).is_err());
        assert!(target.exists());
    }

    #[test]
    fn append_creates_then_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf/dfman.conf");
        SystemFileOperator.append(&path, "a\n").unwrap();
        SystemFileOperator.append(&path, "b\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[test]
    fn dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a");
        fs::write(&from, "x").unwrap();
        let ops = for_mode(true);
        assert!(ops.is_dry_run());
        ops.move_path(&from, &dir.path().join("b")).unwrap();
        ops.unlink(&from).unwrap();
        ops.append(&dir.path().join("c"), "x").unwrap();
        assert!(from.exists());
        assert!(!dir.path().join("b").exists());
        assert!(!dir.path().join("c").exists());
    }

    #[test]
    fn recording_operator_records_and_forwards() {
        let rec = RecordingFileOperator::new(Box::new(DryRunFileOperator));
        rec.unlink(Path::new("/x")).unwrap();
        rec.append(Path::new("/c"), "t").unwrap();
        assert!(rec.is_dry_run());
        assert_eq!(
            rec.ops(),
            vec![
                FileOp::Append("/c".into(), "t".to_string()),
                FileOp::Unlink("/x".into()),
            ]
        );
    }
}
