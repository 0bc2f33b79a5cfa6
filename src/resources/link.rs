//! Link state of a destination relative to its store source.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// What currently occupies a destination path.
///
/// # Examples
///
/// ```
/// use dfman::resources::LinkState;
///
/// assert!(LinkState::Linked.is_linked());
/// assert!(LinkState::LinkedViaParent.is_linked());
/// assert!(!LinkState::Dangling.is_linked());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// A symlink at the destination resolves to the source.
    Linked,
    /// The destination resolves to the source through a symlinked ancestor
    /// directory, not through a link of its own.
    LinkedViaParent,
    /// Nothing exists at the destination.
    Absent,
    /// A symlink whose target does not exist.
    Dangling,
    /// A symlink resolving somewhere other than the source.
    Elsewhere {
        /// The link's immediate target.
        target: PathBuf,
    },
    /// A regular file or directory that is not the source.
    Occupied,
}

impl LinkState {
    /// Inspect `dest` against `source`.
    ///
    /// Paths are compared after full canonical resolution, so a destination
    /// reached through a chain of links still counts as linked.
    #[must_use]
    pub fn inspect(source: &Path, dest: &Path) -> Self {
        let meta = match fs::symlink_metadata(dest) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::Absent,
            Err(_) => return Self::Occupied,
        };
        let source = dunce::canonicalize(source).ok();

        if meta.file_type().is_symlink() {
            match dunce::canonicalize(dest) {
                Err(_) => Self::Dangling,
                Ok(real) if Some(&real) == source.as_ref() => Self::Linked,
                Ok(real) => Self::Elsewhere {
                    target: fs::read_link(dest).unwrap_or(real),
                },
            }
        } else {
            let real = dunce::canonicalize(dest).ok();
            if real.is_some() && real == source {
                Self::LinkedViaParent
            } else {
                Self::Occupied
            }
        }
    }

    /// Whether the destination resolves to the source.
    #[must_use]
    pub const fn is_linked(&self) -> bool {
        matches!(self, Self::Linked | Self::LinkedViaParent)
    }
}

/// True iff `dest` canonically resolves to `source`.
#[must_use]
pub fn is_linked(source: &Path, dest: &Path) -> bool {
    LinkState::inspect(source, dest).is_linked()
}
