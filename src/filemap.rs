//! Source-to-destination mapping for one run.
//!
//! The map is rebuilt from the live store every run: each immediate entry of
//! the store maps to `config_root/<name>`, then overrides redirect individual
//! entries elsewhere.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{ConfigProvider, OVERRIDES};
use crate::error::{ConfigError, DfmanError};
use crate::platform::Platform;

/// Resolved override table: entry identifier → destination.
///
/// Identifiers are store-relative names (`vimrc`) or absolute source paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides(BTreeMap<String, String>);

impl Overrides {
    /// Build the table for `platform` from the config's `[Overrides]` section
    /// and the section named after the platform id.
    ///
    /// # Errors
    ///
    /// Returns an error if a value in either section fails interpolation.
    pub fn from_config(
        config: &dyn ConfigProvider,
        platform: &Platform,
    ) -> Result<Self, ConfigError> {
        let global = config.items(OVERRIDES)?.unwrap_or_default();
        let platform_table = match platform.id() {
            Some(id) => config.items(id)?,
            None => None,
        };
        Ok(resolve_overrides(
            &global,
            platform.id(),
            platform_table.as_deref(),
        ))
    }

    /// Destination override for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Iterate `(identifier, destination)` pairs in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of overrides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no overrides.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Overrides {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Layer platform overrides over global ones.
///
/// The platform table only applies when a platform id is known; an absent
/// table (no section for this platform) is not an error.
///
/// ```
/// use dfman::filemap::resolve_overrides;
///
/// let global = vec![("a".to_string(), "X".to_string())];
/// let arch = vec![("a".to_string(), "Y".to_string())];
///
/// assert_eq!(resolve_overrides(&global, Some("arch"), Some(arch.as_slice())).get("a"), Some("Y"));
/// assert_eq!(resolve_overrides(&global, Some("arch"), None).get("a"), Some("X"));
/// assert_eq!(resolve_overrides(&global, None, Some(arch.as_slice())).get("a"), Some("X"));
/// ```
#[must_use]
pub fn resolve_overrides(
    global: &[(String, String)],
    platform_id: Option<&str>,
    platform_table: Option<&[(String, String)]>,
) -> Overrides {
    let platform_entries = platform_id
        .and(platform_table)
        .unwrap_or_default();
    global
        .iter()
        .chain(platform_entries)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Fully resolved source → destination mapping for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMap {
    entries: BTreeMap<PathBuf, PathBuf>,
    /// Override identifiers that matched no store entry.
    pub unmatched: Vec<String>,
}

impl FileMap {
    /// Iterate `(source, destination)` pairs in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.entries
            .iter()
            .map(|(s, d)| (s.as_path(), d.as_path()))
    }

    /// Destination for `source`, if tracked.
    #[must_use]
    pub fn get(&self, source: &Path) -> Option<&Path> {
        self.entries.get(source).map(PathBuf::as_path)
    }

    /// Number of tracked entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the file map for `store_root`.
///
/// Both roots are made absolute so the links created from the map do not
/// depend on the working directory. Override destinations are `~`-expanded;
/// relative ones are taken relative to `config_root`.
///
/// # Errors
///
/// Returns [`DfmanError::NotFound`] if `store_root` is not a directory, or
/// [`DfmanError::Io`] if it cannot be listed.
pub fn build_file_map(
    store_root: &Path,
    config_root: &Path,
    overrides: &Overrides,
) -> Result<FileMap, DfmanError> {
    if !store_root.is_dir() {
        return Err(DfmanError::NotFound {
            what: "dotfile store",
            path: store_root.to_path_buf(),
        });
    }
    let store_root = absolute(store_root)?;
    let config_root = absolute(config_root)?;

    let listing = fs::read_dir(&store_root)
        .map_err(|e| DfmanError::io(format!("reading {}", store_root.display()), e))?;
    let mut entries = BTreeMap::new();
    for entry in listing {
        let entry =
            entry.map_err(|e| DfmanError::io(format!("reading {}", store_root.display()), e))?;
        let name = entry.file_name();
        entries.insert(store_root.join(&name), config_root.join(&name));
    }

    let mut unmatched = Vec::new();
    for (key, value) in overrides.iter() {
        let key_path = PathBuf::from(shellexpand::tilde(key).as_ref());
        let source = store_root.join(key_path);
        match entries.get_mut(&source) {
            Some(dest) => {
                *dest = config_root.join(shellexpand::tilde(value).as_ref());
            }
            None => unmatched.push(key.to_string()),
        }
    }

    Ok(FileMap { entries, unmatched })
}

fn absolute(path: &Path) -> Result<PathBuf, DfmanError> {
    std::path::absolute(path)
        .map_err(|e| DfmanError::io(format!("resolving {}", path.display()), e))
}
