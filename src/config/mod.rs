//! Configuration provider: the INI config file, its built-in defaults, and
//! the typed [`Settings`] view the rest of the crate consumes.
//!
//! The file layout follows `configparser` conventions:
//!
//! ```ini
//! [Globals]
//! dotfile_path = %(user_home)s/dotfiles/files
//!
//! [Overrides]
//! vimrc = ~/.config/nvim/init.vim
//!
//! [arch]
//! Xresources = ~/.config/X11/Xresources
//! ```
pub mod ini;
pub mod settings;

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub use ini::KvSection;
pub use settings::Settings;

/// Section holding runtime settings.
pub const GLOBALS: &str = "Globals";
/// Section holding overrides that apply on every platform.
pub const OVERRIDES: &str = "Overrides";
/// File name of the user config file.
pub const CONFIG_FILE_NAME: &str = "dfman.conf";

const MAX_INTERPOLATION_DEPTH: usize = 10;

/// Read interface over the loaded configuration.
///
/// The engine and command setup only ever read configuration through this
/// trait, so tests can substitute a mock.
#[cfg_attr(test, mockall::automock)]
pub trait ConfigProvider {
    /// Interpolated value of `key` in `section`, falling back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if interpolation fails.
    fn get(&self, section: &str, key: &str) -> Result<Option<String>, ConfigError>;

    /// Boolean value of `key` in `section` (`1/yes/true/on`, `0/no/false/off`).
    ///
    /// # Errors
    ///
    /// Returns an error if interpolation fails or the value is not a boolean.
    fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, ConfigError>;

    /// Interpolated entries of `section` in file order, defaults excluded.
    ///
    /// Returns `Ok(None)` when the section does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if interpolation of any value fails.
    fn items(&self, section: &str) -> Result<Option<Vec<(String, String)>>, ConfigError>;
}

/// An INI configuration with built-in defaults.
#[derive(Debug, Clone)]
pub struct IniConfig {
    defaults: KvSection,
    sections: Vec<KvSection>,
}

impl IniConfig {
    /// Parse `content`, with `home` feeding the `user_home` default.
    ///
    /// ```
    /// use std::path::Path;
    /// use dfman::config::{ConfigProvider, IniConfig, GLOBALS};
    ///
    /// let config = IniConfig::parse("[Globals]\nverbose = yes\n", Path::new("/home/u")).unwrap();
    /// assert_eq!(config.get_bool(GLOBALS, "verbose").unwrap(), Some(true));
    /// assert_eq!(
    ///     config.get(GLOBALS, "config_path").unwrap().as_deref(),
    ///     Some("/home/u/.config")
    /// );
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid INI.
    pub fn parse(content: &str, home: &Path) -> Result<Self, ConfigError> {
        let sections = ini::merge_sections(ini::parse_kv_sections_from_str(content)?);
        Ok(Self {
            defaults: defaults(home),
            sections,
        })
    }

    /// Read and parse the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid INI.
    pub fn load(path: &Path, home: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, home)
    }

    /// Whether `section` exists in the file (the defaults do not count).
    #[must_use]
    pub fn has_section(&self, section: &str) -> bool {
        self.section(section).is_some()
    }

    /// Set `key` in `section`, creating the section if needed.
    ///
    /// Only affects the in-memory view; the file is not touched.
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        if let Some(existing) = self.sections.iter_mut().find(|s| s.header == section) {
            existing.set(key, value);
        } else {
            self.sections.push(KvSection {
                header: section.to_string(),
                entries: vec![(key.to_string(), value.to_string())],
            });
        }
    }

    fn section(&self, section: &str) -> Option<&KvSection> {
        self.sections.iter().find(|s| s.header == section)
    }

    /// Uninterpolated lookup: the section first, then the defaults.
    fn raw(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)
            .and_then(|s| s.get(key))
            .or_else(|| self.defaults.get(key))
    }

    /// Expand `%(name)s` references and `%%` escapes in `value`.
    fn interpolate(
        &self,
        section: &str,
        key: &str,
        value: &str,
        depth: usize,
    ) -> Result<String, ConfigError> {
        if depth > MAX_INTERPOLATION_DEPTH {
            return Err(ConfigError::InterpolationDepth {
                section: section.to_string(),
                key: key.to_string(),
            });
        }
        let syntax_error = || ConfigError::InterpolationSyntax {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        };

        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(idx) = rest.find('%') {
            let (head, tail) = rest.split_at(idx);
            out.push_str(head);
            let tail = tail.get(1..).unwrap_or_default();
            if let Some(after) = tail.strip_prefix('%') {
                out.push('%');
                rest = after;
            } else if let Some(after) = tail.strip_prefix('(') {
                let (name, after_name) = after.split_once(")s").ok_or_else(syntax_error)?;
                let referenced =
                    self.raw(section, name)
                        .ok_or_else(|| ConfigError::MissingReference {
                            section: section.to_string(),
                            key: key.to_string(),
                            reference: name.to_string(),
                        })?;
                out.push_str(&self.interpolate(section, name, referenced, depth + 1)?);
                rest = after_name;
            } else {
                return Err(syntax_error());
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}

impl ConfigProvider for IniConfig {
    fn get(&self, section: &str, key: &str) -> Result<Option<String>, ConfigError> {
        self.raw(section, key)
            .map(|value| self.interpolate(section, key, value, 1))
            .transpose()
    }

    fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, ConfigError> {
        let Some(value) = self.get(section, key)? else {
            return Ok(None);
        };
        parse_bool(&value)
            .map(Some)
            .ok_or_else(|| ConfigError::InvalidValue {
                section: section.to_string(),
                key: key.to_string(),
                value,
                expected: "a boolean (yes/no, true/false, on/off, 1/0)",
            })
    }

    fn items(&self, section: &str) -> Result<Option<Vec<(String, String)>>, ConfigError> {
        let Some(found) = self.section(section) else {
            return Ok(None);
        };
        found
            .entries
            .iter()
            .filter(|(key, _)| self.defaults.get(key).is_none())
            .map(|(key, value)| {
                Ok((key.clone(), self.interpolate(section, key, value, 1)?))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

/// Parse a configparser-style boolean.
///
/// ```
/// use dfman::config::parse_bool;
///
/// assert_eq!(parse_bool("Yes"), Some(true));
/// assert_eq!(parse_bool("off"), Some(false));
/// assert_eq!(parse_bool("maybe"), None);
/// ```
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

/// Default location of the user config file: `$HOME/.config/dfman/dfman.conf`.
#[must_use]
pub fn default_config_file(home: &Path) -> PathBuf {
    home.join(".config").join("dfman").join(CONFIG_FILE_NAME)
}

/// Text of a freshly created config file.
///
/// When `dotfile_path` is given it is written as an active setting; otherwise
/// every setting is left commented out at its default.
#[must_use]
pub fn stock_config(dotfile_path: Option<&Path>) -> String {
    let store_line = dotfile_path.map_or_else(
        || "# dotfile_path = %(user_home)s/.dotfiles/files\n".to_string(),
        |path| format!("dotfile_path = {}\n", escape(&path.display().to_string())),
    );
    format!(
        "# dfman configuration\n\
         #\n\
         # Values may reference other keys with %(name)s; %(user_home)s is your home.\n\
         \n\
         [Globals]\n\
         # verbose = false\n\
         {store_line}\
         # config_path = %(user_home)s/.config\n\
         # backup_path = %(user_home)s/.dfman/backups\n\
         # log = %(user_home)s/.dfman/dfman.log\n\
         # loglevel = DEBUG\n\
         # backup_style = slot\n\
         \n\
         # Platform sections are applied on top of [Overrides] when the ID in\n\
         # /etc/os-release matches, e.g.\n\
         #   [arch]\n\
         #   vimrc = ~/.config/nvim/init.vim\n\
         \n\
         # Destination overrides: <entry name> = <destination path>\n\
         [Overrides]\n"
    )
}

fn defaults(home: &Path) -> KvSection {
    let home = escape(&home.display().to_string());
    let entries = [
        ("verbose", "false"),
        ("backup_path", "%(user_home)s/.dfman/backups"),
        ("dotfile_path", "%(user_home)s/.dotfiles/files"),
        ("config_path", "%(user_home)s/.config"),
        ("log", "%(user_home)s/.dfman/dfman.log"),
        ("loglevel", "DEBUG"),
        ("backup_style", "slot"),
        ("timestamp_format", "%%Y%%m%%d%%H%%M%%S"),
        ("user_home", home.as_str()),
        ("HOME", home.as_str()),
    ];
    KvSection {
        header: "DEFAULT".to_string(),
        entries: entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
    }
}

/// Escape `%` so a literal value survives interpolation.
pub(crate) fn escape(value: &str) -> String {
    value.replace('%', "%%")
}
