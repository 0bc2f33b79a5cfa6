//! Typed view of the `[Globals]` section.
use std::path::PathBuf;

use chrono::format::{Item, StrftimeItems};
use tracing::level_filters::LevelFilter;

use super::{ConfigProvider, GLOBALS};
use crate::error::ConfigError;
use crate::resources::backup::BackupStyle;

/// Runtime settings resolved from `[Globals]` and the built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root of the dotfile store.
    pub dotfile_path: PathBuf,
    /// Default parent directory for every destination.
    pub config_path: PathBuf,
    /// Directory holding displaced originals.
    pub backup_path: PathBuf,
    /// Log file path.
    pub log_file: PathBuf,
    /// Threshold for lines written to the log file.
    pub log_level: LevelFilter,
    /// How backups are named inside `backup_path`.
    pub backup_style: BackupStyle,
}

impl Settings {
    /// Read every setting from `config`, expanding a leading `~` in paths.
    ///
    /// # Errors
    ///
    /// Returns an error if a value fails interpolation, has the wrong type,
    /// or (for keys without defaults) is missing.
    pub fn from_provider(config: &dyn ConfigProvider) -> Result<Self, ConfigError> {
        let log_level = {
            let raw = required(config, "loglevel")?;
            parse_level(&raw).ok_or_else(|| ConfigError::InvalidValue {
                section: GLOBALS.to_string(),
                key: "loglevel".to_string(),
                value: raw.clone(),
                expected: "one of DEBUG, INFO, WARNING, ERROR, CRITICAL",
            })?
        };

        let backup_style = {
            let raw = required(config, "backup_style")?;
            match raw.trim().to_ascii_lowercase().as_str() {
                "slot" => BackupStyle::Slot,
                "archive" | "timestamp" => BackupStyle::Archive {
                    format: timestamp_format(config)?,
                },
                _ => {
                    return Err(ConfigError::InvalidValue {
                        section: GLOBALS.to_string(),
                        key: "backup_style".to_string(),
                        value: raw,
                        expected: "slot or archive",
                    });
                }
            }
        };

        Ok(Self {
            dotfile_path: path(config, "dotfile_path")?,
            config_path: path(config, "config_path")?,
            backup_path: path(config, "backup_path")?,
            log_file: path(config, "log")?,
            log_level,
            backup_style,
        })
    }
}

fn required(config: &dyn ConfigProvider, key: &str) -> Result<String, ConfigError> {
    config
        .get(GLOBALS, key)?
        .ok_or_else(|| ConfigError::MissingKey {
            section: GLOBALS.to_string(),
            key: key.to_string(),
        })
}

/// The archive timestamp format, rejected up front if `chrono` cannot render it.
fn timestamp_format(config: &dyn ConfigProvider) -> Result<String, ConfigError> {
    let format = required(config, "timestamp_format")?;
    if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::InvalidValue {
            section: GLOBALS.to_string(),
            key: "timestamp_format".to_string(),
            value: format,
            expected: "a strftime format",
        });
    }
    Ok(format)
}

fn path(config: &dyn ConfigProvider, key: &str) -> Result<PathBuf, ConfigError> {
    let raw = required(config, key)?;
    Ok(PathBuf::from(shellexpand::tilde(&raw).as_ref()))
}

/// Map a Python-style log level name to a tracing filter.
fn parse_level(value: &str) -> Option<LevelFilter> {
    match value.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Some(LevelFilter::TRACE),
        "DEBUG" | "NOTSET" => Some(LevelFilter::DEBUG),
        "INFO" => Some(LevelFilter::INFO),
        "WARNING" | "WARN" => Some(LevelFilter::WARN),
        "ERROR" | "CRITICAL" => Some(LevelFilter::ERROR),
        "OFF" => Some(LevelFilter::OFF),
        _ => None,
    }
}
