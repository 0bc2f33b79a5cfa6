//! Domain-specific error types for dfman.
//!
//! Library code returns typed errors; `main` and the command handlers convert
//! them to [`anyhow::Error`] via `?`.
//!
//! # Error hierarchy
//!
//! ```text
//! DfmanError
//! ├── NotFound        — missing store, backup directory, or file to add
//! ├── AlreadyExists   — occupied store slot or config file on --init
//! ├── Config(ConfigError)
//! └── Io              — a fatal filesystem failure outside per-entry work
//! ```
//!
//! Per-entry conditions (backup conflicts, vanished sources, missing backups)
//! are not errors; they are [`Outcome`](crate::engine::Outcome) records.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal error kinds. Any of these aborts the running command.
#[derive(Error, Debug)]
pub enum DfmanError {
    /// A required path does not exist.
    #[error("{what} not found: {}", path.display())]
    NotFound {
        /// Short description of the missing thing (e.g. `"dotfile store"`).
        what: &'static str,
        /// The path that was looked up.
        path: PathBuf,
    },

    /// A path that must be free is already occupied.
    #[error("{what} already exists: {}", path.display())]
    AlreadyExists {
        /// Short description of the occupied slot.
        what: &'static str,
        /// The occupied path.
        path: PathBuf,
    },

    /// Configuration could not be loaded or interpreted.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A filesystem operation failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl DfmanError {
    /// Wrap an I/O error with a description of the failed operation.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Errors that arise from reading and interpreting the INI configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("IO error reading config file {}: {source}", path.display())]
    Io {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The INI content is malformed.
    #[error("invalid INI syntax at line {line}: {message}")]
    InvalidSyntax {
        /// 1-based line number.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },

    /// A `%(name)s` reference names a key that is not defined.
    #[error("bad interpolation in [{section}] {key}: '{reference}' is not defined")]
    MissingReference {
        /// Section of the value being interpolated.
        section: String,
        /// Key of the value being interpolated.
        key: String,
        /// The undefined reference.
        reference: String,
    },

    /// Interpolation recursed too deeply (likely a reference cycle).
    #[error("interpolation depth exceeded in [{section}] {key}")]
    InterpolationDepth {
        /// Section of the value being interpolated.
        section: String,
        /// Key of the value being interpolated.
        key: String,
    },

    /// A `%` is not followed by `%` or `(name)s`.
    #[error("bad interpolation syntax in [{section}] {key}: {value}")]
    InterpolationSyntax {
        /// Section of the offending value.
        section: String,
        /// Key of the offending value.
        key: String,
        /// The raw value.
        value: String,
    },

    /// A value could not be converted to the expected type.
    #[error("invalid value for [{section}] {key}: '{value}' ({expected})")]
    InvalidValue {
        /// Section of the offending value.
        section: String,
        /// Key of the offending value.
        key: String,
        /// The raw value.
        value: String,
        /// Description of the accepted values.
        expected: &'static str,
    },

    /// A required key has no value and no default.
    #[error("missing required key [{section}] {key}")]
    MissingKey {
        /// Section that was searched.
        section: String,
        /// The missing key.
        key: String,
    },
}
