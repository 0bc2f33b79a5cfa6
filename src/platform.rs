//! Platform identification for per-distribution overrides.
use std::fmt;
use std::path::Path;

const OS_RELEASE: &str = "/etc/os-release";

/// Platform information for the current system.
///
/// The id is the `ID=` field of `os-release` (e.g. `arch`, `ubuntu`) and names
/// the config section whose overrides apply on this machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Platform {
    /// Lowercase distribution id, when known.
    pub id: Option<String>,
}

impl Platform {
    /// Detect the current platform from `/etc/os-release`.
    ///
    /// Systems without the file (or without an `ID=` line) have no id, so only
    /// the global overrides apply.
    #[must_use]
    pub fn detect() -> Self {
        Self::from_file(Path::new(OS_RELEASE))
    }

    /// Read the platform from an `os-release` style file.
    #[must_use]
    pub fn from_file(path: &Path) -> Self {
        let id = std::fs::read_to_string(path)
            .ok()
            .and_then(|content| parse_os_release(&content));
        Self { id }
    }

    /// Create a platform with an explicit id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }

    /// The platform id, if one was detected.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id.as_deref().unwrap_or("unknown"))
    }
}

/// Extract the `ID=` value from `os-release` content, unquoted.
#[must_use]
pub fn parse_os_release(content: &str) -> Option<String> {
    content
        .lines()
        .filter_map(|line| line.trim().strip_prefix("ID="))
        .map(|value| value.trim().trim_matches(['"', '\'']).to_string())
        .find(|value| !value.is_empty())
}
