//! Subcommand orchestration and the shared per-run setup.
pub mod install;
pub mod uninstall;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::{self, ConfigProvider, GLOBALS, IniConfig, Settings};
use crate::error::{ConfigError, DfmanError};
use crate::filemap::{FileMap, Overrides, build_file_map};
use crate::logging::Logger;
use crate::operations::{self, FileOperator};
use crate::platform::Platform;
use crate::resources::BackupStore;

/// How the config file for this run came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Read from an existing file.
    Loaded,
    /// The file was missing and a stock one was written.
    Created,
    /// Written by `install --init`.
    Initialized,
}

/// Everything a command needs, resolved once per invocation.
pub struct Runtime {
    /// Loaded configuration, including overrides added during this run.
    pub config: IniConfig,
    /// Path of the config file.
    pub config_file: PathBuf,
    /// How the config file came to be.
    pub origin: ConfigOrigin,
    /// Typed `[Globals]` settings.
    pub settings: Settings,
    /// Detected platform.
    pub platform: Platform,
    /// The user's home directory.
    pub home: PathBuf,
    /// Filesystem mutator for this run (real or dry-run).
    pub ops: Box<dyn FileOperator>,
    /// Whether debug output goes to the console.
    pub verbose: bool,
    /// Whether mutations are suppressed.
    pub dry_run: bool,
    /// Whether install may process entries in parallel.
    pub parallel: bool,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config_file", &self.config_file)
            .field("origin", &self.origin)
            .field("settings", &self.settings)
            .field("platform", &self.platform)
            .field("verbose", &self.verbose)
            .field("dry_run", &self.dry_run)
            .field("parallel", &self.parallel)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// Load the configuration, detect the platform, and compute run flags.
    ///
    /// `init` is the store path given to `install --init`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory is unknown, the config file
    /// cannot be written or parsed, or `--init` finds an existing config file.
    pub fn setup(cli_verbose: bool, global: &GlobalOpts, init: Option<&Path>) -> Result<Self> {
        let home = home_dir()?;
        let ops = operations::for_mode(global.dry_run);
        let config_file = global
            .config
            .as_deref()
            .map_or_else(|| config::default_config_file(&home), expand);

        let (config, origin) = load_config(&config_file, init, &home, ops.as_ref())?;
        let settings = Settings::from_provider(&config)
            .with_context(|| format!("invalid settings in {}", config_file.display()))?;
        let verbose = verbose_flag(&config, cli_verbose, global.dry_run)?;

        Ok(Self {
            config,
            config_file,
            origin,
            settings,
            platform: Platform::detect(),
            home,
            ops,
            verbose,
            dry_run: global.dry_run,
            parallel: global.parallel,
        })
    }

    /// Backup store described by the settings.
    #[must_use]
    pub fn backup_store(&self) -> BackupStore {
        BackupStore::new(
            self.settings.backup_path.clone(),
            self.settings.backup_style.clone(),
        )
    }

    /// Resolve overrides for this platform and build the file map, warning
    /// about overrides that match nothing in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if an override fails interpolation or the store is
    /// missing.
    pub fn file_map(&self, log: &Logger) -> Result<FileMap> {
        let overrides = Overrides::from_config(&self.config, &self.platform)
            .map_err(DfmanError::from)?;
        log.debug(&format!("{} override(s) apply", overrides.len()));
        let map = build_file_map(
            &self.settings.dotfile_path,
            &self.settings.config_path,
            &overrides,
        )?;
        for key in &map.unmatched {
            log.warn(&format!("override {key} matches no entry in the store"));
        }
        Ok(map)
    }

    /// Log the facts established during setup.
    pub fn announce(&self, log: &Logger) {
        if self.ops.is_dry_run() {
            log.dry_run("no changes will be made");
        }
        match self.origin {
            ConfigOrigin::Loaded => {
                log.debug(&format!("config: {}", self.config_file.display()));
            }
            ConfigOrigin::Created => log.info(&format!(
                "created default config at {}",
                self.config_file.display()
            )),
            ConfigOrigin::Initialized => log.info(&format!(
                "initialized config at {} with store {}",
                self.config_file.display(),
                self.settings.dotfile_path.display()
            )),
        }
        log.debug(&format!("platform: {}", self.platform));
        log.debug(&format!("store: {}", self.settings.dotfile_path.display()));
        log.debug(&format!(
            "config root: {}",
            self.settings.config_path.display()
        ));
        log.debug(&format!("backups: {}", self.settings.backup_path.display()));
    }
}

/// Verbose output is on when the config, the command line, or dry-run asks.
///
/// # Errors
///
/// Returns an error if the config's `verbose` value is not a boolean.
pub fn verbose_flag(
    config: &dyn ConfigProvider,
    cli_verbose: bool,
    dry_run: bool,
) -> Result<bool, ConfigError> {
    let configured = config.get_bool(GLOBALS, "verbose")?.unwrap_or(false);
    Ok(configured || cli_verbose || dry_run)
}

/// Create the backup directory and the log file's parent directory.
///
/// A dry run creates nothing.
///
/// # Errors
///
/// Returns an error if a directory cannot be created.
pub fn create_runtime_directories(settings: &Settings, dry_run: bool) -> Result<(), DfmanError> {
    if dry_run {
        return Ok(());
    }
    let dirs = std::iter::once(settings.backup_path.as_path())
        .chain(settings.log_file.parent().filter(|p| !p.as_os_str().is_empty()));
    for dir in dirs {
        fs::create_dir_all(dir)
            .map_err(|e| DfmanError::io(format!("creating {}", dir.display()), e))?;
    }
    Ok(())
}

/// Print the summary and fail if any entry failed.
///
/// # Errors
///
/// Returns an error if one or more entries recorded a failure.
pub fn finish(log: &Logger, dry_run: bool) -> Result<()> {
    log.print_summary(dry_run);
    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} entr{} failed", if count == 1 { "y" } else { "ies" });
    }
    Ok(())
}

/// Read, create, or initialize the config file.
fn load_config(
    path: &Path,
    init: Option<&Path>,
    home: &Path,
    ops: &dyn FileOperator,
) -> Result<(IniConfig, ConfigOrigin)> {
    let exists = fs::symlink_metadata(path).is_ok();
    let (text, origin) = match init {
        Some(_) if exists => {
            return Err(DfmanError::AlreadyExists {
                what: "config file",
                path: path.to_path_buf(),
            }
            .into());
        }
        Some(store) => {
            let store = std::path::absolute(expand(store))
                .with_context(|| format!("resolving {}", store.display()))?;
            (config::stock_config(Some(&store)), ConfigOrigin::Initialized)
        }
        None if exists => {
            let config = IniConfig::load(path, home).map_err(DfmanError::from)?;
            return Ok((config, ConfigOrigin::Loaded));
        }
        None => (config::stock_config(None), ConfigOrigin::Created),
    };
    ops.append(path, &text)
        .with_context(|| format!("writing {}", path.display()))?;
    let config = IniConfig::parse(&text, home).map_err(DfmanError::from)?;
    Ok((config, origin))
}

/// The user's home directory from `HOME` (or `USERPROFILE`).
///
/// # Errors
///
/// Returns an error if neither variable is set.
pub fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .context("cannot determine home directory: HOME is not set")
}

/// Expand a leading `~` in a user-supplied path.
pub(crate) fn expand(path: &Path) -> PathBuf {
    path.to_str().map_or_else(
        || path.to_path_buf(),
        |s| PathBuf::from(shellexpand::tilde(s).as_ref()),
    )
}
