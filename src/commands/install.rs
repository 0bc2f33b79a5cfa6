//! Install command implementation.
use std::path::Path;

use anyhow::{Context as _, Result};

use super::Runtime;
use crate::cli::InstallOpts;
use crate::config::OVERRIDES;
use crate::engine::{self, Reconciler};
use crate::logging::Logger;

/// Run the install command.
///
/// # Errors
///
/// Returns an error if `--add` fails, the store is missing, or any entry
/// failed to install.
pub fn run(runtime: &mut Runtime, opts: &InstallOpts, log: &Logger) -> Result<()> {
    runtime.announce(log);

    if let Some(path) = &opts.add {
        add(runtime, path, log)?;
    }

    log.stage("Installing dotfiles");
    let map = runtime.file_map(log)?;
    log.info(&format!(
        "{} entr{} in {}",
        map.len(),
        if map.len() == 1 { "y" } else { "ies" },
        runtime.settings.dotfile_path.display()
    ));

    let backups = runtime.backup_store();
    Reconciler::new(runtime.ops.as_ref(), log, &backups)
        .parallel(runtime.parallel)
        .install(&map);

    super::finish(log, runtime.dry_run)
}

/// Move `path` into the store, recording an override when it does not live
/// at its default location.
fn add(runtime: &mut Runtime, path: &Path, log: &Logger) -> Result<()> {
    log.stage("Adding to store");
    let existing = super::expand(path);
    let report = engine::add_entry(
        &existing,
        &runtime.settings.dotfile_path,
        &runtime.settings.config_path,
        &runtime.config_file,
        &runtime.home,
        runtime.ops.as_ref(),
    )
    .with_context(|| format!("cannot add {}", existing.display()))?;

    let verb = if runtime.dry_run { "would move" } else { "moved" };
    log.info(&format!(
        "{verb} {} to {}",
        report.original.display(),
        report.store_path.display()
    ));
    if let Some((key, value)) = &report.override_entry {
        log.info(&format!(
            "override {key} = {value} added to {}",
            runtime.config_file.display()
        ));
        runtime.config.set(OVERRIDES, key, value);
    }
    if runtime.dry_run {
        log.dry_run(&format!(
            "{} is not in the store yet, so it will not be linked",
            report.original.display()
        ));
    }
    Ok(())
}
