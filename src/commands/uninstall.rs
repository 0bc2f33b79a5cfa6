//! Uninstall command implementation.
use anyhow::Result;

use super::Runtime;
use crate::cli::UninstallOpts;
use crate::engine::Reconciler;
use crate::logging::Logger;

/// Run the uninstall command.
///
/// # Errors
///
/// Returns an error if the store or backup directory is missing, or any
/// entry failed to uninstall.
pub fn run(runtime: &Runtime, _opts: &UninstallOpts, log: &Logger) -> Result<()> {
    runtime.announce(log);

    log.stage("Uninstalling dotfiles");
    let map = runtime.file_map(log)?;
    let backups = runtime.backup_store();
    if !backups.restorable() {
        log.info("archive backups are kept; links are removed without restoring");
    }
    Reconciler::new(runtime.ops.as_ref(), log, &backups).uninstall(&map)?;

    super::finish(log, runtime.dry_run)
}
