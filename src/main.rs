//! dfman command-line entry point.
use anyhow::{Context as _, Result};
use clap::Parser;

use dfman::cli::{Cli, Command};
use dfman::commands::{self, Runtime};
use dfman::logging::{self, Logger};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();

    let init = match &args.command {
        Command::Install(opts) => opts.init.as_deref(),
        Command::Uninstall(_) => None,
    };
    let mut runtime =
        Runtime::setup(args.verbose, &args.global, init).context("cannot load configuration")?;
    commands::create_runtime_directories(&runtime.settings, runtime.dry_run)?;

    // A dry run writes no log file.
    let log_file = (!runtime.dry_run).then(|| runtime.settings.log_file.clone());
    logging::init_subscriber(
        runtime.verbose,
        log_file.as_deref(),
        runtime.settings.log_level,
    );
    let log = Logger::new(log_file);

    match &args.command {
        Command::Install(opts) => commands::install::run(&mut runtime, opts, &log),
        Command::Uninstall(opts) => commands::uninstall::run(&runtime, opts, &log),
    }
}
