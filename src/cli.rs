//! Command-line interface definition.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI entry point for dfman.
#[derive(Parser, Debug)]
#[command(
    name = "dfman",
    about = "Symlink a dotfile store into place, with backup and restore",
    version = option_env!("DFMAN_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Report what would change without touching the filesystem
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Config file to use instead of ~/.config/dfman/dfman.conf
    #[arg(short, long, global = true, env = "DFMAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable parallel linking (parallel is enabled by default)
    #[arg(long = "no-parallel", global = true, action = clap::ArgAction::SetFalse)]
    pub parallel: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Link every store entry into place, backing up what was there
    Install(InstallOpts),
    /// Remove links and restore backed-up originals
    Uninstall(UninstallOpts),
}

/// Options for the `install` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct InstallOpts {
    /// Write a new config file using PATH as the dotfile store
    #[arg(short, long, value_name = "PATH")]
    pub init: Option<PathBuf>,

    /// Move PATH into the store before installing
    #[arg(short, long, value_name = "PATH")]
    pub add: Option<PathBuf>,
}

/// Options for the `uninstall` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct UninstallOpts {}
