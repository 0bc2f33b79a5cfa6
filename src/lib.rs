//! Dotfile manager engine.
//!
//! Keeps the dotfiles of a store directory symlinked into place, backing up
//! whatever occupied each destination and restoring it on uninstall. Paths
//! and per-platform destination overrides come from an INI config file.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: parse the config file and resolve settings
//! - **[`filemap`]**: turn the store listing and overrides into source/destination pairs
//! - **[`resources`]**: link inspection and the backup store
//! - **[`engine`]**: install, uninstall, and add over a file map
//! - **[`commands`]**: top-level subcommand orchestration (`install`, `uninstall`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod filemap;
pub mod logging;
pub mod operations;
pub mod platform;
pub mod resources;
