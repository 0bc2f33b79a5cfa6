#![cfg(unix)]
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for the `install` command.
//!
//! Each test runs the real binary against a sandboxed `HOME` and checks the
//! filesystem afterwards.

mod common;

use std::fs;

use common::*;
use predicates::prelude::*;

// ---------------------------------------------------------------------------
// Linking
// ---------------------------------------------------------------------------

#[test]
fn install_links_every_store_entry() {
    let sb = Sandbox::new()
        .with_store_file("bashrc", "b")
        .with_store_file("vimrc", "v")
        .build();

    sb.cmd()
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 entries: 2 changed"));

    assert!(links_to(&sb.home().join("bashrc"), &sb.store().join("bashrc")));
    assert!(links_to(&sb.home().join("vimrc"), &sb.store().join("vimrc")));
}

#[test]
fn existing_file_is_backed_up_before_linking() {
    let sb = Sandbox::new()
        .with_store_file("bashrc", "from store")
        .with_home_file("bashrc", "original")
        .build();

    sb.cmd().arg("install").assert().success();

    assert!(links_to(&sb.home().join("bashrc"), &sb.store().join("bashrc")));
    assert_eq!(
        fs::read_to_string(sb.backups().join("bashrc")).unwrap(),
        "original"
    );
}

#[test]
fn override_redirects_destination() {
    let sb = Sandbox::new()
        .with_store_file("init.vim", "v")
        .with_override("init.vim", "~/.config/nvim/init.vim")
        .build();

    sb.cmd().arg("install").assert().success();

    let dest = sb.home().join(".config/nvim/init.vim");
    assert!(links_to(&dest, &sb.store().join("init.vim")));
    assert!(!sb.home().join("init.vim").exists());
}

#[test]
fn unmatched_override_is_a_warning() {
    let sb = Sandbox::new()
        .with_store_file("bashrc", "b")
        .with_override("zshrc", "~/.zshrc")
        .build();

    sb.cmd()
        .arg("install")
        .assert()
        .success()
        .stderr(predicate::str::contains("zshrc"));
}

#[test]
fn second_install_changes_nothing() {
    let sb = Sandbox::new().with_store_file("bashrc", "b").build();

    sb.cmd().arg("install").assert().success();
    let before = snapshot(&sb.home().join("store"));

    sb.cmd()
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 entries: 0 changed, 1 unchanged"));

    assert_eq!(snapshot(&sb.home().join("store")), before);
    assert!(!sb.backups().join("bashrc").exists());
}

#[test]
fn occupied_backup_slot_skips_entry() {
    let sb = Sandbox::new()
        .with_store_file("bashrc", "b")
        .with_home_file("bashrc", "current")
        .with_home_file(".dfman/backups/bashrc", "older")
        .build();

    sb.cmd()
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 skipped"));

    assert_eq!(
        fs::read_to_string(sb.home().join("bashrc")).unwrap(),
        "current"
    );
    assert_eq!(
        fs::read_to_string(sb.backups().join("bashrc")).unwrap(),
        "older"
    );
}

#[test]
fn no_parallel_install_links_every_entry() {
    let sb = Sandbox::new()
        .with_store_file("a", "a")
        .with_store_file("b", "b")
        .build();

    sb.cmd().args(["--no-parallel", "install"]).assert().success();

    assert!(links_to(&sb.home().join("a"), &sb.store().join("a")));
    assert!(links_to(&sb.home().join("b"), &sb.store().join("b")));
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

#[test]
fn dry_run_leaves_filesystem_untouched() {
    let sb = Sandbox::new()
        .with_store_file("bashrc", "b")
        .with_home_file("bashrc", "original")
        .build();
    let before = snapshot(&sb.home());

    sb.cmd()
        .args(["install", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 would change"));

    assert_eq!(snapshot(&sb.home()), before);
    assert!(!sb.home().join(".dfman").exists());
}

// ---------------------------------------------------------------------------
// Fatal errors
// ---------------------------------------------------------------------------

#[test]
fn missing_store_is_fatal() {
    let sb = Sandbox::new().build();
    fs::remove_dir(sb.store()).unwrap();

    sb.cmd()
        .arg("install")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("dotfile store not found"));
}

#[test]
fn malformed_config_is_fatal() {
    let sb = Sandbox::new();
    fs::write(sb.config_file(), "dotfile_path = /x\n").unwrap();

    sb.cmd()
        .arg("install")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot load configuration"));
}

// ---------------------------------------------------------------------------
// Config creation and --init
// ---------------------------------------------------------------------------

#[test]
fn missing_config_is_created_with_defaults() {
    let sb = Sandbox::new();
    fs::create_dir_all(sb.home().join(".dotfiles/files")).unwrap();

    sb.cmd().arg("install").assert().success();

    let text = fs::read_to_string(sb.config_file()).unwrap();
    assert!(text.contains("[Globals]"));
    assert!(text.contains("[Overrides]"));
}

#[test]
fn init_writes_config_with_store_path() {
    let sb = Sandbox::new().with_store_file("gitconfig", "g");

    sb.cmd()
        .arg("install")
        .arg("--init")
        .arg(sb.store())
        .assert()
        .success();

    let text = fs::read_to_string(sb.config_file()).unwrap();
    assert!(text.contains(&format!("dotfile_path = {}", sb.store().display())));
    // config_path stays at its default, ~/.config
    assert!(links_to(
        &sb.home().join(".config/gitconfig"),
        &sb.store().join("gitconfig")
    ));
}

#[test]
fn init_refuses_existing_config() {
    let sb = Sandbox::new().build();
    let before = fs::read_to_string(sb.config_file()).unwrap();

    sb.cmd()
        .arg("install")
        .arg("-i")
        .arg(sb.store())
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file already exists"));

    assert_eq!(fs::read_to_string(sb.config_file()).unwrap(), before);
}

// ---------------------------------------------------------------------------
// --add
// ---------------------------------------------------------------------------

#[test]
fn add_moves_file_into_store_and_links_it_back() {
    let sb = Sandbox::new()
        .with_home_file(".config/nvim/init.vim", "set nu")
        .build();
    let original = sb.home().join(".config/nvim/init.vim");

    sb.cmd()
        .arg("install")
        .arg("--add")
        .arg(&original)
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(sb.store().join("init.vim")).unwrap(),
        "set nu"
    );
    assert!(links_to(&original, &sb.store().join("init.vim")));
    let text = fs::read_to_string(sb.config_file()).unwrap();
    assert!(text.contains("init.vim = ~/.config/nvim/init.vim"));
}

#[test]
fn add_at_default_location_writes_no_override() {
    let sb = Sandbox::new().with_home_file(".bashrc", "b").build();
    let before = fs::read_to_string(sb.config_file()).unwrap();

    sb.cmd()
        .arg("install")
        .arg("-a")
        .arg(sb.home().join(".bashrc"))
        .assert()
        .success();

    assert_eq!(fs::read_to_string(sb.config_file()).unwrap(), before);
    assert!(links_to(&sb.home().join(".bashrc"), &sb.store().join(".bashrc")));
}

#[test]
fn add_missing_file_is_fatal() {
    let sb = Sandbox::new().build();

    sb.cmd()
        .args(["install", "--add"])
        .arg(sb.home().join("nope"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn add_in_dry_run_moves_nothing() {
    let sb = Sandbox::new().with_home_file(".config/x.conf", "x").build();
    let before = fs::read_to_string(sb.config_file()).unwrap();

    sb.cmd()
        .args(["install", "-d", "-a"])
        .arg(sb.home().join(".config/x.conf"))
        .assert()
        .success();

    assert!(!sb.store().join("x.conf").exists());
    assert_eq!(
        fs::read_to_string(sb.home().join(".config/x.conf")).unwrap(),
        "x"
    );
    assert_eq!(fs::read_to_string(sb.config_file()).unwrap(), before);
}
