// Shared helpers for integration tests.
//
// Provides a temporary home directory with a dotfile store and a config file
// pointing at it, plus a builder so each test can set up an isolated
// environment without repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// An isolated home directory backed by a [`tempfile::TempDir`].
///
/// Layout:
/// - `<home>/store/`          the dotfile store
/// - `<home>/dfman.conf`      config with `dotfile_path` and `config_path` set
/// - `<home>/.dfman/backups`  backup slots (created by the binary)
///
/// Destinations default to `<home>/<name>`.
pub struct Sandbox {
    /// Temporary directory used as `HOME`.
    pub root: tempfile::TempDir,
    overrides: Vec<(String, String)>,
    globals: Vec<(String, String)>,
}

impl Sandbox {
    /// Create a sandbox with an empty store and no config file yet.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        let home = dunce::canonicalize(root.path()).expect("canonicalize temp dir");
        fs::create_dir_all(home.join("store")).expect("create store");
        Self {
            root,
            overrides: Vec::new(),
            globals: Vec::new(),
        }
    }

    /// The sandbox home directory, canonicalized.
    pub fn home(&self) -> PathBuf {
        dunce::canonicalize(self.root.path()).expect("canonicalize temp dir")
    }

    /// The dotfile store.
    pub fn store(&self) -> PathBuf {
        self.home().join("store")
    }

    /// The config file passed with `-c`.
    pub fn config_file(&self) -> PathBuf {
        self.home().join("dfman.conf")
    }

    /// The backup directory.
    pub fn backups(&self) -> PathBuf {
        self.home().join(".dfman/backups")
    }

    /// Add a file to the store.
    pub fn with_store_file(self, name: &str, contents: &str) -> Self {
        let path = self.store().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create store subdir");
        }
        fs::write(path, contents).expect("write store file");
        self
    }

    /// Add a file at `<home>/<rel>`, as if the user already had one.
    pub fn with_home_file(self, rel: &str, contents: &str) -> Self {
        let path = self.home().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create home subdir");
        }
        fs::write(path, contents).expect("write home file");
        self
    }

    /// Add an `[Overrides]` entry.
    pub fn with_override(mut self, key: &str, value: &str) -> Self {
        self.overrides.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a `[Globals]` entry.
    pub fn with_global(mut self, key: &str, value: &str) -> Self {
        self.globals.push((key.to_string(), value.to_string()));
        self
    }

    /// Write the config file and return the finished sandbox.
    pub fn build(self) -> Self {
        let mut text = format!(
            "[Globals]\ndotfile_path = {}\nconfig_path = {}\n",
            self.store().display(),
            self.home().display()
        );
        for (k, v) in &self.globals {
            text.push_str(&format!("{k} = {v}\n"));
        }
        text.push_str("\n[Overrides]\n");
        for (k, v) in &self.overrides {
            text.push_str(&format!("{k} = {v}\n"));
        }
        fs::write(self.config_file(), text).expect("write config");
        self
    }

    /// A `dfman` command with `HOME` and `-c` pointing into the sandbox.
    pub fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("dfman").expect("dfman binary");
        cmd.env("HOME", self.home())
            .env_remove("DFMAN_CONFIG")
            .arg("-c")
            .arg(self.config_file());
        cmd
    }
}

/// Whether `dest` is a symlink resolving to `source`.
pub fn links_to(dest: &Path, source: &Path) -> bool {
    fs::symlink_metadata(dest).is_ok_and(|m| m.file_type().is_symlink())
        && dunce::canonicalize(dest).ok() == dunce::canonicalize(source).ok()
}

/// Every path under `root` with its contents (or link target), sorted.
pub fn snapshot(root: &Path) -> Vec<(PathBuf, String)> {
    let mut out = Vec::new();
    walk(root, &mut out);
    out.sort();
    out
}

fn walk(dir: &Path, out: &mut Vec<(PathBuf, String)>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let meta = fs::symlink_metadata(&path).expect("stat");
        if meta.file_type().is_symlink() {
            let target = fs::read_link(&path).expect("readlink");
            out.push((path, format!("-> {}", target.display())));
        } else if meta.is_dir() {
            out.push((path.clone(), "<dir>".to_string()));
            walk(&path, out);
        } else {
            let contents = fs::read_to_string(&path).unwrap_or_default();
            out.push((path, contents));
        }
    }
}
