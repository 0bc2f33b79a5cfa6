//! Build script: embeds the crate version from `DFMAN_VERSION` or `git describe`.

use std::process::Command;

fn main() {
    // DFMAN_VERSION wins when set (release builds); otherwise ask git.
    if let Ok(version) = std::env::var("DFMAN_VERSION") {
        println!("cargo:rustc-env=DFMAN_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=DFMAN_VERSION={version}");
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-env-changed=DFMAN_VERSION");
}
