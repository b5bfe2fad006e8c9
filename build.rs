//! Stamps the release version and commit shown on the overlay.

use std::env;
use std::process::Command;

fn main() {
    for key in ["SPLIT_HUD_VERSION", "SPLIT_HUD_COMMIT"] {
        println!("cargo:rerun-if-env-changed={key}");
    }
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");

    // Release tooling may inject both; local builds use Cargo.toml and git.
    let version = env::var("SPLIT_HUD_VERSION")
        .or_else(|_| env::var("CARGO_PKG_VERSION"))
        .unwrap_or_default();
    let commit = env::var("SPLIT_HUD_COMMIT")
        .ok()
        .or_else(git_short_hash)
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=SPLIT_HUD_VERSION={version}");
    println!("cargo:rustc-env=SPLIT_HUD_COMMIT={commit}");
}

/// Short hash of HEAD, or `None` outside a git checkout.
fn git_short_hash() -> Option<String> {
    let out = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let hash = String::from_utf8(out.stdout).ok()?;
    let hash = hash.trim();
    (!hash.is_empty()).then(|| hash.to_string())
}
