use std::process::Command;

// Stamp the building commit into the binary for `depsync --version`.
// DEPSYNC_GIT_COMMIT overrides the probe for reproducible/packaged builds.
fn main() {
    println!("cargo:rerun-if-env-changed=DEPSYNC_GIT_COMMIT");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let commit = std::env::var("DEPSYNC_GIT_COMMIT")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(probe_commit);
    if let Some(commit) = commit {
        println!("cargo:rustc-env=DEPSYNC_GIT_COMMIT={commit}");
    }
}

fn probe_commit() -> Option<String> {
    let out = Command::new("git")
        .args(["rev-parse", "--short=12", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let mut commit = String::from_utf8_lossy(&out.stdout).trim().to_string();
    if commit.is_empty() {
        return None;
    }
    let clean = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .map(|o| o.status.success() && o.stdout.is_empty())
        .unwrap_or(true);
    if !clean {
        commit.push_str("-dirty");
    }
    Some(commit)
}
