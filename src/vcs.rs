// Purpose: Provide the checked git subprocess shim used by sync and status.
// Inputs/Outputs: Executes git commands and normalizes pin/revision information.
// Invariants: Every git exit status is inspected; failures carry the command and stderr.
// Gotchas: Pins are tags unless they look like a commit sha; the two fetch paths differ.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, bail};

pub fn git_program() -> String {
    std::env::var("DEPSYNC_GIT").unwrap_or_else(|_| "git".to_string())
}

fn run_git(args: &[&str], cwd: Option<&Path>) -> anyhow::Result<String> {
    let program = git_program();
    let mut cmd = Command::new(&program);
    cmd.args(args);
    if let Some(c) = cwd {
        cmd.current_dir(c);
    }
    log::debug!("{} {}", program, args.join(" "));
    let out = cmd
        .output()
        .with_context(|| format!("failed to execute {}", program))?;
    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        bail!("git {:?} failed: {}", args, stderr);
    }
    Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

fn path_str(p: &Path) -> anyhow::Result<&str> {
    p.to_str()
        .with_context(|| format!("non-utf8 path {}", p.display()))
}

pub fn looks_like_sha(s: &str) -> bool {
    let n = s.len();
    (7..=40).contains(&n) && s.bytes().all(|c| c.is_ascii_hexdigit())
}

pub fn is_git_checkout(dir: &Path) -> bool {
    dir.join(".git").exists()
}

pub fn head_commit(dir: &Path) -> anyhow::Result<String> {
    run_git(&["rev-parse", "HEAD"], Some(dir))
}

/// Resolve a pin to a commit using only local refs/objects. An error means
/// the pin is not yet reachable in this checkout.
pub fn local_commit_for(dir: &Path, pin: &str) -> anyhow::Result<String> {
    let rev = if looks_like_sha(pin) {
        format!("{}^{{commit}}", pin)
    } else {
        format!("refs/tags/{}^{{commit}}", pin)
    };
    run_git(&["rev-parse", &rev], Some(dir))
}

pub fn clone_at_pin(url: &str, dir: &Path, pin: &str) -> anyhow::Result<()> {
    let dst = path_str(dir)?;
    if looks_like_sha(pin) {
        // clone --branch only accepts branch/tag names; for a sha pin take the
        // default branch shallowly, then deepen onto the pin.
        run_git(&["clone", "--depth", "1", url, dst], None)?;
        if local_commit_for(dir, pin).is_err() {
            fetch_pin(dir, pin)?;
        }
        checkout_pin(dir, pin)?;
        return Ok(());
    }
    run_git(&["clone", "--depth", "1", "--branch", pin, url, dst], None)?;
    Ok(())
}

pub fn fetch_pin(dir: &Path, pin: &str) -> anyhow::Result<()> {
    if looks_like_sha(pin) {
        run_git(&["fetch", "--depth", "1", "origin", pin], Some(dir))?;
    } else {
        run_git(&["fetch", "--depth", "1", "origin", "tag", pin], Some(dir))?;
    }
    Ok(())
}

pub fn checkout_pin(dir: &Path, pin: &str) -> anyhow::Result<()> {
    run_git(&["checkout", "--quiet", pin], Some(dir))?;
    Ok(())
}
