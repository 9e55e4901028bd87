// Purpose: Materialize requested submodules from DEPS manifests, recursively.
// Inputs/Outputs: Walks a source tree, shallow-clones/updates pinned checkouts in place.
// Invariants: A manifest is fully evaluated before any git operation it triggers.
// Gotchas: Local overrides (non-git dirs) are never touched, but recursion still enters them.

use std::fs::{self, File, OpenOptions};
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, bail};
use fs2::FileExt;

use crate::manifest::eval::{DepEntry, DepsTable};
use crate::manifest::suggest;
use crate::vcs;

pub const DEPS_FILE: &str = "DEPS";
const LOCK_FILE: &str = ".depsync.lock";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Cloned,
    UpToDate,
    Updated,
    Overridden,
}

#[derive(Clone, Debug)]
pub struct SyncedDep {
    pub path: String,
    pub url: String,
    pub pin: String,
    pub action: Action,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub synced: Vec<SyncedDep>,
    pub unmatched: Vec<String>,
}

pub struct SyncLock {
    _file: File,
}

impl SyncLock {
    pub fn acquire(root: &Path) -> anyhow::Result<Self> {
        let lock_path = root.join(LOCK_FILE);
        let f = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("open {}", lock_path.display()))?;
        f.lock_exclusive()?;
        Ok(Self { _file: f })
    }
}

// Build-log integration: progress lines carry this prefix on stdout.
fn note(msg: &str) {
    println!("-- -- {}", msg);
}

/// Synchronize the requested submodules declared by `root/DEPS`, recursing
/// into nested manifests. A missing top-level manifest declares nothing and
/// yields an empty report.
pub fn fetch_dependencies(root: &Path, required: &[String]) -> anyhow::Result<SyncReport> {
    let mut report = SyncReport::default();
    if !root.join(DEPS_FILE).exists() {
        return Ok(report);
    }
    let _guard = SyncLock::acquire(root)?;
    sync_dir(root, "", required, &mut report)?;
    Ok(report)
}

fn sync_dir(
    root: &Path,
    prefix: &str,
    required: &[String],
    report: &mut SyncReport,
) -> anyhow::Result<()> {
    let deps_path = root.join(DEPS_FILE);
    if !deps_path.exists() {
        for r in required {
            let full = join_id(prefix, r);
            eprintln!(
                "warning: {} requested but {} declares no dependencies",
                full,
                root.display()
            );
            report.unmatched.push(full);
        }
        return Ok(());
    }
    let table = DepsTable::load(&deps_path)?;
    for key in table.deps.keys() {
        safe_rel_path(key)
            .with_context(|| format!("in {}", deps_path.display()))?;
    }

    for (name, entry) in &table.deps {
        if !required
            .iter()
            .any(|r| r == name || is_nested_under(r, name))
        {
            continue;
        }
        let label = join_id(prefix, name);
        let dir = root.join(safe_rel_path(name)?);
        let action = sync_one(&dir, &label, entry)?;
        report.synced.push(SyncedDep {
            path: label.clone(),
            url: entry.url.clone(),
            pin: entry.pin.clone(),
            action,
        });
        let nested = nested_subset(required, name);
        if !nested.is_empty() && dir.exists() {
            sync_dir(&dir, &label, &nested, report)?;
        }
    }

    for r in required {
        if table
            .deps
            .keys()
            .any(|k| r == k || is_nested_under(r, k))
        {
            continue;
        }
        let full = join_id(prefix, r);
        match suggest::did_you_mean(r, table.deps.keys().cloned()) {
            Some(hint) => eprintln!(
                "warning: {} is not declared in {}; {}",
                full,
                deps_path.display(),
                hint
            ),
            None => eprintln!(
                "warning: {} is not declared in {}",
                full,
                deps_path.display()
            ),
        }
        report.unmatched.push(full);
    }
    Ok(())
}

fn sync_one(dir: &Path, label: &str, entry: &DepEntry) -> anyhow::Result<Action> {
    if !dir.exists() {
        if let Some(parent) = dir.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        note(&format!("cloning {} at {}", label, entry.pin));
        vcs::clone_at_pin(&entry.url, dir, &entry.pin)
            .with_context(|| format!("clone {}", label))?;
        return Ok(Action::Cloned);
    }
    if !vcs::is_git_checkout(dir) {
        note(&format!("{} overridden locally, leaving untouched", label));
        return Ok(Action::Overridden);
    }
    let head = vcs::head_commit(dir)?;
    match vcs::local_commit_for(dir, &entry.pin) {
        Ok(pinned) if pinned == head => {
            note(&format!("{} already at {}", label, entry.pin));
            Ok(Action::UpToDate)
        }
        Ok(_) => {
            // Pin is reachable locally; a checkout is enough.
            note(&format!("checking out {} at {}", label, entry.pin));
            vcs::checkout_pin(dir, &entry.pin)
                .with_context(|| format!("checkout {}", label))?;
            Ok(Action::Updated)
        }
        Err(_) => {
            note(&format!("updating {} to {}", label, entry.pin));
            vcs::fetch_pin(dir, &entry.pin)
                .with_context(|| format!("fetch {}", label))?;
            vcs::checkout_pin(dir, &entry.pin)
                .with_context(|| format!("checkout {}", label))?;
            Ok(Action::Updated)
        }
    }
}

pub fn nested_subset(required: &[String], name: &str) -> Vec<String> {
    required
        .iter()
        .filter_map(|r| {
            r.strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('/'))
                .map(str::to_string)
        })
        .filter(|rest| !rest.is_empty())
        .collect()
}

pub(crate) fn is_nested_under(id: &str, name: &str) -> bool {
    id.strip_prefix(name)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

pub(crate) fn join_id(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

pub fn safe_rel_path(key: &str) -> anyhow::Result<PathBuf> {
    let mut out = PathBuf::new();
    for c in Path::new(key).components() {
        match c {
            Component::Normal(seg) => out.push(seg),
            Component::CurDir => {}
            Component::Prefix(_) | Component::RootDir | Component::ParentDir => {
                bail!("unsafe submodule path `{}`", key)
            }
        }
    }
    if out.as_os_str().is_empty() {
        bail!("empty submodule path");
    }
    Ok(out)
}
