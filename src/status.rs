// Purpose: Read-only classification of declared submodules against their pins.
// Inputs/Outputs: Walks DEPS manifests and reports Missing/AtPin/Diverged/Overridden per dep.
// Invariants: Never mutates a checkout and never fetches; local refs only.
// Gotchas: Diverged covers both "wrong commit" and "pin not reachable locally".

use std::path::Path;

use serde::Serialize;

use crate::manifest::eval::{DepEntry, DepsTable};
use crate::sync::{self, DEPS_FILE};
use crate::vcs;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DepState {
    Missing,
    AtPin,
    Diverged { head: String },
    Overridden,
}

#[derive(Clone, Debug, Serialize)]
pub struct DepStatus {
    pub path: String,
    pub url: String,
    pub pin: String,
    #[serde(flatten)]
    pub state: DepState,
}

/// Classify every declared submodule under `root`, or only those selected by
/// `filter` when it is non-empty. Recurses into checkouts that carry their
/// own manifest.
pub fn collect_status(root: &Path, filter: &[String]) -> anyhow::Result<Vec<DepStatus>> {
    let mut out = Vec::new();
    if root.join(DEPS_FILE).exists() {
        status_dir(root, "", filter, &mut out)?;
    }
    Ok(out)
}

fn status_dir(
    root: &Path,
    prefix: &str,
    filter: &[String],
    out: &mut Vec<DepStatus>,
) -> anyhow::Result<()> {
    let table = DepsTable::load(&root.join(DEPS_FILE))?;
    for (name, entry) in &table.deps {
        let selected = filter.is_empty()
            || filter
                .iter()
                .any(|r| r == name || sync::is_nested_under(r, name));
        if !selected {
            continue;
        }
        let label = sync::join_id(prefix, name);
        let dir = root.join(sync::safe_rel_path(name)?);
        let state = classify(&dir, entry)?;
        out.push(DepStatus {
            path: label.clone(),
            url: entry.url.clone(),
            pin: entry.pin.clone(),
            state,
        });
        let nested = sync::nested_subset(filter, name);
        if dir.join(DEPS_FILE).exists() && (filter.is_empty() || !nested.is_empty()) {
            status_dir(&dir, &label, &nested, out)?;
        }
    }
    Ok(())
}

fn classify(dir: &Path, entry: &DepEntry) -> anyhow::Result<DepState> {
    if !dir.exists() {
        return Ok(DepState::Missing);
    }
    if !vcs::is_git_checkout(dir) {
        return Ok(DepState::Overridden);
    }
    let head = vcs::head_commit(dir)?;
    match vcs::local_commit_for(dir, &entry.pin) {
        Ok(pinned) if pinned == head => Ok(DepState::AtPin),
        _ => Ok(DepState::Diverged {
            head: head[..12.min(head.len())].to_string(),
        }),
    }
}

pub fn render_text(statuses: &[DepStatus]) -> String {
    if statuses.is_empty() {
        return "  (none)\n".to_string();
    }
    let mut out = String::new();
    for s in statuses {
        let state = match &s.state {
            DepState::Missing => "missing".to_string(),
            DepState::AtPin => "at pin".to_string(),
            DepState::Diverged { head } => format!("diverged (HEAD {})", head),
            DepState::Overridden => "overridden locally".to_string(),
        };
        out.push_str(&format!("  {} @ {} ({}) -> {}\n", s.path, s.pin, s.url, state));
    }
    out
}

pub fn render_json(statuses: &[DepStatus]) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(statuses)?)
}

#[cfg(test)]
mod tests {
    use super::{DepState, collect_status, render_json, render_text};
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time drift")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "depsync-{}-{}-{}",
            prefix,
            std::process::id(),
            nonce
        ))
    }

    fn write_manifest(root: &Path) {
        fs::create_dir_all(root).expect("create root");
        fs::write(
            root.join("DEPS"),
            "deps = {\n  'absent/dep': 'https://example.org/a.git@v1',\n  'vendored/dep': 'https://example.org/b.git@v2',\n}\n",
        )
        .expect("write DEPS");
        fs::create_dir_all(root.join("vendored").join("dep")).expect("create override");
    }

    #[test]
    fn classifies_missing_and_overridden_without_touching_git() {
        let root = temp_dir("status-basic");
        write_manifest(&root);

        let statuses = collect_status(&root, &[]).expect("status");
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].path, "absent/dep");
        assert_eq!(statuses[0].state, DepState::Missing);
        assert_eq!(statuses[1].path, "vendored/dep");
        assert_eq!(statuses[1].state, DepState::Overridden);

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn filter_narrows_the_report() {
        let root = temp_dir("status-filter");
        write_manifest(&root);

        let filter = vec!["vendored/dep".to_string()];
        let statuses = collect_status(&root, &filter).expect("status");
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].path, "vendored/dep");

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn renders_text_and_json_shapes() {
        let root = temp_dir("status-render");
        write_manifest(&root);

        let statuses = collect_status(&root, &[]).expect("status");
        let text = render_text(&statuses);
        assert!(text.contains("absent/dep @ v1"), "got: {text}");
        assert!(text.contains("-> missing"), "got: {text}");

        let json = render_json(&statuses).expect("json");
        assert!(json.contains("\"state\": \"overridden\""), "got: {json}");
        assert!(json.contains("\"pin\": \"v1\""), "got: {json}");

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn classifies_at_pin_and_diverged_against_a_real_checkout() {
        use std::process::Command;

        if Command::new("git").arg("--version").output().is_err() {
            return;
        }
        let run = |args: &[&str], cwd: &Path| {
            let out = Command::new("git")
                .args(args)
                .current_dir(cwd)
                .output()
                .expect("spawn git");
            assert!(
                out.status.success(),
                "git {:?} failed: {}",
                args,
                String::from_utf8_lossy(&out.stderr)
            );
        };
        let origin = temp_dir("status-origin");
        fs::create_dir_all(&origin).expect("create origin");
        run(&["init", "-q"], &origin);
        run(&["config", "user.email", "dev@example.invalid"], &origin);
        run(&["config", "user.name", "depsync tests"], &origin);
        fs::write(origin.join("seed.txt"), "1").expect("write seed");
        run(&["add", "."], &origin);
        run(&["commit", "-q", "-m", "first"], &origin);
        run(&["tag", "v1"], &origin);
        fs::write(origin.join("seed.txt"), "2").expect("rewrite seed");
        run(&["add", "."], &origin);
        run(&["commit", "-q", "-m", "second"], &origin);
        run(&["tag", "v2"], &origin);

        let root = temp_dir("status-git");
        fs::create_dir_all(&root).expect("create root");
        let deps = |pin: &str| {
            format!(
                "deps = {{\n  'alpha': 'file://{}@{}',\n}}\n",
                origin.to_string_lossy().replace('\\', "/"),
                pin
            )
        };
        fs::write(root.join("DEPS"), deps("v1")).expect("write DEPS");
        crate::sync::fetch_dependencies(&root, &["alpha".to_string()]).expect("sync");

        let statuses = collect_status(&root, &[]).expect("status at pin");
        assert_eq!(statuses[0].state, DepState::AtPin);

        // v2 was never fetched into the shallow clone.
        fs::write(root.join("DEPS"), deps("v2")).expect("repin DEPS");
        let statuses = collect_status(&root, &[]).expect("status diverged");
        match &statuses[0].state {
            DepState::Diverged { head } => assert_eq!(head.len(), 12),
            other => panic!("expected diverged, got {:?}", other),
        }

        let _ = fs::remove_dir_all(origin);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn missing_manifest_reports_nothing() {
        let root = temp_dir("status-empty");
        fs::create_dir_all(&root).expect("create root");
        let statuses = collect_status(&root, &[]).expect("status");
        assert!(statuses.is_empty());
        assert_eq!(render_text(&statuses), "  (none)\n");

        let _ = fs::remove_dir_all(root);
    }
}
