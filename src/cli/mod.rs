use std::path::{Path, PathBuf};

use crate::status;
use crate::sync;

pub fn run_cli<I>(args: I) -> i32
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut root = PathBuf::from(".");
    let first = loop {
        match args.next() {
            Some(arg) if arg == "-C" => match args.next() {
                Some(dir) => root = PathBuf::from(dir),
                None => {
                    eprintln!("expected directory after -C");
                    return 1;
                }
            },
            Some(arg) if arg == "--version" => {
                print_version();
                return 0;
            }
            Some(arg) if arg == "-h" || arg == "--help" => {
                print_usage();
                return 0;
            }
            Some(arg) => break arg,
            None => {
                print_usage();
                return 1;
            }
        }
    };
    let rest: Vec<String> = args.collect();
    match first.as_str() {
        "sync" => cmd_sync(&root, rest),
        "status" => cmd_status(&root, rest),
        other if other.starts_with('-') => {
            eprintln!("unknown argument: {}", other);
            print_usage();
            1
        }
        _ => {
            let mut ids = vec![first];
            ids.extend(rest);
            cmd_sync(&root, ids)
        }
    }
}

fn cmd_sync(root: &Path, ids: Vec<String>) -> i32 {
    if ids.is_empty() {
        eprintln!("expected at least one submodule identifier");
        print_usage();
        return 1;
    }
    if let Some(bad) = ids.iter().find(|id| id.starts_with('-')) {
        eprintln!("unknown argument: {}", bad);
        print_usage();
        return 1;
    }
    match sync::fetch_dependencies(root, &ids) {
        Ok(report) => {
            eprintln!("sync OK ({} synchronized)", report.synced.len());
            0
        }
        Err(err) => {
            eprintln!("error: {:#}", err);
            1
        }
    }
}

fn cmd_status(root: &Path, rest: Vec<String>) -> i32 {
    let mut json = false;
    let mut filter = Vec::new();
    for arg in rest {
        if arg == "--json" {
            json = true;
        } else if arg.starts_with('-') {
            eprintln!("unknown argument: {}", arg);
            print_usage();
            return 1;
        } else {
            filter.push(arg);
        }
    }
    match status::collect_status(root, &filter) {
        Ok(statuses) => {
            if json {
                match status::render_json(&statuses) {
                    Ok(s) => println!("{}", s),
                    Err(err) => {
                        eprintln!("error: {:#}", err);
                        return 1;
                    }
                }
            } else {
                print!("{}", status::render_text(&statuses));
            }
            0
        }
        Err(err) => {
            eprintln!("error: {:#}", err);
            1
        }
    }
}

fn print_usage() {
    eprintln!("usage: depsync [-C <dir>] sync <submodule>...");
    eprintln!("   or: depsync [-C <dir>] status [--json] [<submodule>...]");
    eprintln!("   or: depsync <submodule>...");
}

fn print_version() {
    match option_env!("DEPSYNC_GIT_COMMIT") {
        Some(commit) => println!("depsync {} ({})", env!("CARGO_PKG_VERSION"), commit),
        None => println!("depsync {}", env!("CARGO_PKG_VERSION")),
    }
}
