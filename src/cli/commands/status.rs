//! Status command implementation.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{PidMarker, load_config};
use crate::error::Result;
use crate::sync::{ChangelogStore, ChangelogSummary};

/// Output for status command.
#[derive(Serialize)]
struct StatusOutput {
    changelog_dir: PathBuf,
    pid_file: PathBuf,
    pid: Option<u32>,
    files: Vec<ChangelogSummary>,
}

/// Execute status command.
///
/// Lists every file with a changelog and reports the PID recorded by a
/// running `codesync start`, if any. The PID is not checked for liveness.
///
/// # Errors
///
/// Returns an error if the config file is malformed or the changelog
/// directory cannot be traversed.
pub fn execute(
    changelog_dir: Option<&Path>,
    pid_file: Option<&Path>,
    config_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let changelog_dir = config.changelog_dir(changelog_dir);
    let pid_file = config.pid_file(pid_file);

    let files = ChangelogStore::new(&changelog_dir).list()?;
    let pid = PidMarker::read(&pid_file);

    if json {
        let output = StatusOutput {
            changelog_dir,
            pid_file,
            pid,
            files,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("codesync Status");
    println!("===============");
    println!();

    match pid {
        Some(pid) => println!("Sync process: running (pid {pid}, {})", pid_file.display()),
        None => println!("Sync process: not running"),
    }
    println!("Changelogs:   {}", changelog_dir.display());
    println!();

    if files.is_empty() {
        println!("No changes recorded yet.");
        println!();
        println!("Start syncing with: codesync start --dir <path>");
        return Ok(());
    }

    for summary in &files {
        println!(
            "  {:<40} {:>4} change(s)  last: {}",
            summary.filename,
            summary.entries,
            summary.last_change.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}
