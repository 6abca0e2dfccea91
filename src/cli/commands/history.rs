//! History command implementation.

use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use crate::config::load_config;
use crate::error::Result;
use crate::sync::{ChangelogEntry, ChangelogStore};

#[derive(Serialize)]
struct HistoryOutput<'a> {
    file: &'a str,
    total: usize,
    entries: &'a [ChangelogEntry],
}

/// Execute the history command.
///
/// Entries are printed oldest first; `limit` keeps only the newest ones.
///
/// # Errors
///
/// Returns an error if the filename is not a valid relative path or the
/// changelog cannot be read.
pub fn execute(
    file: &str,
    limit: Option<usize>,
    changelog_dir: Option<&Path>,
    config_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let store = ChangelogStore::new(config.changelog_dir(changelog_dir));

    let entries = store.read(file)?;
    let shown = match limit {
        Some(n) if n < entries.len() => &entries[entries.len() - n..],
        _ => &entries[..],
    };

    if json {
        let output = HistoryOutput {
            file,
            total: entries.len(),
            entries: shown,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No history for {file}");
        return Ok(());
    }

    println!("{} ({} change(s))", file.bold(), entries.len());
    for entry in shown {
        println!();
        println!("{}", entry.timestamp.cyan().bold());
        print_diff(&entry.changes);
    }

    Ok(())
}

fn print_diff(changes: &str) {
    for line in changes.lines() {
        if line.starts_with("+++") || line.starts_with("---") {
            println!("{}", line.bold());
        } else if line.starts_with("@@") {
            println!("{}", line.cyan());
        } else if line.starts_with('+') {
            println!("{}", line.green());
        } else if line.starts_with('-') {
            println!("{}", line.red());
        } else {
            println!("{line}");
        }
    }
}
