//! Start command implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::StartArgs;
use crate::config::{
    ConfigFile, DEFAULT_FILE_TYPES, DEFAULT_FOLDER_NAME, DEFAULT_INTERVAL_SECS, SyncConfig,
    default_mirror_dir, load_config, parse_extensions,
};
use crate::error::{Error, Result};
use crate::remote::{AnyStore, HttpStore, LocalMirror, RemoteKind, RemoteStore};
use crate::sync::{STOP_TIMEOUT, ScanStats, StopOutcome, SyncService};

#[derive(Serialize)]
struct OnceOutput<'a> {
    watch_dir: &'a Path,
    folder: &'a str,
    #[serde(flatten)]
    stats: ScanStats,
}

#[derive(Serialize)]
struct StopOutput {
    state: &'static str,
    timed_out: bool,
}

/// Execute the start command.
///
/// # Errors
///
/// Returns configuration errors before anything starts, or an error if the
/// process is interrupted a second time while shutting down.
pub fn execute(args: &StartArgs, config_path: Option<&Path>, json: bool) -> Result<()> {
    let file = load_config(config_path)?;
    let config = resolve_config(args, &file)?;
    let store = Arc::new(resolve_store(args, &file)?);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))?;

    rt.block_on(async {
        if args.once {
            run_once(config, store, json).await
        } else {
            run_until_signal(config, store, json).await
        }
    })
}

async fn run_once(config: SyncConfig, store: Arc<AnyStore>, json: bool) -> Result<()> {
    let service = SyncService::new(config, store);
    let stats = service.run_once().await?;

    if json {
        let output = OnceOutput {
            watch_dir: &service.config().watch_dir,
            folder: &service.config().folder_name,
            stats,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!(
            "Scanned {} file(s): {} changed, {} uploaded, {} failed",
            stats.scanned,
            stats.changed,
            stats.uploaded,
            if stats.failed > 0 {
                stats.failed.to_string().red().to_string()
            } else {
                stats.failed.to_string()
            }
        );
    }

    Ok(())
}

async fn run_until_signal(config: SyncConfig, store: Arc<AnyStore>, json: bool) -> Result<()> {
    let watch_dir = config.watch_dir.clone();
    let folder = config.folder_name.clone();
    let extensions = config.extensions.join(", ");
    let interval = config.interval;
    let store_name = store.name();

    let running = SyncService::new(config, store).start().await?;

    if !json {
        println!("{}", "codesync running".green().bold());
        println!("  Watching: {} ({extensions})", watch_dir.display());
        println!("  Remote:   {folder} via {store_name}");
        println!("  Interval: {}s", interval.as_secs());
        println!("{}", "Press Ctrl+C to stop.".dimmed());
    }

    shutdown_signal().await;
    info!("Shutdown requested");
    if !json {
        println!("Stopping... (press Ctrl+C again to force quit)");
    }

    let outcome = tokio::select! {
        outcome = running.stop(STOP_TIMEOUT) => outcome?,
        () = shutdown_signal() => {
            warn!("Second signal received, exiting without waiting");
            return Err(Error::Interrupted);
        }
    };

    if json {
        let output = StopOutput {
            state: "idle",
            timed_out: outcome == StopOutcome::TimedOut,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if outcome == StopOutcome::TimedOut {
        println!("{}", "Stopped (a scan was still in progress)".yellow());
    } else {
        println!("Stopped.");
    }

    Ok(())
}

/// Wait for Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

/// Resolve the run settings: flag or environment, then config file, then
/// defaults.
///
/// # Errors
///
/// Returns an error if no usable file extension remains.
pub fn resolve_config(args: &StartArgs, file: &ConfigFile) -> Result<SyncConfig> {
    let defaults = SyncConfig::default();

    let watch_dir = args
        .dir
        .clone()
        .or_else(|| file.watch_dir.clone())
        .unwrap_or(defaults.watch_dir);

    let file_types = args
        .file_types
        .as_deref()
        .or(file.file_types.as_deref())
        .unwrap_or(DEFAULT_FILE_TYPES);

    let interval_secs = args.interval.or(file.interval_secs).unwrap_or(DEFAULT_INTERVAL_SECS);

    let folder_name = args
        .folder_name
        .clone()
        .or_else(|| file.folder_name.clone())
        .unwrap_or_else(|| DEFAULT_FOLDER_NAME.to_string());

    let config = SyncConfig {
        watch_dir,
        extensions: parse_extensions(file_types),
        interval: Duration::from_secs(interval_secs),
        changelog_dir: file.changelog_dir(args.changelog_dir.as_deref()),
        folder_name,
        recursive: args.recursive || file.recursive.unwrap_or(false),
        pid_file: file.pid_file(args.pid_file.as_deref()),
    };

    if config.extensions.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "no usable file extension in '{file_types}'"
        )));
    }

    Ok(config)
}

/// Build the remote store from flags and the config file.
///
/// # Errors
///
/// Returns a configuration error if the HTTP store has no endpoint or the
/// local mirror has no root directory.
pub fn resolve_store(args: &StartArgs, file: &ConfigFile) -> Result<AnyStore> {
    let remote = file.remote.clone().unwrap_or_default();
    let kind = args.remote.or(remote.kind).unwrap_or_default();

    match kind {
        RemoteKind::Local => {
            let root: PathBuf = args
                .mirror_dir
                .clone()
                .or(remote.mirror_dir)
                .or_else(default_mirror_dir)
                .ok_or_else(|| {
                    Error::Config(
                        "Cannot determine home directory for the local mirror; pass --mirror-dir"
                            .to_string(),
                    )
                })?;
            Ok(AnyStore::Local(LocalMirror::new(root)))
        }
        RemoteKind::Http => {
            let url = args.remote_url.clone().or(remote.url).ok_or_else(|| {
                Error::Config("HTTP remote endpoint is not configured".to_string())
            })?;
            let token = args.remote_token.clone().or(remote.token);
            Ok(AnyStore::Http(HttpStore::new(&url, token)?))
        }
    }
}
