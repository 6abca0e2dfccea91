//! Sync lifecycle: Idle until started, Running until stopped.
//!
//! [`SyncService::start`] consumes the idle service and returns a
//! [`RunningSync`]; [`RunningSync::stop`] signals the background loop and
//! waits a bounded time for the in-flight cycle to finish.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{PidMarker, SyncConfig};
use crate::error::{Error, Result};
use crate::remote::RemoteStore;

use super::changelog::ChangelogStore;
use super::scanner::Scanner;
use super::types::ScanStats;

/// Default bound on how long `stop` waits for the loop to exit.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Observable sync state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Idle,
    Running,
}

/// Shared running flag plus a wake-up for the inter-cycle sleep.
#[derive(Debug)]
pub struct Lifecycle {
    running: AtomicBool,
    wake: Notify,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// A lifecycle in the running state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            wake: Notify::new(),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        if self.is_running() {
            SyncState::Running
        } else {
            SyncState::Idle
        }
    }

    /// Clear the running flag and wake the loop if it is sleeping.
    ///
    /// Safe to call more than once.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        // notify_one stores a permit, so a stop that lands mid-scan still
        // cuts the following sleep short.
        self.wake.notify_one();
    }

    /// Sleep for `duration` or until a stop is requested.
    ///
    /// Returns `true` if the loop should keep going.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if !self.is_running() {
            return false;
        }
        tokio::select! {
            () = tokio::time::sleep(duration) => {}
            () = self.wake.notified() => {}
        }
        self.is_running()
    }
}

/// Outcome of [`RunningSync::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The loop exited within the timeout.
    Stopped,
    /// The loop was still busy when the timeout elapsed and was left to
    /// finish on its own.
    TimedOut,
}

/// An idle sync service, ready to start.
pub struct SyncService<S> {
    config: SyncConfig,
    store: Arc<S>,
}

impl<S: RemoteStore + 'static> SyncService<S> {
    pub fn new(config: SyncConfig, store: Arc<S>) -> Self {
        Self { config, store }
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// One-time setup: validate the config, create the changelog directory
    /// and resolve the remote folder.
    ///
    /// # Errors
    ///
    /// Any failure here is a configuration error; nothing has started yet.
    pub async fn prepare(&self) -> Result<Scanner<S>> {
        self.config.validate()?;

        ChangelogStore::new(&self.config.changelog_dir)
            .ensure_dir()
            .map_err(|e| {
                Error::Config(format!(
                    "Cannot create changelog directory {}: {e}",
                    self.config.changelog_dir.display()
                ))
            })?;

        let folder = self
            .store
            .ensure_folder(&self.config.folder_name)
            .await
            .map_err(|e| {
                Error::Config(format!(
                    "Cannot resolve remote folder '{}' on {}: {e}",
                    self.config.folder_name,
                    self.store.name()
                ))
            })?;
        info!(folder = %folder.name, id = %folder.id, store = self.store.name(), "Remote folder ready");

        Ok(Scanner::new(&self.config, Arc::clone(&self.store), folder))
    }

    /// Set up and run a single scan cycle in the foreground.
    ///
    /// # Errors
    ///
    /// Returns setup errors, or an error if the watch directory cannot be
    /// listed.
    pub async fn run_once(&self) -> Result<ScanStats> {
        let mut scanner = self.prepare().await?;
        Ok(scanner.scan().await?)
    }

    /// Transition Idle to Running.
    ///
    /// Performs setup, writes the PID marker and spawns the scan loop. Must
    /// be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns setup errors; the service never reaches Running in that case.
    pub async fn start(self) -> Result<RunningSync> {
        let scanner = self.prepare().await?;
        let pid = PidMarker::write(&self.config.pid_file)?;

        let lifecycle = Arc::new(Lifecycle::new());
        let worker = tokio::spawn(run_loop(scanner, Arc::clone(&lifecycle), self.config.interval));

        info!(
            dir = %self.config.watch_dir.display(),
            interval_secs = self.config.interval.as_secs(),
            "Sync started"
        );

        Ok(RunningSync {
            lifecycle,
            worker,
            pid: Some(pid),
        })
    }
}

/// A running sync loop.
pub struct RunningSync {
    lifecycle: Arc<Lifecycle>,
    worker: JoinHandle<()>,
    pid: Option<PidMarker>,
}

impl RunningSync {
    #[must_use]
    pub fn state(&self) -> SyncState {
        self.lifecycle.state()
    }

    /// Whether the loop task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Transition Running to Idle.
    ///
    /// Signals the loop and waits up to `timeout` for it to exit. An upload
    /// in flight is never interrupted. The PID marker is removed either way.
    ///
    /// # Errors
    ///
    /// Returns an error if the PID marker cannot be removed.
    pub async fn stop(mut self, timeout: Duration) -> Result<StopOutcome> {
        self.lifecycle.request_stop();

        let outcome = match tokio::time::timeout(timeout, &mut self.worker).await {
            Ok(Ok(())) => StopOutcome::Stopped,
            Ok(Err(e)) => {
                error!(error = %e, "Sync loop terminated abnormally");
                StopOutcome::Stopped
            }
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs_f64(), "Sync loop still busy, not waiting any longer");
                StopOutcome::TimedOut
            }
        };

        if let Some(pid) = self.pid.take() {
            pid.remove()?;
        }

        info!("Sync stopped");
        Ok(outcome)
    }
}

async fn run_loop<S: RemoteStore>(mut scanner: Scanner<S>, lifecycle: Arc<Lifecycle>, interval: Duration) {
    while lifecycle.is_running() {
        match scanner.scan().await {
            Ok(stats) if stats.is_idle() => debug!(scanned = stats.scanned, "No changes"),
            Ok(stats) => info!(
                scanned = stats.scanned,
                changed = stats.changed,
                uploaded = stats.uploaded,
                failed = stats.failed,
                "Scan complete"
            ),
            Err(e) => error!(error = %e, "Scan cycle failed"),
        }

        if !lifecycle.sleep(interval).await {
            break;
        }
    }
    debug!("Sync loop exited");
}
