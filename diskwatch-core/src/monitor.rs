//! Poll/diff/notify loop.
//!
//! One initial scan seeds the tracker with every folder's existing names,
//! then each cycle lists every folder, diffs against the tracker and sends
//! one notification per new name. Failures are handled at the narrowest
//! scope that keeps the loop moving:
//!
//! - a failed listing skips that folder until the next cycle
//! - a failed notification leaves the name unmarked so the next cycle
//!   offers it again
//! - anything else escaping a cycle (including a panic) aborts the rest of
//!   that cycle and the loop waits out the extended cooldown

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{MonitorError, Result, StorageError};
use crate::notifier::{NewFileEvent, NotificationSink, ParseMode};
use crate::storage::StorageBackend;
use crate::tracker::FolderTracker;

/// Smallest multiple of the poll interval used as the post-error cooldown.
pub const MIN_COOLDOWN_FACTOR: u32 = 5;

/// Configuration for the folder monitor
#[derive(Debug, Clone)]
pub struct FolderMonitorConfig {
    /// Folders to poll, in processing order
    pub folders: Vec<String>,
    /// Chat or channel that receives notifications
    pub destination: String,
    /// Wait between the end of one cycle and the start of the next
    pub poll_interval: Duration,
    /// Cooldown after an aborted cycle, as a multiple of `poll_interval`
    pub cooldown_factor: u32,
}

impl Default for FolderMonitorConfig {
    fn default() -> Self {
        Self {
            folders: vec!["/".to_string()],
            destination: String::new(),
            poll_interval: Duration::from_secs(120),
            cooldown_factor: MIN_COOLDOWN_FACTOR,
        }
    }
}

impl FolderMonitorConfig {
    pub fn new(folders: Vec<String>, destination: impl Into<String>) -> Self {
        Self {
            folders,
            destination: destination.into(),
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_cooldown_factor(mut self, factor: u32) -> Self {
        self.cooldown_factor = factor;
        self
    }

    /// Wait applied after a cycle is aborted by an unexpected error.
    pub fn cooldown(&self) -> Duration {
        self.poll_interval
            .saturating_mul(self.cooldown_factor.max(MIN_COOLDOWN_FACTOR))
    }
}

/// What happened to one folder during a scan or cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderOutcome {
    /// Folder became tracked; its existing names were recorded silently.
    Seeded { existing: usize },
    /// Folder was listed and diffed.
    Polled {
        new: usize,
        notified: usize,
        failed: usize,
    },
    /// Listing failed; the folder is retried next cycle.
    FetchFailed { not_found: bool },
}

/// Per-folder results of a completed scan or cycle, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub folders: Vec<(String, FolderOutcome)>,
}

impl CycleReport {
    pub fn outcome(&self, folder: &str) -> Option<FolderOutcome> {
        self.folders
            .iter()
            .find(|(name, _)| name == folder)
            .map(|(_, outcome)| *outcome)
    }

    pub fn notified(&self) -> usize {
        self.folders
            .iter()
            .map(|(_, outcome)| match outcome {
                FolderOutcome::Polled { notified, .. } => *notified,
                _ => 0,
            })
            .sum()
    }

    pub fn failed_notifications(&self) -> usize {
        self.folders
            .iter()
            .map(|(_, outcome)| match outcome {
                FolderOutcome::Polled { failed, .. } => *failed,
                _ => 0,
            })
            .sum()
    }

    pub fn fetch_failures(&self) -> usize {
        self.folders
            .iter()
            .filter(|(_, outcome)| {
                matches!(outcome, FolderOutcome::FetchFailed { .. })
            })
            .count()
    }
}

/// Polls remote folders and announces new files.
pub struct FolderMonitor {
    config: FolderMonitorConfig,
    storage: Arc<dyn StorageBackend>,
    sink: Arc<dyn NotificationSink>,
    tracker: FolderTracker,
}

impl fmt::Debug for FolderMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FolderMonitor")
            .field("config", &self.config)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

impl FolderMonitor {
    pub fn new(
        config: FolderMonitorConfig,
        storage: Arc<dyn StorageBackend>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            config,
            storage,
            sink,
            tracker: FolderTracker::new(),
        }
    }

    pub fn config(&self) -> &FolderMonitorConfig {
        &self.config
    }

    pub fn tracker(&self) -> &FolderTracker {
        &self.tracker
    }

    /// Run until `shutdown` is cancelled. Cancellation is only observed while
    /// waiting between cycles, so a cycle always runs to completion.
    pub async fn run(mut self, shutdown: CancellationToken) {
        self.initial_scan().await;

        loop {
            let wait = match self.run_cycle_guarded().await {
                Ok(report) => {
                    debug!(
                        notified = report.notified(),
                        failed_notifications = report.failed_notifications(),
                        fetch_failures = report.fetch_failures(),
                        "Check cycle complete. Waiting for {} seconds.",
                        self.config.poll_interval.as_secs()
                    );
                    self.config.poll_interval
                }
                Err(err) => {
                    let cooldown = self.config.cooldown();
                    error!("Unexpected error in monitor cycle: {}", err);
                    info!(
                        "Waiting for a longer period ({}s) before retrying...",
                        cooldown.as_secs()
                    );
                    cooldown
                }
            };

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Folder monitor shutting down");
                    break;
                }
                _ = sleep(wait) => {}
            }
        }
    }

    /// Initial scan followed by a single cycle.
    pub async fn run_once(&mut self) -> Result<CycleReport> {
        self.initial_scan().await;
        self.run_cycle_guarded().await
    }

    /// Seed the tracker with every folder that can be listed right now.
    /// Nothing is announced; folders that fail (or whose listing panics)
    /// stay untracked and are retried by later cycles.
    pub async fn initial_scan(&mut self) -> CycleReport {
        let folders = self.config.folders.clone();
        info!(
            "Performing initial scan for folders: {}",
            folders.join(", ")
        );

        let mut report = CycleReport::default();
        for folder in folders {
            let fetched =
                AssertUnwindSafe(self.fetch_names(&folder)).catch_unwind().await;
            let outcome = match fetched {
                Ok(Ok(names)) => {
                    let existing = names.len();
                    self.tracker.initialize(&folder, names);
                    info!("-> Found {} existing files in '{}'.", existing, folder);
                    FolderOutcome::Seeded { existing }
                }
                Ok(Err(err)) => FolderOutcome::FetchFailed {
                    not_found: err.is_not_found(),
                },
                Err(payload) => {
                    error!(
                        folder = %folder,
                        "Unexpected error during initial scan of '{}': {}",
                        folder,
                        panic_message(payload)
                    );
                    FolderOutcome::FetchFailed { not_found: false }
                }
            };
            report.folders.push((folder, outcome));
        }

        info!(
            tracked = self.tracker.tracked_folders(),
            "Initial scan complete. Monitoring for new files..."
        );
        report
    }

    /// One cycle with panics converted into [`MonitorError::Panicked`].
    pub async fn run_cycle_guarded(&mut self) -> Result<CycleReport> {
        match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(MonitorError::Panicked(panic_message(payload))),
        }
    }

    /// Process every configured folder once, in order. Listing and delivery
    /// failures are absorbed here; an `Err` means the cycle was abandoned
    /// part-way and whatever it already did stands.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        debug!("Checking for new files across all monitored folders...");

        let folders = self.config.folders.clone();
        let mut report = CycleReport::default();
        for folder in folders {
            let outcome = self.process_folder(&folder).await?;
            report.folders.push((folder, outcome));
        }
        Ok(report)
    }

    async fn process_folder(&mut self, folder: &str) -> Result<FolderOutcome> {
        if !self.tracker.is_tracked(folder) {
            return Ok(match self.fetch_names(folder).await {
                Ok(names) => {
                    let existing = names.len();
                    self.tracker.initialize(folder, names);
                    info!(
                        existing,
                        "Successfully initialized previously missing folder '{}'.",
                        folder
                    );
                    FolderOutcome::Seeded { existing }
                }
                Err(err) => FolderOutcome::FetchFailed {
                    not_found: err.is_not_found(),
                },
            });
        }

        let current = match self.fetch_names(folder).await {
            Ok(names) => names,
            Err(err) => {
                return Ok(FolderOutcome::FetchFailed {
                    not_found: err.is_not_found(),
                });
            }
        };

        let new_files = self.tracker.diff(folder, &current)?;
        if new_files.is_empty() {
            return Ok(FolderOutcome::Polled {
                new: 0,
                notified: 0,
                failed: 0,
            });
        }

        info!(
            "Found {} new file(s) in '{}': {}",
            new_files.len(),
            folder,
            new_files.join(", ")
        );

        let mut notified = 0;
        let mut failed = 0;
        for name in &new_files {
            let event = NewFileEvent::new(folder, name);
            match self
                .sink
                .send(&self.config.destination, &event.to_html(), ParseMode::Html)
                .await
            {
                Ok(()) => {
                    self.tracker.mark_notified(folder, name)?;
                    notified += 1;
                }
                Err(err) => {
                    failed += 1;
                    warn!(
                        folder = %folder,
                        file = %name,
                        error = %err,
                        "Failed to send notification; will retry next cycle"
                    );
                }
            }
        }

        Ok(FolderOutcome::Polled {
            new: new_files.len(),
            notified,
            failed,
        })
    }

    async fn fetch_names(
        &self,
        folder: &str,
    ) -> std::result::Result<HashSet<String>, StorageError> {
        let result = self.storage.list_names(folder).await;
        if let Err(err) = &result {
            if err.is_not_found() {
                error!(
                    "The folder '{}' was not found. Please check the configured folder list.",
                    folder
                );
            } else {
                error!(
                    "An error occurred fetching files from '{}': {}",
                    folder, err
                );
            }
        }
        result
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_is_at_least_five_intervals() {
        let config = FolderMonitorConfig::default()
            .with_poll_interval(Duration::from_secs(120));
        assert_eq!(config.cooldown(), Duration::from_secs(600));

        let config = config.with_cooldown_factor(2);
        assert_eq!(config.cooldown(), Duration::from_secs(600));

        let config = config.with_cooldown_factor(10);
        assert_eq!(config.cooldown(), Duration::from_secs(1200));
    }

    #[test]
    fn default_config_watches_root() {
        let config = FolderMonitorConfig::default();
        assert_eq!(config.folders, vec!["/".to_string()]);
        assert_eq!(config.poll_interval, Duration::from_secs(120));
    }

    #[test]
    fn report_totals() {
        let report = CycleReport {
            folders: vec![
                (
                    "/a".into(),
                    FolderOutcome::Polled {
                        new: 3,
                        notified: 2,
                        failed: 1,
                    },
                ),
                ("/b".into(), FolderOutcome::FetchFailed { not_found: true }),
                ("/c".into(), FolderOutcome::Seeded { existing: 4 }),
            ],
        };

        assert_eq!(report.notified(), 2);
        assert_eq!(report.failed_notifications(), 1);
        assert_eq!(report.fetch_failures(), 1);
        assert_eq!(
            report.outcome("/c"),
            Some(FolderOutcome::Seeded { existing: 4 })
        );
        assert_eq!(report.outcome("/missing"), None);
    }

    #[test]
    fn panic_payloads_are_rendered() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(7_u8)), "unknown panic");
    }
}
