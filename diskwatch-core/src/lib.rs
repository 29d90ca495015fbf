//! # diskwatch core
//!
//! Watches remote storage folders for newly added files and announces every
//! new file exactly once through a messaging sink.
//!
//! ## Architecture
//!
//! - [`tracker`]: per-folder record of names already seen or announced
//! - [`monitor`]: the poll/diff/notify loop and its failure policy
//! - [`storage`]: the listing port the monitor polls
//! - [`notifier`]: the messaging port and the notification message format
//! - [`providers`]: Yandex.Disk and Telegram adapters for the two ports
//!
//! The monitor owns its tracker and configuration; nothing here reads the
//! process environment.

pub mod error;
pub mod monitor;
pub mod notifier;
pub mod providers;
pub mod secret;
pub mod storage;
pub mod tracker;

pub use error::{MonitorError, Result, SinkError, StorageError, TrackerError};
pub use monitor::{
    CycleReport, FolderMonitor, FolderMonitorConfig, FolderOutcome,
};
pub use notifier::{NewFileEvent, NotificationSink, ParseMode};
pub use secret::Secret;
pub use storage::StorageBackend;
pub use tracker::FolderTracker;
