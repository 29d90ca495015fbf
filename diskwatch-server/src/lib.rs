//! # diskwatch server
//!
//! Binary-side wiring for diskwatch: turns a loaded [`Config`] into live
//! Yandex.Disk and Telegram clients, gates startup on a credential check,
//! and hands a ready [`FolderMonitor`] to `main`.
//!
//! [`Config`]: diskwatch_config::Config
//! [`FolderMonitor`]: diskwatch_core::FolderMonitor

pub mod startup;

/// Filter used when `RUST_LOG` is unset. `diskwatch` is the binary's own target.
pub const DEFAULT_LOG_FILTER: &str =
    "info,diskwatch=info,diskwatch_core=info,diskwatch_server=info";
