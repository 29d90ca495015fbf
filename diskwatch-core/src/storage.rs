use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::StorageError;

/// Remote storage as seen by the monitor: a flat listing of entry names per
/// folder path.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Names of every entry currently in `folder`.
    async fn list_names(
        &self,
        folder: &str,
    ) -> Result<HashSet<String>, StorageError>;

    /// Whether the configured credential is accepted. `Ok(false)` means the
    /// credential is invalid; `Err` means the check itself could not run.
    async fn check_credentials(&self) -> Result<bool, StorageError>;
}
