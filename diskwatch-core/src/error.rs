use thiserror::Error;

/// Failure to list a remote folder. Every variant is folder-scoped: the
/// monitor logs it and retries the folder on the next cycle.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("folder not found: {0}")]
    NotFound(String),

    #[error("storage credential rejected")]
    Unauthorized,

    #[error("storage API rate limited")]
    RateLimited,

    #[error("storage API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to decode storage response: {0}")]
    Decode(String),
}

impl StorageError {
    /// True when the folder itself is missing rather than unreachable.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Failure to deliver a single notification.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("message rejected ({status}): {description}")]
    Rejected { status: u16, description: String },

    #[error("messaging API rate limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to decode messaging response: {0}")]
    Decode(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TrackerError {
    #[error("folder '{0}' is not tracked")]
    Untracked(String),
}

/// Errors that abort a monitor cycle. These are never expected in normal
/// operation; the monitor answers them with the extended cooldown.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error("cycle panicked: {0}")]
    Panicked(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
