//! Error types for Nextcloud calendar sync.

use thiserror::Error;

/// Errors that can occur while syncing a Nextcloud calendar.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Settings are disabled, incomplete or point at nothing usable.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("CalDAV request failed: {0}")]
    Transport(String),

    /// The server answered, but not with what CalDAV promises.
    #[error("CalDAV protocol error: {0}")]
    Protocol(String),

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("Local event store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
