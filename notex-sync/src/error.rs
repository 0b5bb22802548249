/// Error types for the offline sync client

/// Sync client errors
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The API could not be reached or the request failed in flight
    #[error("Transport error: {0}")]
    Transport(String),

    /// The local store could not be read or written
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// A payload or the store document was not valid JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Transport(err.to_string())
    }
}

/// Sync result type alias
pub type SyncResult<T> = Result<T, SyncError>;
