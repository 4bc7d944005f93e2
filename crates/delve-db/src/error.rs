//! Error types for the storage layer.
//!
//! All errors are propagated via [`StorageError`]. Only transient errors
//! are worth retrying; [`StorageError::is_transient`] draws the line.

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend is temporarily unavailable.
    #[error("Transient storage error: {0}")]
    Transient(String),

    /// A single attempt ran past the remaining deadline.
    #[error("Storage operation timed out after {elapsed_ms}ms")]
    Timeout {
        /// How long the attempt ran before it was abandoned.
        elapsed_ms: u64,
    },

    /// A stored record could not be brought to the current schema.
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised while migrating a stored record.
///
/// Malformed fields are recovered, not reported here; only records this
/// build cannot represent without data loss are rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    /// The record was written by a newer schema than this build knows.
    #[error("record schema version {found} is newer than supported version {supported}")]
    FutureVersion {
        /// Version found in the stored record.
        found: u64,
        /// Highest version this build can read.
        supported: u32,
    },
}

impl StorageError {
    /// Whether retrying the same operation could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Dragonfly(e) => matches!(
                e.kind(),
                fred::error::ErrorKind::IO
                    | fred::error::ErrorKind::Timeout
                    | fred::error::ErrorKind::Canceled
                    | fred::error::ErrorKind::Backpressure
                    | fred::error::ErrorKind::Unknown
            ),
            Self::Transient(_) | Self::Timeout { .. } => true,
            Self::Serialization(_) | Self::Migration(_) | Self::Config(_) => false,
        }
    }
}
