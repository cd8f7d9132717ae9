//! Storage error type.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by storage backends.
///
/// "Not found" is not an error: lookup methods return `Option` and
/// reserve errors for backend faults (connectivity, serialization).
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A record could not be serialized or deserialized.
    #[error("storage serialization error: {0}")]
    Serialization(String),
}
