//! Base error type shared across the identity server crates.
//!
//! Error messages are informative for operators while avoiding leakage
//! of credential or key material to callers.

use thiserror::Error;

/// Result type alias using the server error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for server-level operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Authentication error.
    ///
    /// Deliberately generic to prevent account or client enumeration.
    #[error("authentication failed")]
    Authentication,

    /// Authorization error.
    #[error("access denied")]
    Authorization,

    /// Cryptographic error.
    #[error("cryptographic error: {0}")]
    Crypto(String),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Internal error.
    #[error("internal error")]
    Internal,
}

impl Error {
    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Crypto(_) | Self::Internal)
    }

    /// Returns whether this error represents a caller mistake.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Authentication | Self::Authorization | Self::Validation(_) | Self::NotFound(_)
        )
    }
}
