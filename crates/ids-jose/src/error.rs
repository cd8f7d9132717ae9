//! JOSE error types.

use thiserror::Error;

/// Result type for JOSE operations.
pub type JoseResult<T> = Result<T, JoseError>;

/// Errors raised by key management and token construction.
///
/// Verification and decryption failures are deliberately *not* errors;
/// they surface as `None` from the parse methods so that callers cannot
/// distinguish a bad signature from a bad padding byte.
#[derive(Debug, Error)]
pub enum JoseError {
    /// Unknown or unsupported algorithm name.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Key material is invalid or does not match its declared type.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The key's declared `use`/`key_ops` forbid the requested operation.
    #[error("key '{kid}' does not permit {operation}")]
    OperationNotPermitted {
        /// Key identifier.
        kid: String,
        /// The operation that was refused.
        operation: &'static str,
    },

    /// Signing failed inside the cryptographic backend.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Encryption failed inside the cryptographic backend.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Key generation failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for JoseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
