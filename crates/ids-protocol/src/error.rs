//! OAuth 2.0 protocol error types.
//!
//! Implements the error responses defined in RFC 6749 §5.2 and
//! RFC 7662. Every error carries a stable machine-readable code plus a
//! human-readable description; neither ever contains key material or
//! credential bytes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OAuth 2.0 protocol errors.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// Invalid request parameters.
    #[error("invalid_request: {0}")]
    InvalidRequest(String),

    /// Client authentication failed.
    #[error("invalid_client: {0}")]
    InvalidClient(String),

    /// Invalid or expired authorization grant.
    #[error("invalid_grant: {0}")]
    InvalidGrant(String),

    /// Client is not authorized for this grant type.
    #[error("unauthorized_client: {0}")]
    UnauthorizedClient(String),

    /// Unsupported grant type.
    #[error("unsupported_grant_type: {0}")]
    UnsupportedGrantType(String),

    /// Requested scope exceeds what the client may ask for.
    #[error("invalid_scope: {0}")]
    InvalidScope(String),

    /// Invalid token presented to introspection or revocation.
    #[error("invalid_token: {0}")]
    InvalidToken(String),

    /// Access denied.
    #[error("access_denied: {0}")]
    AccessDenied(String),

    /// Internal server error.
    #[error("server_error: {0}")]
    ServerError(String),
}

impl OAuthError {
    /// Returns the OAuth 2.0 error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidClient(_) => "invalid_client",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::UnauthorizedClient(_) => "unauthorized_client",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::InvalidScope(_) => "invalid_scope",
            Self::InvalidToken(_) => "invalid_token",
            Self::AccessDenied(_) => "access_denied",
            Self::ServerError(_) => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidGrant(_)
            | Self::UnsupportedGrantType(_)
            | Self::InvalidScope(_) => 400,
            Self::InvalidClient(_) | Self::InvalidToken(_) => 401,
            Self::UnauthorizedClient(_) | Self::AccessDenied(_) => 403,
            Self::ServerError(_) => 500,
        }
    }

    /// Creates the serializable error response body.
    #[must_use]
    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.error_code().to_string(),
            error_description: Some(self.to_string()),
            error_uri: None,
        }
    }
}

impl From<ids_store::StorageError> for OAuthError {
    fn from(err: ids_store::StorageError) -> Self {
        Self::ServerError(err.to_string())
    }
}

impl From<ids_jose::JoseError> for OAuthError {
    fn from(err: ids_jose::JoseError) -> Self {
        Self::ServerError(err.to_string())
    }
}

/// OAuth 2.0 error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub error: String,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// URI with more information about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
}

/// Result type for protocol operations.
pub type OAuthResult<T> = Result<T, OAuthError>;
