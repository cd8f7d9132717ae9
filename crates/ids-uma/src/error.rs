//! UMA error taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::RequiredClaim;

/// Result type for UMA operations.
pub type UmaResult<T> = Result<T, UmaError>;

/// Errors raised by the ticket and policy pipeline.
///
/// `NeedInfo` is a distinguished non-terminal outcome: the request is
/// not denied, the requesting party simply has to come back with more
/// claims and the fresh ticket carried inside the error.
#[derive(Debug, Error)]
pub enum UmaError {
    /// Invalid request parameters.
    #[error("invalid_request: {0}")]
    InvalidRequest(String),

    /// Client authentication failed.
    #[error("invalid_client: {0}")]
    InvalidClient(String),

    /// The client may not use the UMA grant.
    #[error("invalid_grant: {0}")]
    InvalidGrant(String),

    /// Requested scopes exceed the resource set's scopes.
    #[error("invalid_scope: {0}")]
    InvalidScope(String),

    /// The referenced resource set does not exist.
    #[error("nonexistent_resource_set_id: {0}")]
    NonexistentResourceSet(String),

    /// The ticket does not exist or was already consumed.
    #[error("invalid_ticket: {0}")]
    InvalidTicket(String),

    /// The ticket has passed its TTL.
    #[error("expired_ticket: {0}")]
    ExpiredTicket(String),

    /// No policy protects the resource set. An unprotected resource is
    /// not auto-authorized.
    #[error("not_found: no policy protects the resource set")]
    PolicyNotFound,

    /// The authorization policy is not satisfied. Terminal denial.
    #[error("not_authorized: {0}")]
    NotAuthorized(String),

    /// More claims are required; retry with the embedded ticket.
    #[error("need_info: additional claims are required")]
    NeedInfo {
        /// Fresh ticket to present on the retry.
        ticket: String,
        /// The claims the policy requires.
        required_claims: Vec<RequiredClaim>,
    },

    /// Internal server error.
    #[error("server_error: {0}")]
    ServerError(String),
}

impl UmaError {
    /// Returns the stable machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidClient(_) => "invalid_client",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::InvalidScope(_) => "invalid_scope",
            Self::NonexistentResourceSet(_) => "nonexistent_resource_set_id",
            Self::InvalidTicket(_) => "invalid_ticket",
            Self::ExpiredTicket(_) => "expired_ticket",
            Self::PolicyNotFound => "not_found",
            Self::NotAuthorized(_) => "not_authorized",
            Self::NeedInfo { .. } => "need_info",
            Self::ServerError(_) => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidGrant(_)
            | Self::InvalidScope(_)
            | Self::NonexistentResourceSet(_)
            | Self::InvalidTicket(_)
            | Self::ExpiredTicket(_) => 400,
            Self::InvalidClient(_) => 401,
            Self::NotAuthorized(_) | Self::NeedInfo { .. } => 403,
            Self::PolicyNotFound => 404,
            Self::ServerError(_) => 500,
        }
    }

    /// Creates the serializable error response body.
    ///
    /// `need_info` carries the fresh ticket and the required claims so
    /// the requesting party can retry.
    #[must_use]
    pub fn to_error_response(&self) -> UmaErrorResponse {
        match self {
            Self::NeedInfo {
                ticket,
                required_claims,
            } => UmaErrorResponse {
                error: self.error_code().to_string(),
                error_description: None,
                ticket: Some(ticket.clone()),
                required_claims: Some(required_claims.clone()),
            },
            other => UmaErrorResponse {
                error: other.error_code().to_string(),
                error_description: Some(other.to_string()),
                ticket: None,
                required_claims: None,
            },
        }
    }
}

impl From<ids_store::StorageError> for UmaError {
    fn from(err: ids_store::StorageError) -> Self {
        Self::ServerError(err.to_string())
    }
}

impl From<ids_jose::JoseError> for UmaError {
    fn from(err: ids_jose::JoseError) -> Self {
        Self::ServerError(err.to_string())
    }
}

impl From<ids_protocol::OAuthError> for UmaError {
    fn from(err: ids_protocol::OAuthError) -> Self {
        match err {
            ids_protocol::OAuthError::InvalidClient(msg) => Self::InvalidClient(msg),
            ids_protocol::OAuthError::InvalidRequest(msg) => Self::InvalidRequest(msg),
            other => Self::ServerError(other.to_string()),
        }
    }
}

/// UMA error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UmaErrorResponse {
    /// Error code.
    pub error: String,

    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// Fresh ticket for a `need_info` retry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<String>,

    /// Claims required to satisfy the policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_claims: Option<Vec<RequiredClaim>>,
}
