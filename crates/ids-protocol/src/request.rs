//! Token, introspection, and revocation request types.
//!
//! All three endpoints accept `application/x-www-form-urlencoded`
//! bodies; `from_form` parses the raw body the transport layer read.

use serde::{Deserialize, Serialize};

use ids_model::GrantType;

use crate::error::{OAuthError, OAuthResult};

/// Token endpoint request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenRequest {
    /// Grant type (required).
    pub grant_type: String,

    /// Authorization code (for `authorization_code`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Redirect URI (for `authorization_code`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// Client ID, when not supplied via the Authorization header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Client secret, when supplied in the body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Requested scope (space-separated).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Refresh token (for `refresh_token`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Username (for the resource-owner `password` grant).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password (for the resource-owner `password` grant).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Client assertion (JWT, for `private_key_jwt`/`client_secret_jwt`
    /// client authentication and the JWT-bearer grant).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_assertion: Option<String>,

    /// Client assertion type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_assertion_type: Option<String>,
}

impl TokenRequest {
    /// Parses a form-encoded request body.
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` if the body is not a valid form or
    /// `grant_type` is missing.
    pub fn from_form(body: &str) -> OAuthResult<Self> {
        let request: Self = serde_urlencoded::from_str(body)
            .map_err(|e| OAuthError::InvalidRequest(format!("malformed request body: {e}")))?;
        if request.grant_type.is_empty() {
            return Err(OAuthError::InvalidRequest(
                "grant_type is required".to_string(),
            ));
        }
        Ok(request)
    }

    /// Parses the grant type.
    ///
    /// # Errors
    ///
    /// Returns `unsupported_grant_type` for unknown values.
    pub fn parsed_grant_type(&self) -> OAuthResult<GrantType> {
        self.grant_type
            .parse()
            .map_err(|_| OAuthError::UnsupportedGrantType(self.grant_type.clone()))
    }

    /// Returns the requested scopes.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }
}

/// Introspection endpoint request (RFC 7662 §2.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrospectionRequest {
    /// The token to introspect (required).
    pub token: String,

    /// Hint about the token type (`access_token` or `refresh_token`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type_hint: Option<String>,

    /// Client ID, when not supplied via the Authorization header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Client secret, when supplied in the body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl IntrospectionRequest {
    /// Parses a form-encoded request body.
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` if the body is malformed or the
    /// `token` parameter is missing.
    pub fn from_form(body: &str) -> OAuthResult<Self> {
        let request: Self = serde_urlencoded::from_str(body)
            .map_err(|e| OAuthError::InvalidRequest(format!("malformed request body: {e}")))?;
        if request.token.is_empty() {
            return Err(OAuthError::InvalidRequest("token is required".to_string()));
        }
        Ok(request)
    }
}

/// Revocation endpoint request (RFC 7009 §2.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationRequest {
    /// The token to revoke (required).
    pub token: String,

    /// Hint about the token type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type_hint: Option<String>,

    /// Client ID, when not supplied via the Authorization header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Client secret, when supplied in the body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}
