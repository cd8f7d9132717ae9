//! Token introspection (RFC 7662).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use ids_core::event::{Event, EventLogger, EventType};
use ids_model::GrantedToken;
use ids_store::TokenStore;

use crate::client_auth::{AuthenticationInstruction, ClientAuthenticator};
use crate::error::OAuthResult;
use crate::request::IntrospectionRequest;

/// Introspection response body (RFC 7662 §2.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrospectionResponse {
    /// Whether the token is currently active.
    pub active: bool,

    /// Granted scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Client the token was issued to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Token type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Expiration time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued-at time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Subject of the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl IntrospectionResponse {
    /// The response for an unknown, expired, or revoked token.
    ///
    /// Per RFC 7662 this is a normal 200 response, not an error: the
    /// caller learns nothing beyond `active: false`.
    #[must_use]
    pub const fn inactive() -> Self {
        Self {
            active: false,
            scope: None,
            client_id: None,
            token_type: None,
            exp: None,
            iat: None,
            sub: None,
            iss: None,
        }
    }

    /// Builds the active response for a granted token.
    #[must_use]
    pub fn from_token(token: &GrantedToken, issuer: &str, token_type: &str) -> Self {
        Self {
            active: true,
            scope: Some(token.scope_string()),
            client_id: Some(token.client_id.clone()),
            token_type: Some(token_type.to_string()),
            exp: Some(token.expires_at().timestamp()),
            iat: Some(token.created_at.timestamp()),
            sub: token.subject.clone(),
            iss: Some(issuer.to_string()),
        }
    }
}

/// Validates presented tokens on behalf of authenticated callers.
pub struct IntrospectionService {
    authenticator: Arc<ClientAuthenticator>,
    tokens: Arc<dyn TokenStore>,
    issuer_name: String,
    events: Arc<dyn EventLogger>,
}

impl IntrospectionService {
    /// Creates a new service.
    pub fn new(
        authenticator: Arc<ClientAuthenticator>,
        tokens: Arc<dyn TokenStore>,
        issuer_name: impl Into<String>,
        events: Arc<dyn EventLogger>,
    ) -> Self {
        Self {
            authenticator,
            tokens,
            issuer_name: issuer_name.into(),
            events,
        }
    }

    /// Introspects a token.
    ///
    /// The caller is authenticated before any claim is revealed. An
    /// unknown or expired token yields `{active: false}`, never an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns `invalid_client` when caller authentication fails and
    /// `invalid_request` for a malformed request.
    pub async fn introspect(
        &self,
        request: &IntrospectionRequest,
        instruction: &AuthenticationInstruction,
    ) -> OAuthResult<IntrospectionResponse> {
        let caller = self.authenticator.authenticate(instruction).await?;

        let hint = request.token_type_hint.as_deref();
        let response = self.lookup(&request.token, hint).await?;

        self.events
            .log(
                Event::builder(EventType::TokenIntrospected)
                    .client(caller.client_id)
                    .detail("active", response.active.to_string())
                    .build(),
            )
            .await;
        Ok(response)
    }

    /// Looks the token up by the hinted kind first, then the other.
    async fn lookup(&self, token: &str, hint: Option<&str>) -> OAuthResult<IntrospectionResponse> {
        let refresh_first = hint == Some("refresh_token");

        let lookups: [&str; 2] = if refresh_first {
            ["refresh_token", "access_token"]
        } else {
            ["access_token", "refresh_token"]
        };

        for kind in lookups {
            let found = if kind == "access_token" {
                self.tokens.get_by_access_token(token).await?
            } else {
                self.tokens.get_by_refresh_token(token).await?
            };
            if let Some(granted) = found {
                if granted.is_expired() {
                    return Ok(IntrospectionResponse::inactive());
                }
                let token_type = if kind == "access_token" {
                    granted.token_type.as_str()
                } else {
                    "refresh_token"
                };
                return Ok(IntrospectionResponse::from_token(
                    &granted,
                    &self.issuer_name,
                    token_type,
                ));
            }
        }

        Ok(IntrospectionResponse::inactive())
    }
}
