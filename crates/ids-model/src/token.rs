//! Granted token record.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A token issued by the token endpoint.
///
/// Immutable after creation; superseded on refresh and deleted on
/// revocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantedToken {
    /// The access token value presented by the client.
    pub access_token: String,

    /// Refresh token, when the grant type issues one.
    pub refresh_token: Option<String>,

    /// Token type (`bearer`).
    pub token_type: String,

    /// Lifetime in seconds from `created_at`.
    pub expires_in: i64,

    /// Granted scope names.
    pub scopes: Vec<String>,

    /// Serialized ID token, when `openid` scope was granted.
    pub id_token: Option<String>,

    /// Claim set the ID token was minted from; retained so
    /// introspection can report claims without re-parsing the token.
    pub id_token_payload: Option<serde_json::Value>,

    /// Client the token was issued to.
    pub client_id: String,

    /// Subject the token represents (absent for client-only grants).
    pub subject: Option<String>,

    /// When the token was created.
    pub created_at: DateTime<Utc>,
}

impl GrantedToken {
    /// Creates a new bearer token record.
    #[must_use]
    pub fn bearer(
        access_token: impl Into<String>,
        client_id: impl Into<String>,
        scopes: Vec<String>,
        expires_in: i64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: "bearer".to_string(),
            expires_in,
            scopes,
            id_token: None,
            id_token_payload: None,
            client_id: client_id.into(),
            subject: None,
            created_at: Utc::now(),
        }
    }

    /// Returns when the token stops being valid.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::seconds(self.expires_in)
    }

    /// Returns whether the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at()
    }

    /// Returns the scopes as a space-separated string.
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}
