//! Single-use code records: authorization codes and out-of-band
//! confirmation codes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// An authorization code issued at the authorize step.
///
/// Consumed exactly once by the `authorization_code` grant; the store
/// deletes it on redemption, so a second presentation finds nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// The code value handed to the client.
    pub code: String,

    /// Client the code was issued to.
    pub client_id: String,

    /// Redirect URI the code is bound to (exact match on redemption).
    pub redirect_uri: String,

    /// Scopes granted at the authorize step.
    pub scopes: Vec<String>,

    /// Subject that approved the authorization.
    pub subject: String,

    /// ID-token claim parameters captured at authorize time.
    pub id_token_claims: Option<serde_json::Value>,

    /// UserInfo claim parameters captured at authorize time.
    pub user_info_claims: Option<serde_json::Value>,

    /// Nonce from the authorization request.
    pub nonce: Option<String>,

    /// When the code was created.
    pub created_at: DateTime<Utc>,

    /// Lifetime in seconds from `created_at`.
    pub expires_in: i64,
}

impl AuthorizationCode {
    /// Returns whether the code has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.created_at + Duration::seconds(self.expires_in)
    }
}

/// A one-time code for out-of-band (SMS) authentication.
///
/// Single use and time-boxed; redemption removes it from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationCode {
    /// The code value sent to the subject.
    pub value: String,

    /// Subject the code authenticates.
    pub subject: String,

    /// When the code was issued.
    pub issued_at: DateTime<Utc>,

    /// Lifetime in seconds from `issued_at`.
    pub expires_in: i64,
}

impl ConfirmationCode {
    /// Returns whether the code has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.issued_at + Duration::seconds(self.expires_in)
    }
}
