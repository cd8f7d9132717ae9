//! Resource owner (end user) domain model.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A resource owner known to the credential store.
///
/// The password is stored as an argon2 hash; the clear text never
/// enters this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceOwner {
    /// Stable subject identifier placed in the `sub` claim.
    pub subject: String,

    /// Login name.
    pub username: String,

    /// Argon2 password hash in PHC string format.
    pub password_hash: String,

    /// Whether a second factor (one-time confirmation code) is required
    /// to complete authentication.
    pub two_factor_required: bool,

    /// Phone number for out-of-band confirmation codes.
    pub phone_number: Option<String>,

    /// Identity claims exposed to the claims generator, keyed by claim
    /// name (`email`, `role`, ...).
    pub claims: HashMap<String, serde_json::Value>,

    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ResourceOwner {
    /// Creates a resource owner with the given subject, username, and
    /// pre-computed password hash.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        username: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            username: username.into(),
            password_hash: password_hash.into(),
            two_factor_required: false,
            phone_number: None,
            claims: HashMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Returns the value of a claim, if present.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&serde_json::Value> {
        self.claims.get(name)
    }
}
