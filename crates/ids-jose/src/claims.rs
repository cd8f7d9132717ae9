//! JWS payloads and standard claim names.
//!
//! A [`JwsPayload`] is an ordered JSON object of claims; the typed
//! accessors cover the registered claims the protocol layers act on.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Registered claim names (RFC 7519 §4.1 plus OIDC additions).
pub mod names {
    /// Issuer.
    pub const ISS: &str = "iss";
    /// Subject.
    pub const SUB: &str = "sub";
    /// Audience.
    pub const AUD: &str = "aud";
    /// Expiration time.
    pub const EXP: &str = "exp";
    /// Not before.
    pub const NBF: &str = "nbf";
    /// Issued at.
    pub const IAT: &str = "iat";
    /// JWT ID.
    pub const JTI: &str = "jti";
    /// Authentication time.
    pub const AUTH_TIME: &str = "auth_time";
    /// Nonce.
    pub const NONCE: &str = "nonce";
    /// Authorized party.
    pub const AZP: &str = "azp";
    /// Access-token hash.
    pub const AT_HASH: &str = "at_hash";
    /// Code hash.
    pub const C_HASH: &str = "c_hash";
    /// Scope.
    pub const SCOPE: &str = "scope";
    /// Client identifier.
    pub const CLIENT_ID: &str = "client_id";
    /// Role claim released by the user directory.
    pub const ROLE: &str = "role";
}

/// An unordered claim set carried by a JWS or JWE payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JwsPayload(Map<String, Value>);

impl JwsPayload {
    /// Creates an empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Inserts a claim, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns a claim value, if present.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns a claim as a string slice.
    #[must_use]
    pub fn claim_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Returns a claim as an integer.
    #[must_use]
    pub fn claim_i64(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(Value::as_i64)
    }

    /// Returns the issuer.
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.claim_str(names::ISS)
    }

    /// Returns the subject.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.claim_str(names::SUB)
    }

    /// Returns the JWT ID.
    #[must_use]
    pub fn jti(&self) -> Option<&str> {
        self.claim_str(names::JTI)
    }

    /// Returns the expiration time as a Unix timestamp.
    #[must_use]
    pub fn expiration_time(&self) -> Option<i64> {
        self.claim_i64(names::EXP)
    }

    /// Returns the audiences. A string audience yields one entry; an
    /// array audience yields its string members.
    #[must_use]
    pub fn audiences(&self) -> Vec<&str> {
        match self.0.get(names::AUD) {
            Some(Value::String(s)) => vec![s.as_str()],
            Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Returns whether the audience set contains `value`.
    #[must_use]
    pub fn has_audience(&self, value: &str) -> bool {
        self.audiences().iter().any(|a| *a == value)
    }

    /// Returns the space-separated `scope` claim split into scopes.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.claim_str(names::SCOPE)
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Iterates over all claims.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Returns the number of claims.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the payload carries no claims.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serializes the payload to its canonical JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.0)
    }

    /// Parses a payload from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a JSON object.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl From<Map<String, Value>> for JwsPayload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<JwsPayload> for Value {
    fn from(payload: JwsPayload) -> Self {
        Self::Object(payload.0)
    }
}
