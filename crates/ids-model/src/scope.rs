//! Scope registry model.

use serde::{Deserialize, Serialize};

/// A registered scope.
///
/// Scopes map to sets of identity claims and feed the discovery
/// document's `scopes_supported` advertisement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    /// Scope name as it appears in requests (`openid`, `profile`, ...).
    pub name: String,

    /// Human-readable description.
    pub description: Option<String>,

    /// Whether this is an OpenID Connect scope (eligible for ID token
    /// issuance).
    pub is_openid_scope: bool,

    /// Claim names released when this scope is granted.
    pub claims: Vec<String>,

    /// Whether the scope is listed in the discovery document.
    pub is_exposed: bool,
}

impl Scope {
    /// Creates a plain OAuth scope with no claims attached.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            is_openid_scope: false,
            claims: Vec::new(),
            is_exposed: true,
        }
    }

    /// Creates the standard `openid` scope.
    #[must_use]
    pub fn openid() -> Self {
        Self {
            name: "openid".to_string(),
            description: Some("access to the identity layer".to_string()),
            is_openid_scope: true,
            claims: vec!["sub".to_string()],
            is_exposed: true,
        }
    }

    /// Creates the standard `profile` scope.
    #[must_use]
    pub fn profile() -> Self {
        Self {
            name: "profile".to_string(),
            description: Some("access to profile claims".to_string()),
            is_openid_scope: true,
            claims: vec![
                "name".to_string(),
                "given_name".to_string(),
                "family_name".to_string(),
                "preferred_username".to_string(),
                "updated_at".to_string(),
            ],
            is_exposed: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openid_scope_is_marked_as_such() {
        assert!(Scope::openid().is_openid_scope);
        assert!(!Scope::new("api.read").is_openid_scope);
    }
}
