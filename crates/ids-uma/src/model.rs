//! UMA domain models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A UMA-protected resource, addressable by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSet {
    /// Resource set identifier.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Scopes the resource supports.
    pub scopes: Vec<String>,

    /// Subject of the resource owner.
    pub owner: String,

    /// Network location of the resource.
    pub uri: Option<String>,

    /// Semantic type of the resource.
    pub resource_type: Option<String>,

    /// Icon for consent screens.
    pub icon_uri: Option<String>,
}

impl ResourceSet {
    /// Creates a resource set with the given id, name, owner, and
    /// scopes.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        owner: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            scopes,
            owner: owner.into(),
            uri: None,
            resource_type: None,
            icon_uri: None,
        }
    }
}

/// A short-lived, single-use permission ticket.
///
/// Created when a client is denied direct access; consumed when
/// exchanged for an RPT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket identifier handed to the client.
    pub id: String,

    /// Resource set the permission is requested on.
    pub resource_set_id: String,

    /// Scopes requested on the resource set.
    pub scopes: Vec<String>,

    /// Client the ticket was issued to.
    pub client_id: String,

    /// Whether the resource owner has already consented to this
    /// request.
    pub is_authorized_by_owner: bool,

    /// When the ticket was created.
    pub created_at: DateTime<Utc>,

    /// Lifetime in seconds from `created_at`.
    pub expires_in: i64,
}

impl Ticket {
    /// Returns whether the ticket has passed its TTL.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.created_at + Duration::seconds(self.expires_in)
    }
}

/// A resource owner's authorization policy over one or more resource
/// sets.
///
/// Rules are alternatives: satisfying any one rule authorizes the
/// request. A policy with no rules authorizes nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Policy identifier.
    pub id: String,

    /// Resource sets the policy protects.
    pub resource_set_ids: Vec<String>,

    /// Alternative rules; OR semantics across the list.
    pub rules: Vec<PolicyRule>,
}

/// One rule of a policy; every condition inside the rule must hold.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Rule identifier.
    pub id: String,

    /// Clients the rule applies to; empty means any client.
    pub client_ids_allowed: Vec<String>,

    /// Scopes the rule grants; the ticket's scopes must be a subset.
    pub scopes: Vec<String>,

    /// Claims the requesting party must present.
    pub claims: Vec<ClaimRequirement>,

    /// Whether the resource owner must consent before access flows.
    pub is_resource_owner_consent_needed: bool,

    /// Custom authorization script hook (evaluated externally).
    pub script: Option<String>,

    /// OpenID provider expected to have issued the claim token.
    pub open_id_provider: Option<String>,
}

/// A single claim the policy requires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRequirement {
    /// Claim name (`role`, `email`, ...).
    #[serde(rename = "type")]
    pub claim_type: String,

    /// Value the claim must carry.
    pub value: String,
}

/// A claim token presented alongside a ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimTokenParameter {
    /// The serialized token.
    pub token: String,

    /// Format identifier of the token.
    pub format: String,
}

/// One claim listed in a `need_info` outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredClaim {
    /// Claim name.
    pub name: String,

    /// Display name shown to the requesting party.
    pub friendly_name: String,

    /// Issuer the claim token must come from.
    pub issuer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_expiry() {
        let fresh = Ticket {
            id: "t-1".to_string(),
            resource_set_id: "rs-1".to_string(),
            scopes: vec!["read".to_string()],
            client_id: "web".to_string(),
            is_authorized_by_owner: false,
            created_at: Utc::now(),
            expires_in: 300,
        };
        assert!(!fresh.is_expired());

        let stale = Ticket {
            created_at: Utc::now() - Duration::seconds(301),
            ..fresh
        };
        assert!(stale.is_expired());
    }

    #[test]
    fn claim_requirement_serializes_with_type_key() {
        let requirement = ClaimRequirement {
            claim_type: "role".to_string(),
            value: "administrator".to_string(),
        };
        let json = serde_json::to_string(&requirement).unwrap();
        assert!(json.contains("\"type\":\"role\""));
    }
}
