//! Policy evaluation.
//!
//! OR across rules, AND within a rule: the first rule whose every
//! condition holds authorizes the request; when none does, the
//! decision of the last rule evaluated is returned so the caller can
//! distinguish "denied" from "more claims required".

use std::sync::Arc;

use ids_jose::claims::names;
use ids_jose::{JwsEngine, JwsPayload, KeyStore};

use crate::model::{ClaimTokenParameter, Policy, PolicyRule, RequiredClaim, Ticket};

/// Claim-token format for an OpenID Connect ID token.
pub const ID_TOKEN_CLAIM_FORMAT: &str =
    "http://openid.net/specs/openid-connect-core-1_0.html#HybridIDToken";

/// Outcome of evaluating a policy.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyDecision {
    /// A rule is fully satisfied.
    Authorized,

    /// No rule is satisfied; terminal denial.
    NotAuthorized,

    /// The rule needs claims that were not presented.
    NeedInfo(Vec<RequiredClaim>),

    /// The rule needs the resource owner's consent, which has not been
    /// recorded yet.
    RequestSubmitted,
}

/// Evaluates authorization policies against presented claims.
pub struct PolicyEvaluator {
    keystore: Arc<KeyStore>,
    jws: JwsEngine,
    claim_issuer: String,
}

impl PolicyEvaluator {
    /// Creates a new evaluator.
    ///
    /// `claim_issuer` is advertised in `need_info` outcomes as the
    /// provider the requesting party should fetch claims from.
    pub fn new(keystore: Arc<KeyStore>, claim_issuer: impl Into<String>) -> Self {
        Self {
            keystore,
            jws: JwsEngine::new(),
            claim_issuer: claim_issuer.into(),
        }
    }

    /// Evaluates `policy` for `ticket` against the presented claim
    /// tokens.
    ///
    /// A policy with zero rules denies: protection without a stated
    /// rule must not fall open.
    #[must_use]
    pub fn evaluate(
        &self,
        ticket: &Ticket,
        policy: &Policy,
        claim_tokens: &[ClaimTokenParameter],
    ) -> PolicyDecision {
        if policy.rules.is_empty() {
            return PolicyDecision::NotAuthorized;
        }

        let mut last = PolicyDecision::NotAuthorized;
        for rule in &policy.rules {
            last = self.evaluate_rule(ticket, rule, claim_tokens);
            if last == PolicyDecision::Authorized {
                return last;
            }
        }
        last
    }

    /// Evaluates one rule; every condition must hold.
    fn evaluate_rule(
        &self,
        ticket: &Ticket,
        rule: &PolicyRule,
        claim_tokens: &[ClaimTokenParameter],
    ) -> PolicyDecision {
        // 1. The ticket's scopes must be covered by the rule.
        if ticket.scopes.iter().any(|s| !rule.scopes.contains(s)) {
            return PolicyDecision::NotAuthorized;
        }

        // 2. The requesting client must be allowed, when the rule
        //    names clients.
        if !rule.client_ids_allowed.is_empty()
            && !rule.client_ids_allowed.contains(&ticket.client_id)
        {
            return PolicyDecision::NotAuthorized;
        }

        // 3. Every required claim must be present and match.
        if !rule.claims.is_empty() {
            match self.check_claims(rule, claim_tokens) {
                PolicyDecision::Authorized => {}
                other => return other,
            }
        }

        // 4. Resource-owner consent, when required.
        if rule.is_resource_owner_consent_needed && !ticket.is_authorized_by_owner {
            return PolicyDecision::RequestSubmitted;
        }

        PolicyDecision::Authorized
    }

    /// Verifies the claim token and matches each required claim.
    fn check_claims(
        &self,
        rule: &PolicyRule,
        claim_tokens: &[ClaimTokenParameter],
    ) -> PolicyDecision {
        let Some(id_token) = claim_tokens
            .iter()
            .find(|c| c.format == ID_TOKEN_CLAIM_FORMAT)
        else {
            return PolicyDecision::NeedInfo(self.required_claims(rule));
        };

        // The claim token is an ID token this server issued; verify it
        // against the key set, tolerating key rotation.
        let Some(payload) = self.keystore.parse_with_fallback(&self.jws, &id_token.token) else {
            return PolicyDecision::NotAuthorized;
        };

        for required in &rule.claims {
            if !claim_matches(&payload, &required.claim_type, &required.value) {
                return PolicyDecision::NotAuthorized;
            }
        }

        PolicyDecision::Authorized
    }

    fn required_claims(&self, rule: &PolicyRule) -> Vec<RequiredClaim> {
        rule.claims
            .iter()
            .map(|claim| RequiredClaim {
                name: claim.claim_type.clone(),
                friendly_name: claim.claim_type.clone(),
                issuer: rule
                    .open_id_provider
                    .clone()
                    .unwrap_or_else(|| self.claim_issuer.clone()),
            })
            .collect()
    }
}

/// Matches one presented claim against a required value.
///
/// Role claims are multi-valued: a comma-separated string or a JSON
/// array satisfies the requirement if any element matches.
fn claim_matches(payload: &JwsPayload, claim_type: &str, expected: &str) -> bool {
    let Some(value) = payload.claim(claim_type) else {
        return false;
    };

    if claim_type == names::ROLE {
        return match value {
            serde_json::Value::String(s) => s.split(',').any(|role| role.trim() == expected),
            serde_json::Value::Array(items) => items
                .iter()
                .filter_map(serde_json::Value::as_str)
                .any(|role| role == expected),
            _ => false,
        };
    }

    match value {
        serde_json::Value::String(s) => s == expected,
        other => other.to_string() == expected,
    }
}
