//! Claim-set generation for ID tokens and access tokens.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use ids_core::Config;
use ids_jose::claims::names;
use ids_jose::JwsPayload;
use ids_model::{Client, GrantType, ResponseType};
use ids_store::ClientStore;

use crate::error::OAuthResult;

/// The authenticated end user a token is being minted for.
#[derive(Debug, Clone)]
pub struct Principal {
    /// Stable subject identifier.
    pub subject: String,

    /// When the principal last authenticated.
    pub authentication_instant: Option<DateTime<Utc>>,

    /// Identity claims released by the directory.
    pub claims: HashMap<String, Value>,
}

impl Principal {
    /// Creates a principal with no extra claims.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            authentication_instant: None,
            claims: HashMap::new(),
        }
    }
}

/// The slice of the authorization request that shapes the claim set.
#[derive(Debug, Clone)]
pub struct AuthorizationParameter {
    /// Requesting client.
    pub client_id: String,

    /// Granted scopes.
    pub scopes: Vec<String>,

    /// Nonce to echo into the ID token.
    pub nonce: Option<String>,

    /// `max_age` from the authorization request, when present.
    pub max_age: Option<i64>,

    /// Whether `auth_time` was requested as an essential claim.
    pub auth_time_essential: bool,
}

impl AuthorizationParameter {
    /// Creates a parameter set for a client and scopes.
    #[must_use]
    pub fn new(client_id: impl Into<String>, scopes: Vec<String>) -> Self {
        Self {
            client_id: client_id.into(),
            scopes,
            nonce: None,
            max_age: None,
            auth_time_essential: false,
        }
    }
}

/// Builds the claim sets the token pipeline signs.
pub struct ClaimsGenerator {
    config: Arc<Config>,
    clients: Arc<dyn ClientStore>,
}

impl ClaimsGenerator {
    /// Creates a new generator.
    pub fn new(config: Arc<Config>, clients: Arc<dyn ClientStore>) -> Self {
        Self { config, clients }
    }

    /// Generates the ID-token claim set for a principal.
    ///
    /// The audience is the requesting client plus every registered
    /// client that supports both the `id_token` response type and the
    /// `implicit` grant (those clients may be handed the token too),
    /// plus the issuer itself. Membership is sorted, so the claim set
    /// is deterministic for identical inputs and a fixed clock.
    ///
    /// `auth_time` is included only when the request asked for
    /// `max_age` or named `auth_time` as essential.
    ///
    /// # Errors
    ///
    /// Returns an error if the client registry cannot be read.
    pub async fn generate_id_token_claims(
        &self,
        principal: &Principal,
        parameter: &AuthorizationParameter,
    ) -> OAuthResult<JwsPayload> {
        let issuer = self.config.issuer.name.clone();
        let now = Utc::now();
        let expires = now + Duration::seconds(self.config.tokens.id_token_lifetime);

        let mut audiences = vec![parameter.client_id.clone(), issuer.clone()];
        for client in self.clients.get_all().await? {
            if client.supports_response_type(ResponseType::IdToken)
                && client.supports_grant_type(GrantType::Implicit)
            {
                audiences.push(client.client_id);
            }
        }
        audiences.sort();
        audiences.dedup();

        let multiple_audiences =
            audiences.len() > 1 || audiences.first().is_some_and(|a| *a != parameter.client_id);

        let mut payload = JwsPayload::new()
            .with(names::ISS, issuer)
            .with(names::SUB, principal.subject.clone())
            .with(
                names::AUD,
                Value::Array(audiences.into_iter().map(Value::String).collect()),
            )
            .with(names::IAT, now.timestamp())
            .with(names::EXP, expires.timestamp());

        if multiple_audiences {
            payload.insert(names::AZP, parameter.client_id.clone());
        }

        if parameter.max_age.is_some() || parameter.auth_time_essential {
            let instant = principal.authentication_instant.unwrap_or(now);
            payload.insert(names::AUTH_TIME, instant.timestamp());
        }

        if let Some(nonce) = &parameter.nonce {
            payload.insert(names::NONCE, nonce.clone());
        }

        for (name, value) in &principal.claims {
            if payload.claim(name).is_none() {
                payload.insert(name.clone(), value.clone());
            }
        }

        Ok(payload)
    }

    /// Generates the claim set for a client-scoped access token (used
    /// for JWT-shaped access tokens such as UMA requesting-party
    /// tokens).
    #[must_use]
    pub fn generate_access_token_claims(&self, client: &Client, scopes: &[String]) -> JwsPayload {
        let now = Utc::now();
        let expires = now + Duration::seconds(self.config.tokens.access_token_lifetime);

        JwsPayload::new()
            .with(names::ISS, self.config.issuer.name.clone())
            .with(names::AUD, client.client_id.clone())
            .with(names::IAT, now.timestamp())
            .with(names::EXP, expires.timestamp())
            .with(names::SCOPE, scopes.join(" "))
            .with(names::CLIENT_ID, client.client_id.clone())
            .with(names::JTI, Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ids_store::InMemoryClientStore;

    fn generator_with(clients: Arc<InMemoryClientStore>) -> ClaimsGenerator {
        ClaimsGenerator::new(Arc::new(Config::default()), clients)
    }

    #[tokio::test]
    async fn audience_includes_implicit_id_token_clients() {
        let clients = Arc::new(InMemoryClientStore::new());
        let mut implicit = Client::public("implicit-rp");
        implicit.grant_types = vec![GrantType::Implicit];
        implicit.response_types = vec![ResponseType::IdToken];
        clients.insert(implicit);

        let mut code_only = Client::confidential("code-rp", "x");
        code_only.grant_types = vec![GrantType::AuthorizationCode];
        clients.insert(code_only);

        let generator = generator_with(clients);
        let payload = generator
            .generate_id_token_claims(
                &Principal::new("sub-1"),
                &AuthorizationParameter::new("web", vec!["openid".to_string()]),
            )
            .await
            .unwrap();

        assert!(payload.has_audience("web"));
        assert!(payload.has_audience("implicit-rp"));
        assert!(!payload.has_audience("code-rp"));
        // azp marks the requesting client among multiple audiences.
        assert_eq!(payload.claim_str(names::AZP), Some("web"));
    }

    #[tokio::test]
    async fn audiences_are_sorted_for_determinism() {
        let clients = Arc::new(InMemoryClientStore::new());
        for id in ["zeta", "alpha", "mid"] {
            let mut client = Client::public(id);
            client.grant_types = vec![GrantType::Implicit];
            client.response_types = vec![ResponseType::IdToken];
            clients.insert(client);
        }

        let generator = generator_with(clients);
        let payload = generator
            .generate_id_token_claims(
                &Principal::new("sub-1"),
                &AuthorizationParameter::new("web", Vec::new()),
            )
            .await
            .unwrap();

        let audiences: Vec<&str> = payload.audiences();
        let mut sorted = audiences.clone();
        sorted.sort_unstable();
        assert_eq!(audiences, sorted);
    }

    #[tokio::test]
    async fn auth_time_only_when_requested() {
        let clients = Arc::new(InMemoryClientStore::new());
        let generator = generator_with(clients);

        let mut principal = Principal::new("sub-1");
        principal.authentication_instant = Some(Utc::now() - Duration::seconds(60));

        let plain = AuthorizationParameter::new("web", Vec::new());
        let payload = generator
            .generate_id_token_claims(&principal, &plain)
            .await
            .unwrap();
        assert!(payload.claim(names::AUTH_TIME).is_none());

        let mut with_max_age = AuthorizationParameter::new("web", Vec::new());
        with_max_age.max_age = Some(300);
        let payload = generator
            .generate_id_token_claims(&principal, &with_max_age)
            .await
            .unwrap();
        assert_eq!(
            payload.claim_i64(names::AUTH_TIME),
            Some(principal.authentication_instant.unwrap().timestamp())
        );
    }

    #[tokio::test]
    async fn principal_claims_do_not_override_registered_claims() {
        let clients = Arc::new(InMemoryClientStore::new());
        let generator = generator_with(clients);

        let mut principal = Principal::new("sub-1");
        principal
            .claims
            .insert("sub".to_string(), Value::String("spoofed".to_string()));
        principal
            .claims
            .insert("email".to_string(), Value::String("a@b.example".to_string()));

        let payload = generator
            .generate_id_token_claims(&principal, &AuthorizationParameter::new("web", Vec::new()))
            .await
            .unwrap();

        assert_eq!(payload.subject(), Some("sub-1"));
        assert_eq!(payload.claim_str("email"), Some("a@b.example"));
    }

    #[tokio::test]
    async fn access_token_claims_carry_scope_and_client() {
        let clients = Arc::new(InMemoryClientStore::new());
        let generator = generator_with(clients);
        let client = Client::confidential("api-client", "x");

        let payload = generator
            .generate_access_token_claims(&client, &["read".to_string(), "write".to_string()]);

        assert_eq!(payload.claim_str(names::SCOPE), Some("read write"));
        assert_eq!(payload.claim_str(names::CLIENT_ID), Some("api-client"));
        assert!(payload.jti().is_some());
    }
}
