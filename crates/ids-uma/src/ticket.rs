//! Permission tickets and requesting-party token issuance.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ids_core::event::{Event, EventLogger, EventType};
use ids_core::Config;
use ids_jose::{
    random, ContentEncryptionAlgorithm, JsonWebKeySet, JweEngine, JwsEngine,
    KeyManagementAlgorithm, KeyOperation, KeyStore, KeyUse,
};
use ids_model::{Client, GrantType, GrantedToken};
use ids_protocol::{AuthenticationInstruction, ClaimsGenerator, ClientAuthenticator};
use ids_store::TokenStore;

use crate::error::{UmaError, UmaResult};
use crate::model::{ClaimTokenParameter, RequiredClaim, Ticket};
use crate::policy::{PolicyDecision, PolicyEvaluator};
use crate::store::{PolicyStore, ResourceSetStore, TicketStore};

/// Claim names carried inside a requesting-party token.
mod rpt_claims {
    /// Array of granted permissions.
    pub const TICKET: &str = "ticket";
    /// Resource set a permission line covers.
    pub const RESOURCE_SET_ID: &str = "resource_set_id";
    /// Scopes granted on that resource set.
    pub const SCOPES: &str = "scopes";
}

/// Request to exchange a ticket for an RPT.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RptRequest {
    /// The permission ticket.
    pub ticket: String,

    /// Claim token presented by the requesting party.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_token: Option<String>,

    /// Format of the claim token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_token_format: Option<String>,
}

/// Response carrying a freshly minted RPT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RptResponse {
    /// The requesting-party token.
    pub rpt: String,

    /// Token type (`bearer`).
    pub token_type: String,

    /// Lifetime in seconds.
    pub expires_in: i64,
}

impl From<&GrantedToken> for RptResponse {
    fn from(token: &GrantedToken) -> Self {
        Self {
            rpt: token.access_token.clone(),
            token_type: token.token_type.clone(),
            expires_in: token.expires_in,
        }
    }
}

/// Creates permission tickets and exchanges them for RPTs.
pub struct TicketEngine {
    config: Arc<Config>,
    authenticator: Arc<ClientAuthenticator>,
    claims: Arc<ClaimsGenerator>,
    evaluator: PolicyEvaluator,
    keystore: Arc<KeyStore>,
    jws: JwsEngine,
    jwe: JweEngine,
    resource_sets: Arc<dyn ResourceSetStore>,
    tickets: Arc<dyn TicketStore>,
    policies: Arc<dyn PolicyStore>,
    tokens: Arc<dyn TokenStore>,
    events: Arc<dyn EventLogger>,
}

impl TicketEngine {
    /// Creates a new engine.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<Config>,
        authenticator: Arc<ClientAuthenticator>,
        claims: Arc<ClaimsGenerator>,
        keystore: Arc<KeyStore>,
        resource_sets: Arc<dyn ResourceSetStore>,
        tickets: Arc<dyn TicketStore>,
        policies: Arc<dyn PolicyStore>,
        tokens: Arc<dyn TokenStore>,
        events: Arc<dyn EventLogger>,
    ) -> Self {
        let evaluator = PolicyEvaluator::new(keystore.clone(), config.issuer.name.clone());
        Self {
            config,
            authenticator,
            claims,
            evaluator,
            keystore,
            jws: JwsEngine::new(),
            jwe: JweEngine::new(),
            resource_sets,
            tickets,
            policies,
            tokens,
            events,
        }
    }

    /// Creates a permission ticket for a resource/scope pair.
    ///
    /// # Errors
    ///
    /// Returns `nonexistent_resource_set_id` for an unknown resource
    /// set and `invalid_scope` when the requested scopes exceed the
    /// resource set's.
    pub async fn create_ticket(
        &self,
        resource_set_id: &str,
        scopes: &[String],
        client_id: &str,
    ) -> UmaResult<Ticket> {
        let resource_set = self
            .resource_sets
            .get(resource_set_id)
            .await?
            .ok_or_else(|| UmaError::NonexistentResourceSet(resource_set_id.to_string()))?;

        if scopes.iter().any(|s| !resource_set.scopes.contains(s)) {
            return Err(UmaError::InvalidScope(format!(
                "requested scopes exceed resource set '{resource_set_id}'"
            )));
        }

        let ticket = Ticket {
            id: Uuid::new_v4().to_string(),
            resource_set_id: resource_set_id.to_string(),
            scopes: scopes.to_vec(),
            client_id: client_id.to_string(),
            is_authorized_by_owner: false,
            created_at: chrono::Utc::now(),
            expires_in: self.config.tokens.ticket_lifetime,
        };
        self.tickets.add(ticket.clone()).await?;

        self.events
            .log(
                Event::builder(EventType::TicketCreated)
                    .client(client_id.to_string())
                    .detail("resource_set_id", resource_set_id.to_string())
                    .build(),
            )
            .await;
        Ok(ticket)
    }

    /// Exchanges a ticket plus presented claims for an RPT.
    ///
    /// The ticket is consumed atomically up front: of two concurrent
    /// exchanges, one proceeds and the other fails `invalid_ticket`.
    /// When the outcome is `need_info`, a fresh ticket is minted and
    /// returned inside the error so the requesting party can retry
    /// with more claims.
    ///
    /// # Errors
    ///
    /// Returns the UMA error of whichever step refused the exchange.
    pub async fn authorize(
        &self,
        request: &RptRequest,
        instruction: &AuthenticationInstruction,
    ) -> UmaResult<RptResponse> {
        let result = self.authorize_inner(request, instruction).await;
        if let Err(err) = &result {
            tracing::debug!(error = err.error_code(), "ticket exchange refused");
            let event_type = match err {
                UmaError::NeedInfo { .. } => EventType::AuthorizationNeedsInfo,
                _ => EventType::AuthorizationDenied,
            };
            self.events
                .log(
                    Event::builder(event_type)
                        .failure(err.error_code())
                        .build(),
                )
                .await;
        }
        result
    }

    async fn authorize_inner(
        &self,
        request: &RptRequest,
        instruction: &AuthenticationInstruction,
    ) -> UmaResult<RptResponse> {
        if request.ticket.is_empty() {
            return Err(UmaError::InvalidRequest("ticket is required".to_string()));
        }

        let client = self.authenticator.authenticate(instruction).await?;
        if !client.supports_grant_type(GrantType::UmaTicket) {
            return Err(UmaError::InvalidGrant(format!(
                "client '{}' does not support the UMA ticket grant",
                client.client_id
            )));
        }

        let ticket = self
            .tickets
            .take(&request.ticket)
            .await?
            .ok_or_else(|| UmaError::InvalidTicket(format!("ticket '{}' does not exist", request.ticket)))?;

        if ticket.is_expired() {
            return Err(UmaError::ExpiredTicket("the ticket has expired".to_string()));
        }
        if ticket.client_id != client.client_id {
            return Err(UmaError::InvalidTicket(
                "the ticket was issued to a different client".to_string(),
            ));
        }

        let policy = self
            .policies
            .get_by_resource_set(&ticket.resource_set_id)
            .await?
            .ok_or(UmaError::PolicyNotFound)?;

        let claim_tokens: Vec<ClaimTokenParameter> = request
            .claim_token
            .as_ref()
            .map(|token| {
                vec![ClaimTokenParameter {
                    token: token.clone(),
                    format: request.claim_token_format.clone().unwrap_or_default(),
                }]
            })
            .unwrap_or_default();

        match self.evaluator.evaluate(&ticket, &policy, &claim_tokens) {
            PolicyDecision::Authorized => {}
            PolicyDecision::NotAuthorized => {
                return Err(UmaError::NotAuthorized(
                    "the authorization policy is not satisfied".to_string(),
                ));
            }
            PolicyDecision::NeedInfo(required) => {
                return Err(self.reissue_for_retry(&ticket, required).await?);
            }
            PolicyDecision::RequestSubmitted => {
                return Err(self.reissue_for_retry(&ticket, Vec::new()).await?);
            }
        }

        let granted = self.mint_rpt(&client, &ticket).await?;
        self.events
            .log(
                Event::builder(EventType::RptIssued)
                    .client(client.client_id.clone())
                    .detail("resource_set_id", ticket.resource_set_id.clone())
                    .build(),
            )
            .await;
        Ok(RptResponse::from(&granted))
    }

    /// Mints a fresh ticket for a `need_info` retry. The consumed
    /// ticket stays consumed; only the replacement is live.
    async fn reissue_for_retry(
        &self,
        consumed: &Ticket,
        required_claims: Vec<RequiredClaim>,
    ) -> UmaResult<UmaError> {
        let replacement = Ticket {
            id: Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now(),
            expires_in: self.config.tokens.ticket_lifetime,
            ..consumed.clone()
        };
        self.tickets.add(replacement.clone()).await?;
        Ok(UmaError::NeedInfo {
            ticket: replacement.id,
            required_claims,
        })
    }

    /// Builds, signs, and records the RPT.
    async fn mint_rpt(&self, client: &Client, ticket: &Ticket) -> UmaResult<GrantedToken> {
        let scope = "openid".to_string();
        let mut payload = self
            .claims
            .generate_access_token_claims(client, std::slice::from_ref(&scope));

        let line = serde_json::json!({
            rpt_claims::RESOURCE_SET_ID: ticket.resource_set_id,
            rpt_claims::SCOPES: ticket.scopes.join(" "),
        });
        payload.insert(rpt_claims::TICKET, serde_json::Value::Array(vec![line]));

        let rpt = self.sign_rpt(&payload, client)?;

        let mut granted = GrantedToken::bearer(
            rpt,
            client.client_id.clone(),
            vec![scope],
            self.config.tokens.rpt_lifetime,
        );
        granted.refresh_token = Some(random::random_base64url(32));
        self.tokens.add(granted.clone()).await?;
        Ok(granted)
    }

    /// Signs the RPT with the client's preferred algorithm, encrypting
    /// it to the client when its registration asks for that.
    fn sign_rpt(&self, payload: &ids_jose::JwsPayload, client: &Client) -> UmaResult<String> {
        let alg = client
            .id_token_signed_response_alg
            .clone()
            .unwrap_or_else(|| self.config.crypto.default_signature_algorithm.clone());
        let key = self
            .keystore
            .get_by_alg(KeyUse::Sig, &alg, &[KeyOperation::Sign])
            .or_else(|| self.keystore.default_signing_key())
            .ok_or_else(|| UmaError::ServerError("no signing key available".to_string()))?;

        let signed = self.jws.sign(payload, &key.key)?;

        let Some(enc_alg) = &client.id_token_encrypted_response_alg else {
            return Ok(signed);
        };
        let alg = KeyManagementAlgorithm::from_jwa(enc_alg)?;
        let enc = client
            .id_token_encrypted_response_enc
            .as_deref()
            .map_or(Ok(ContentEncryptionAlgorithm::A128CbcHs256), |name| {
                ContentEncryptionAlgorithm::from_jwa(name)
            })?;

        match client_encryption_key(client) {
            Some(peer_key) => Ok(self.jwe.encrypt(&signed, &peer_key, alg, enc)?),
            None => Ok(signed),
        }
    }
}

/// Finds the client's registered encryption key, if any.
fn client_encryption_key(client: &Client) -> Option<ids_jose::JsonWebKey> {
    let document = client.jwks.as_ref()?;
    let set: JsonWebKeySet = serde_json::from_value(document.clone()).ok()?;
    set.keys
        .iter()
        .filter_map(ids_jose::PublicJsonWebKey::to_key)
        .find(|key| key.key_use == KeyUse::Enc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use ids_core::event::InMemoryEventLogger;
    use ids_jose::JsonWebKey;
    use ids_model::TokenEndpointAuthMethod;
    use ids_protocol::TokenRequest;
    use ids_store::{InMemoryClientStore, InMemoryJtiReplayCache, InMemoryTokenStore};

    use crate::model::{ClaimRequirement, Policy, PolicyRule, ResourceSet};
    use crate::policy::ID_TOKEN_CLAIM_FORMAT;
    use crate::store::{InMemoryPolicyStore, InMemoryResourceSetStore, InMemoryTicketStore};

    struct Harness {
        engine: TicketEngine,
        keystore: Arc<KeyStore>,
        policies: Arc<InMemoryPolicyStore>,
        tokens: Arc<InMemoryTokenStore>,
    }

    fn uma_client() -> Client {
        let mut client = Client::confidential("uma-client", "uma-secret");
        client.token_endpoint_auth_method = TokenEndpointAuthMethod::ClientSecretBasic;
        client.grant_types = vec![GrantType::ClientCredentials, GrantType::UmaTicket];
        client
    }

    async fn harness() -> Harness {
        let config = Arc::new(Config::default());
        let clients = Arc::new(InMemoryClientStore::new());
        clients.insert(uma_client());

        let keystore = Arc::new(KeyStore::new());
        keystore.insert(JsonWebKey::generate_oct("sig-1", KeyUse::Sig, "HS256", 32));
        keystore.insert(JsonWebKey::generate_rsa("rs-sig", KeyUse::Sig, "RS256", 2048).unwrap());

        let events = Arc::new(InMemoryEventLogger::new());
        let authenticator = Arc::new(ClientAuthenticator::new(
            clients.clone(),
            Arc::new(InMemoryJtiReplayCache::new()),
            config.issuer.name.clone(),
            events.clone(),
        ));
        let claims = Arc::new(ClaimsGenerator::new(config.clone(), clients));

        let resource_sets = Arc::new(InMemoryResourceSetStore::new());
        resource_sets
            .add(ResourceSet::new(
                "rs-1",
                "patient record",
                "owner-1",
                vec!["read".to_string(), "write".to_string()],
            ))
            .await
            .unwrap();

        let policies = Arc::new(InMemoryPolicyStore::new());
        let tokens = Arc::new(InMemoryTokenStore::new());

        let engine = TicketEngine::new(
            config,
            authenticator,
            claims,
            keystore.clone(),
            resource_sets,
            Arc::new(InMemoryTicketStore::new()),
            policies.clone(),
            tokens.clone(),
            events,
        );

        Harness {
            engine,
            keystore,
            policies,
            tokens,
        }
    }

    fn instruction() -> AuthenticationInstruction {
        let header = format!("Basic {}", STANDARD.encode("uma-client:uma-secret"));
        AuthenticationInstruction::from_parts(Some(&header), &TokenRequest::default()).unwrap()
    }

    fn open_policy() -> Policy {
        Policy {
            id: "p-1".to_string(),
            resource_set_ids: vec!["rs-1".to_string()],
            rules: vec![PolicyRule {
                id: "r-1".to_string(),
                client_ids_allowed: vec!["uma-client".to_string()],
                scopes: vec!["read".to_string(), "write".to_string()],
                claims: Vec::new(),
                is_resource_owner_consent_needed: false,
                script: None,
                open_id_provider: None,
            }],
        }
    }

    #[tokio::test]
    async fn ticket_creation_validates_the_resource_set() {
        let harness = harness().await;

        let err = harness
            .engine
            .create_ticket("rs-missing", &["read".to_string()], "uma-client")
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "nonexistent_resource_set_id");

        let err = harness
            .engine
            .create_ticket("rs-1", &["delete".to_string()], "uma-client")
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "invalid_scope");
    }

    #[tokio::test]
    async fn full_exchange_mints_a_verifiable_rpt() {
        let harness = harness().await;
        harness.policies.add(open_policy()).await.unwrap();

        let ticket = harness
            .engine
            .create_ticket("rs-1", &["read".to_string()], "uma-client")
            .await
            .unwrap();

        let response = harness
            .engine
            .authorize(
                &RptRequest {
                    ticket: ticket.id,
                    ..RptRequest::default()
                },
                &instruction(),
            )
            .await
            .unwrap();

        // The RPT is a signed JWS carrying the permission lines.
        let payload = harness
            .keystore
            .parse_with_fallback(&JwsEngine::new(), &response.rpt)
            .unwrap();
        let lines = payload.claim(rpt_claims::TICKET).unwrap().as_array().unwrap();
        assert_eq!(lines[0][rpt_claims::RESOURCE_SET_ID], "rs-1");
        assert_eq!(lines[0][rpt_claims::SCOPES], "read");

        // And it is recorded for introspection.
        assert!(harness
            .tokens
            .get_by_access_token(&response.rpt)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn tickets_are_single_use() {
        let harness = harness().await;
        harness.policies.add(open_policy()).await.unwrap();

        let ticket = harness
            .engine
            .create_ticket("rs-1", &["read".to_string()], "uma-client")
            .await
            .unwrap();
        let request = RptRequest {
            ticket: ticket.id,
            ..RptRequest::default()
        };

        assert!(harness.engine.authorize(&request, &instruction()).await.is_ok());
        let err = harness
            .engine
            .authorize(&request, &instruction())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "invalid_ticket");
    }

    #[tokio::test]
    async fn unprotected_resource_is_not_auto_authorized() {
        let harness = harness().await;
        // No policy registered for rs-1.
        let ticket = harness
            .engine
            .create_ticket("rs-1", &["read".to_string()], "uma-client")
            .await
            .unwrap();

        let err = harness
            .engine
            .authorize(
                &RptRequest {
                    ticket: ticket.id,
                    ..RptRequest::default()
                },
                &instruction(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "not_found");
    }

    #[tokio::test]
    async fn need_info_returns_a_fresh_ticket() {
        let harness = harness().await;
        let mut policy = open_policy();
        policy.rules[0].claims = vec![ClaimRequirement {
            claim_type: "role".to_string(),
            value: "administrator".to_string(),
        }];
        harness.policies.add(policy).await.unwrap();

        let ticket = harness
            .engine
            .create_ticket("rs-1", &["read".to_string()], "uma-client")
            .await
            .unwrap();
        let original_id = ticket.id.clone();

        let err = harness
            .engine
            .authorize(
                &RptRequest {
                    ticket: ticket.id,
                    ..RptRequest::default()
                },
                &instruction(),
            )
            .await
            .unwrap_err();

        let UmaError::NeedInfo {
            ticket: retry_ticket,
            required_claims,
        } = err
        else {
            panic!("expected need_info");
        };
        assert_ne!(retry_ticket, original_id);
        assert_eq!(required_claims[0].name, "role");

        // Retrying with the fresh ticket and a satisfying claim token
        // succeeds.
        let key = harness.keystore.get_by_kid("sig-1").unwrap();
        let claims = ids_jose::JwsPayload::new().with("role", "administrator");
        let claim_token = JwsEngine::new().sign(&claims, &key.key).unwrap();

        let response = harness
            .engine
            .authorize(
                &RptRequest {
                    ticket: retry_ticket,
                    claim_token: Some(claim_token),
                    claim_token_format: Some(ID_TOKEN_CLAIM_FORMAT.to_string()),
                },
                &instruction(),
            )
            .await
            .unwrap();
        assert!(!response.rpt.is_empty());
    }

    #[tokio::test]
    async fn foreign_clients_cannot_redeem_the_ticket() {
        let harness = harness().await;
        harness.policies.add(open_policy()).await.unwrap();

        let ticket = harness
            .engine
            .create_ticket("rs-1", &["read".to_string()], "someone-else")
            .await
            .unwrap();

        let err = harness
            .engine
            .authorize(
                &RptRequest {
                    ticket: ticket.id,
                    ..RptRequest::default()
                },
                &instruction(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "invalid_ticket");
    }
}
