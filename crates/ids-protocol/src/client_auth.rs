//! Client authentication at the token endpoint.
//!
//! The strategy is a closed set selected once from the client's
//! registered `token_endpoint_auth_method`:
//!
//! - `client_secret_basic` / `client_secret_post`: constant-time
//!   comparison of the presented shared secret
//! - `private_key_jwt`: JWS assertion verified against the client's
//!   registered JWKS (RFC 7523)
//! - `client_secret_jwt`: JWE assertion decrypted with the shared
//!   secret (PBES2), then the inner JWS verified with it
//! - `none`: public clients
//!
//! JWT assertions are replay-protected: the `jti` is recorded in the
//! replay cache *before* the remaining claims are validated, so an
//! assertion that fails `sub`/`aud`/`exp` validation still burns its
//! identifier and cannot be replayed once fixed.

use std::sync::Arc;

use aws_lc_rs::constant_time::verify_slices_are_equal;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::Utc;

use ids_core::event::{Event, EventLogger, EventType};
use ids_jose::claims::names;
use ids_jose::{JsonWebKey, JsonWebKeySet, JweEngine, JwsEngine, JwsPayload, KeyUse};
use ids_model::{Client, TokenEndpointAuthMethod};
use ids_store::{ClientStore, JtiReplayCache};

use crate::error::{OAuthError, OAuthResult};
use crate::request::TokenRequest;

/// The only client-assertion type this server accepts (RFC 7523).
pub const CLIENT_ASSERTION_TYPE_JWT_BEARER: &str =
    "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Everything a token-endpoint request presented for client
/// authentication, before a strategy has been chosen.
#[derive(Debug, Clone, Default)]
pub struct AuthenticationInstruction {
    /// Client ID from the Basic Authorization header.
    pub client_id_from_header: Option<String>,

    /// Client secret from the Basic Authorization header.
    pub client_secret_from_header: Option<String>,

    /// Client ID from the request body.
    pub client_id_from_body: Option<String>,

    /// Client secret from the request body.
    pub client_secret_from_body: Option<String>,

    /// Client assertion (JWT) from the request body.
    pub client_assertion: Option<String>,

    /// Client assertion type from the request body.
    pub client_assertion_type: Option<String>,
}

impl AuthenticationInstruction {
    /// Builds an instruction from the Authorization header and the
    /// parsed request body.
    ///
    /// # Errors
    ///
    /// Returns `invalid_client` if a Basic header is present but
    /// malformed.
    pub fn from_parts(
        authorization_header: Option<&str>,
        request: &TokenRequest,
    ) -> OAuthResult<Self> {
        let mut instruction = Self {
            client_id_from_body: request.client_id.clone(),
            client_secret_from_body: request.client_secret.clone(),
            client_assertion: request.client_assertion.clone(),
            client_assertion_type: request.client_assertion_type.clone(),
            ..Self::default()
        };

        if let Some(header) = authorization_header
            && let Some(encoded) = header.strip_prefix("Basic ")
        {
            let decoded = STANDARD
                .decode(encoded.trim())
                .map_err(|_| OAuthError::InvalidClient("invalid basic auth encoding".to_string()))?;
            let credentials = String::from_utf8(decoded)
                .map_err(|_| OAuthError::InvalidClient("invalid basic auth encoding".to_string()))?;
            let (client_id, client_secret) = credentials.split_once(':').ok_or_else(|| {
                OAuthError::InvalidClient("invalid basic auth format".to_string())
            })?;

            instruction.client_id_from_header = Some(
                urlencoding::decode(client_id)
                    .map_err(|_| {
                        OAuthError::InvalidClient("invalid client_id encoding".to_string())
                    })?
                    .into_owned(),
            );
            instruction.client_secret_from_header = Some(
                urlencoding::decode(client_secret)
                    .map_err(|_| {
                        OAuthError::InvalidClient("invalid client_secret encoding".to_string())
                    })?
                    .into_owned(),
            );
        }

        Ok(instruction)
    }

    /// Returns the client ID presented in the header or body.
    #[must_use]
    pub fn presented_client_id(&self) -> Option<&str> {
        self.client_id_from_header
            .as_deref()
            .or(self.client_id_from_body.as_deref())
    }

    /// Returns whether a JWT-bearer client assertion is present.
    #[must_use]
    pub fn has_assertion(&self) -> bool {
        self.client_assertion.is_some()
            && self.client_assertion_type.as_deref() == Some(CLIENT_ASSERTION_TYPE_JWT_BEARER)
    }
}

/// Authenticates clients at the token endpoint.
pub struct ClientAuthenticator {
    clients: Arc<dyn ClientStore>,
    jti_cache: Arc<dyn JtiReplayCache>,
    jws: JwsEngine,
    jwe: JweEngine,
    issuer_name: String,
    events: Arc<dyn EventLogger>,
}

impl ClientAuthenticator {
    /// Creates a new authenticator.
    pub fn new(
        clients: Arc<dyn ClientStore>,
        jti_cache: Arc<dyn JtiReplayCache>,
        issuer_name: impl Into<String>,
        events: Arc<dyn EventLogger>,
    ) -> Self {
        Self {
            clients,
            jti_cache,
            jws: JwsEngine::new(),
            jwe: JweEngine::new(),
            issuer_name: issuer_name.into(),
            events,
        }
    }

    /// Authenticates a client and returns its registration.
    ///
    /// # Errors
    ///
    /// Returns `invalid_client` when the client is unknown, the
    /// credentials do not match, or the instruction lacks what the
    /// registered method requires.
    pub async fn authenticate(
        &self,
        instruction: &AuthenticationInstruction,
    ) -> OAuthResult<Client> {
        match self.authenticate_inner(instruction).await {
            Ok((client, _)) => {
                self.events
                    .log(
                        Event::builder(EventType::ClientAuthenticated)
                            .client(client.client_id.clone())
                            .detail("method", client.token_endpoint_auth_method.as_str())
                            .build(),
                    )
                    .await;
                Ok(client)
            }
            Err(err) => {
                self.events
                    .log(
                        Event::builder(EventType::ClientAuthenticationError)
                            .failure(err.error_code())
                            .build(),
                    )
                    .await;
                Err(err)
            }
        }
    }

    /// Authenticates a client via its JWT assertion and returns the
    /// verified assertion payload alongside the registration.
    ///
    /// This is the entry point for the JWT-bearer grant, where the
    /// assertion is both the client authentication and the grant.
    ///
    /// # Errors
    ///
    /// Returns `invalid_client` if the assertion is missing, does not
    /// verify, replays a known `jti`, or fails claim validation.
    pub async fn authenticate_assertion(
        &self,
        instruction: &AuthenticationInstruction,
    ) -> OAuthResult<(Client, JwsPayload)> {
        if !instruction.has_assertion() {
            return Err(OAuthError::InvalidClient(
                "client_assertion and client_assertion_type are required".to_string(),
            ));
        }
        let (client, payload) = self.authenticate_inner(instruction).await?;
        let payload = payload.ok_or_else(|| {
            OAuthError::InvalidClient(
                "client is not registered for assertion authentication".to_string(),
            )
        })?;
        Ok((client, payload))
    }

    /// Resolves the client and runs its registered strategy. Returns
    /// the verified assertion payload for the JWT strategies.
    async fn authenticate_inner(
        &self,
        instruction: &AuthenticationInstruction,
    ) -> OAuthResult<(Client, Option<JwsPayload>)> {
        let client_id = self.resolve_client_id(instruction)?;
        let client = self
            .clients
            .get(&client_id)
            .await?
            .ok_or_else(|| OAuthError::InvalidClient(format!("unknown client '{client_id}'")))?;

        let payload = match client.token_endpoint_auth_method {
            TokenEndpointAuthMethod::ClientSecretBasic => {
                let presented = instruction.client_secret_from_header.as_deref().ok_or_else(
                    || OAuthError::InvalidClient("client_secret is required in the Authorization header".to_string()),
                )?;
                self.verify_shared_secret(&client, presented)?;
                None
            }
            TokenEndpointAuthMethod::ClientSecretPost => {
                let presented = instruction.client_secret_from_body.as_deref().ok_or_else(
                    || OAuthError::InvalidClient("client_secret is required in the request body".to_string()),
                )?;
                self.verify_shared_secret(&client, presented)?;
                None
            }
            TokenEndpointAuthMethod::PrivateKeyJwt => {
                Some(self.verify_private_key_jwt(&client, instruction).await?)
            }
            TokenEndpointAuthMethod::ClientSecretJwt => {
                Some(self.verify_client_secret_jwt(&client, instruction).await?)
            }
            TokenEndpointAuthMethod::None => {
                if client.secret.is_some() {
                    return Err(OAuthError::InvalidClient(
                        "confidential client requires authentication".to_string(),
                    ));
                }
                None
            }
        };

        Ok((client, payload))
    }

    /// Picks the client ID out of the instruction: from the assertion
    /// when one is present, from the header or body otherwise.
    fn resolve_client_id(&self, instruction: &AuthenticationInstruction) -> OAuthResult<String> {
        if instruction.has_assertion() {
            let assertion = instruction
                .client_assertion
                .as_deref()
                .unwrap_or_default();
            return match assertion.split('.').count() {
                // A JWE assertion hides the issuer; take the body's word
                // for it, the decryption will hold it to account.
                5 => instruction
                    .client_id_from_body
                    .clone()
                    .ok_or_else(|| {
                        OAuthError::InvalidClient(
                            "client_id is required alongside an encrypted assertion".to_string(),
                        )
                    }),
                3 => unverified_issuer(assertion).ok_or_else(|| {
                    OAuthError::InvalidClient(
                        "client_assertion carries no issuer".to_string(),
                    )
                }),
                _ => Err(OAuthError::InvalidClient(
                    "client_assertion is not a JWT".to_string(),
                )),
            };
        }

        instruction
            .presented_client_id()
            .map(String::from)
            .ok_or_else(|| OAuthError::InvalidRequest("client_id is required".to_string()))
    }

    /// Constant-time comparison of the presented secret.
    fn verify_shared_secret(&self, client: &Client, presented: &str) -> OAuthResult<()> {
        let registered = client.secret.as_deref().ok_or_else(|| {
            OAuthError::InvalidClient("client has no registered secret".to_string())
        })?;
        verify_slices_are_equal(registered.as_bytes(), presented.as_bytes())
            .map_err(|_| OAuthError::InvalidClient("invalid client credentials".to_string()))
    }

    /// `private_key_jwt`: signed assertion against the client's JWKS.
    async fn verify_private_key_jwt(
        &self,
        client: &Client,
        instruction: &AuthenticationInstruction,
    ) -> OAuthResult<JwsPayload> {
        let assertion = instruction.client_assertion.as_deref().ok_or_else(|| {
            OAuthError::InvalidClient("client_assertion is required".to_string())
        })?;

        let keys = client_verification_keys(client);
        if keys.is_empty() {
            return Err(OAuthError::InvalidClient(
                "client has no registered verification keys".to_string(),
            ));
        }

        let header = self
            .jws
            .get_header(assertion)
            .ok_or_else(|| OAuthError::InvalidClient("client_assertion is not a JWS".to_string()))?;
        let payload = keys
            .iter()
            .filter(|key| header.kid.as_deref().is_none_or(|kid| kid == key.kid))
            .find_map(|key| self.jws.parse(assertion, key))
            .ok_or_else(|| {
                OAuthError::InvalidClient("client_assertion signature is not correct".to_string())
            })?;

        self.validate_assertion_claims(client, &payload).await?;
        Ok(payload)
    }

    /// `client_secret_jwt`: JWE assertion decrypted with the shared
    /// secret, then the inner JWS verified with it.
    async fn verify_client_secret_jwt(
        &self,
        client: &Client,
        instruction: &AuthenticationInstruction,
    ) -> OAuthResult<JwsPayload> {
        let assertion = instruction.client_assertion.as_deref().ok_or_else(|| {
            OAuthError::InvalidClient("client_assertion is required".to_string())
        })?;
        let secret = client.secret.as_deref().ok_or_else(|| {
            OAuthError::InvalidClient("client has no registered secret".to_string())
        })?;

        let inner = self
            .jwe
            .parse_with_password(assertion, secret)
            .ok_or_else(|| {
                OAuthError::InvalidClient("client_assertion cannot be decrypted".to_string())
            })?;

        let header = self.jws.get_header(&inner).ok_or_else(|| {
            OAuthError::InvalidClient("decrypted assertion is not a JWS".to_string())
        })?;
        let key = JsonWebKey::from_secret(
            header.kid.clone().unwrap_or_else(|| client.client_id.clone()),
            KeyUse::Sig,
            header.alg.clone(),
            secret.as_bytes(),
        );
        let payload = self.jws.parse(&inner, &key).ok_or_else(|| {
            OAuthError::InvalidClient("assertion signature is not correct".to_string())
        })?;

        self.validate_assertion_claims(client, &payload).await?;
        Ok(payload)
    }

    /// RFC 7523 §3 claim validation, with the replay check first.
    ///
    /// The `jti` is burned before `sub`/`aud`/`exp` are examined, so a
    /// partially invalid assertion cannot be replayed after the client
    /// repairs it.
    async fn validate_assertion_claims(
        &self,
        client: &Client,
        payload: &JwsPayload,
    ) -> OAuthResult<()> {
        let jti = payload.jti().ok_or_else(|| {
            OAuthError::InvalidClient("client_assertion has no jti".to_string())
        })?;
        if !self.jti_cache.check_and_insert(jti).await? {
            return Err(OAuthError::InvalidClient(
                "client_assertion has already been presented".to_string(),
            ));
        }

        let issuer = payload.issuer().unwrap_or_default();
        let subject = payload.subject().unwrap_or_default();
        if issuer != client.client_id || subject != client.client_id {
            return Err(OAuthError::InvalidClient(
                "assertion issuer and subject must both be the client".to_string(),
            ));
        }

        if !payload.has_audience(&self.issuer_name) {
            return Err(OAuthError::InvalidClient(
                "assertion audience does not include this issuer".to_string(),
            ));
        }

        let exp = payload.expiration_time().ok_or_else(|| {
            OAuthError::InvalidClient("client_assertion has no expiration".to_string())
        })?;
        if Utc::now().timestamp() >= exp {
            return Err(OAuthError::InvalidClient(
                "client_assertion has expired".to_string(),
            ));
        }

        Ok(())
    }
}

/// Reads the issuer claim of a JWS without verifying the signature.
///
/// Only used to pick which client registration to load; nothing is
/// trusted until the signature has been verified against that
/// registration's keys.
fn unverified_issuer(assertion: &str) -> Option<String> {
    let payload_b64 = assertion.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
    let payload = JwsPayload::from_bytes(&bytes).ok()?;
    payload.claim_str(names::ISS).map(String::from)
}

/// Collects the client's registered signature-verification keys.
fn client_verification_keys(client: &Client) -> Vec<JsonWebKey> {
    let Some(document) = &client.jwks else {
        return Vec::new();
    };
    let Ok(set) = serde_json::from_value::<JsonWebKeySet>(document.clone()) else {
        return Vec::new();
    };
    set.keys
        .iter()
        .filter_map(ids_jose::PublicJsonWebKey::to_key)
        .filter(|key| key.key_use == KeyUse::Sig)
        .collect()
}
