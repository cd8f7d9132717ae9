//! The token endpoint's grant dispatcher.
//!
//! Stateless per request: each grant branch authenticates the client,
//! consults the stores it needs, and either mints a
//! [`GrantedToken`] or raises a typed [`OAuthError`]. Single-use
//! artifacts (authorization codes) are redeemed through the stores'
//! atomic `take`, never via separate read-then-delete calls.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use ids_core::event::{Event, EventLogger, EventType};
use ids_core::Config;
use ids_jose::{
    random, ContentEncryptionAlgorithm, JsonWebKeySet, JweEngine, JwsEngine, JwsPayload,
    KeyManagementAlgorithm, KeyOperation, KeyStore, KeyUse,
};
use ids_model::{Client, GrantType, GrantedToken};
use ids_store::{
    AuthorizationCodeStore, ConfirmationCodeStore, ResourceOwnerStore, TokenStore,
};

use crate::claims::{AuthorizationParameter, ClaimsGenerator, Principal};
use crate::client_auth::{AuthenticationInstruction, ClientAuthenticator};
use crate::error::{OAuthError, OAuthResult};
use crate::password;
use crate::request::TokenRequest;

/// Token endpoint response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,

    /// Token type (`bearer`).
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: i64,

    /// Refresh token, when the grant issues one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// ID token, when `openid` scope was granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Granted scope (space-separated).
    pub scope: String,
}

impl From<&GrantedToken> for TokenResponse {
    fn from(token: &GrantedToken) -> Self {
        Self {
            access_token: token.access_token.clone(),
            token_type: token.token_type.clone(),
            expires_in: token.expires_in,
            refresh_token: token.refresh_token.clone(),
            id_token: token.id_token.clone(),
            scope: token.scope_string(),
        }
    }
}

/// Grant-type dispatcher for the token endpoint.
pub struct TokenIssuer {
    config: Arc<Config>,
    authenticator: Arc<ClientAuthenticator>,
    claims: Arc<ClaimsGenerator>,
    keystore: Arc<KeyStore>,
    jws: JwsEngine,
    jwe: JweEngine,
    auth_codes: Arc<dyn AuthorizationCodeStore>,
    confirmation_codes: Arc<dyn ConfirmationCodeStore>,
    tokens: Arc<dyn TokenStore>,
    owners: Arc<dyn ResourceOwnerStore>,
    events: Arc<dyn EventLogger>,
}

impl TokenIssuer {
    /// Creates a new issuer.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<Config>,
        authenticator: Arc<ClientAuthenticator>,
        claims: Arc<ClaimsGenerator>,
        keystore: Arc<KeyStore>,
        auth_codes: Arc<dyn AuthorizationCodeStore>,
        confirmation_codes: Arc<dyn ConfirmationCodeStore>,
        tokens: Arc<dyn TokenStore>,
        owners: Arc<dyn ResourceOwnerStore>,
        events: Arc<dyn EventLogger>,
    ) -> Self {
        Self {
            config,
            authenticator,
            claims,
            keystore,
            jws: JwsEngine::new(),
            jwe: JweEngine::new(),
            auth_codes,
            confirmation_codes,
            tokens,
            owners,
            events,
        }
    }

    /// Handles a token request end to end.
    ///
    /// # Errors
    ///
    /// Returns the typed protocol error of whichever branch refused
    /// the request.
    pub async fn issue(
        &self,
        request: &TokenRequest,
        authorization_header: Option<&str>,
    ) -> OAuthResult<TokenResponse> {
        let grant_type = request.parsed_grant_type()?;
        let result = self
            .dispatch(grant_type, request, authorization_header)
            .await;

        match &result {
            Ok(response) => {
                self.events
                    .log(
                        Event::builder(EventType::TokenGranted)
                            .detail("grant_type", grant_type.as_str())
                            .detail("scope", response.scope.clone())
                            .build(),
                    )
                    .await;
            }
            Err(err) => {
                tracing::debug!(
                    grant_type = grant_type.as_str(),
                    error = err.error_code(),
                    "token request refused"
                );
                self.events
                    .log(
                        Event::builder(EventType::TokenGrantError)
                            .failure(err.error_code())
                            .detail("grant_type", grant_type.as_str())
                            .build(),
                    )
                    .await;
            }
        }
        result
    }

    async fn dispatch(
        &self,
        grant_type: GrantType,
        request: &TokenRequest,
        authorization_header: Option<&str>,
    ) -> OAuthResult<TokenResponse> {
        let instruction = AuthenticationInstruction::from_parts(authorization_header, request)?;
        match grant_type {
            GrantType::AuthorizationCode => {
                self.by_authorization_code(request, &instruction).await
            }
            GrantType::ClientCredentials => {
                self.by_client_credentials(request, &instruction).await
            }
            GrantType::Password => self.by_resource_owner_password(request, &instruction).await,
            GrantType::RefreshToken => self.by_refresh_token(request, &instruction).await,
            GrantType::JwtBearer => self.by_jwt_bearer(&instruction).await,
            GrantType::Implicit | GrantType::UmaTicket => Err(OAuthError::UnsupportedGrantType(
                grant_type.as_str().to_string(),
            )),
        }
    }

    /// `authorization_code`: redeem a single-use code.
    async fn by_authorization_code(
        &self,
        request: &TokenRequest,
        instruction: &AuthenticationInstruction,
    ) -> OAuthResult<TokenResponse> {
        let code_value = request
            .code
            .as_deref()
            .ok_or_else(|| OAuthError::InvalidRequest("code is required".to_string()))?;
        let redirect_uri = request
            .redirect_uri
            .as_deref()
            .ok_or_else(|| OAuthError::InvalidRequest("redirect_uri is required".to_string()))?;

        // Atomic fetch-and-delete: a second redemption of the same code
        // finds nothing, whatever else happens below.
        let code = self
            .auth_codes
            .take(code_value)
            .await?
            .ok_or_else(|| OAuthError::InvalidGrant("invalid authorization code".to_string()))?;

        if code.is_expired() {
            return Err(OAuthError::InvalidGrant(
                "authorization code has expired".to_string(),
            ));
        }

        let client = self.authenticator.authenticate(instruction).await?;
        self.require_grant_type(&client, GrantType::AuthorizationCode)?;

        if code.client_id != client.client_id {
            return Err(OAuthError::InvalidGrant(
                "authorization code was not issued to this client".to_string(),
            ));
        }
        if code.redirect_uri != redirect_uri {
            return Err(OAuthError::InvalidGrant(
                "redirect_uri does not match the authorization request".to_string(),
            ));
        }

        let principal = self.load_principal(&code.subject).await?;
        let mut parameter = AuthorizationParameter::new(client.client_id.clone(), code.scopes.clone());
        parameter.nonce = code.nonce.clone();

        let token = self
            .mint_token(
                &client,
                Some(&code.subject),
                code.scopes.clone(),
                true,
                Some((&principal, &parameter)),
            )
            .await?;
        Ok(TokenResponse::from(&token))
    }

    /// `client_credentials`: service-to-service, access token only.
    async fn by_client_credentials(
        &self,
        request: &TokenRequest,
        instruction: &AuthenticationInstruction,
    ) -> OAuthResult<TokenResponse> {
        let client = self.authenticator.authenticate(instruction).await?;
        self.require_grant_type(&client, GrantType::ClientCredentials)?;

        let requested = request.scopes();
        let scopes: Vec<String> = if requested.is_empty() {
            client.allowed_scopes.clone()
        } else {
            if !client.allows_scopes(requested.iter().copied()) {
                return Err(OAuthError::InvalidScope(format!(
                    "scope '{}' exceeds the client's allowed scopes",
                    request.scope.as_deref().unwrap_or_default()
                )));
            }
            requested.iter().map(ToString::to_string).collect()
        };

        let token = self.mint_token(&client, None, scopes, false, None).await?;
        Ok(TokenResponse::from(&token))
    }

    /// `password`: resource-owner credentials, hashed-password compare.
    async fn by_resource_owner_password(
        &self,
        request: &TokenRequest,
        instruction: &AuthenticationInstruction,
    ) -> OAuthResult<TokenResponse> {
        let client = self.authenticator.authenticate(instruction).await?;
        self.require_grant_type(&client, GrantType::Password)?;

        let username = request
            .username
            .as_deref()
            .ok_or_else(|| OAuthError::InvalidRequest("username is required".to_string()))?;
        let presented = request
            .password
            .as_deref()
            .ok_or_else(|| OAuthError::InvalidRequest("password is required".to_string()))?;

        let owner = self.owners.get_by_username(username).await?;
        // A missing owner and a wrong password are indistinguishable.
        let owner = match owner {
            Some(owner) if password::verify_password(presented, &owner.password_hash) => owner,
            _ => {
                self.events
                    .log(
                        Event::builder(EventType::ResourceOwnerAuthenticationError)
                            .failure("invalid_grant")
                            .client(client.client_id.clone())
                            .build(),
                    )
                    .await;
                return Err(OAuthError::InvalidGrant(
                    "resource owner credentials are not valid".to_string(),
                ));
            }
        };

        if owner.two_factor_required {
            return Err(OAuthError::InvalidGrant(
                "additional confirmation is required for this account".to_string(),
            ));
        }

        self.events
            .log(
                Event::builder(EventType::ResourceOwnerAuthenticated)
                    .subject(owner.subject.clone())
                    .client(client.client_id.clone())
                    .build(),
            )
            .await;

        let scopes: Vec<String> = request.scopes().iter().map(ToString::to_string).collect();
        let principal = principal_from_owner(&owner);
        let parameter = AuthorizationParameter::new(client.client_id.clone(), scopes.clone());

        let token = self
            .mint_token(
                &client,
                Some(&owner.subject),
                scopes,
                true,
                Some((&principal, &parameter)),
            )
            .await?;
        Ok(TokenResponse::from(&token))
    }

    /// `refresh_token`: supersede a still-valid grant.
    async fn by_refresh_token(
        &self,
        request: &TokenRequest,
        instruction: &AuthenticationInstruction,
    ) -> OAuthResult<TokenResponse> {
        let refresh_token = request
            .refresh_token
            .as_deref()
            .ok_or_else(|| OAuthError::InvalidRequest("refresh_token is required".to_string()))?;

        let previous = self
            .tokens
            .get_by_refresh_token(refresh_token)
            .await?
            .ok_or_else(|| OAuthError::InvalidGrant("invalid refresh token".to_string()))?;

        let refresh_expires = previous.created_at
            + chrono::Duration::seconds(self.config.tokens.refresh_token_lifetime);
        if chrono::Utc::now() >= refresh_expires {
            return Err(OAuthError::InvalidGrant(
                "refresh token has expired".to_string(),
            ));
        }

        let client = self.authenticator.authenticate(instruction).await?;
        self.require_grant_type(&client, GrantType::RefreshToken)?;

        if previous.client_id != client.client_id {
            return Err(OAuthError::InvalidGrant(
                "refresh token was not issued to this client".to_string(),
            ));
        }

        // Scope may only narrow on refresh.
        let requested = request.scopes();
        let scopes: Vec<String> = if requested.is_empty() {
            previous.scopes.clone()
        } else {
            if !requested
                .iter()
                .all(|s| previous.scopes.iter().any(|p| p == s))
            {
                return Err(OAuthError::InvalidScope(
                    "requested scope exceeds the original grant".to_string(),
                ));
            }
            requested.iter().map(ToString::to_string).collect()
        };

        // The superseded token stops working before its replacement
        // becomes visible.
        self.tokens.remove(&previous.access_token).await?;

        let id_token_context = match &previous.subject {
            Some(subject) => {
                let principal = self.load_principal(subject).await?;
                let parameter =
                    AuthorizationParameter::new(client.client_id.clone(), scopes.clone());
                Some((principal, parameter))
            }
            None => None,
        };

        let token = self
            .mint_token(
                &client,
                previous.subject.as_deref(),
                scopes,
                true,
                id_token_context.as_ref().map(|(p, a)| (p, a)),
            )
            .await?;

        self.events
            .log(
                Event::builder(EventType::TokenRefreshed)
                    .client(client.client_id.clone())
                    .build(),
            )
            .await;
        Ok(TokenResponse::from(&token))
    }

    /// JWT-bearer: the client assertion is the grant.
    async fn by_jwt_bearer(
        &self,
        instruction: &AuthenticationInstruction,
    ) -> OAuthResult<TokenResponse> {
        let (client, assertion) = self.authenticator.authenticate_assertion(instruction).await?;
        self.require_grant_type(&client, GrantType::JwtBearer)?;

        // The token is scoped to what the assertion claims, bounded by
        // the client's registration.
        let scopes: Vec<String> = assertion.scopes().iter().map(ToString::to_string).collect();
        if !client.allows_scopes(scopes.iter().map(String::as_str)) {
            return Err(OAuthError::InvalidScope(
                "assertion scope exceeds the client's allowed scopes".to_string(),
            ));
        }
        let subject = assertion.subject().map(String::from);

        let token = self
            .mint_token(&client, subject.as_deref(), scopes, false, None)
            .await?;
        Ok(TokenResponse::from(&token))
    }

    /// Redeems a one-time confirmation code for a subject.
    ///
    /// The code is consumed atomically whatever the outcome; a second
    /// presentation fails.
    ///
    /// # Errors
    ///
    /// Returns `invalid_grant` if the code is unknown, expired, or
    /// bound to a different subject.
    pub async fn redeem_confirmation_code(&self, subject: &str, value: &str) -> OAuthResult<()> {
        let code = self
            .confirmation_codes
            .take(value)
            .await?
            .ok_or_else(|| OAuthError::InvalidGrant("invalid confirmation code".to_string()))?;

        if code.is_expired() {
            return Err(OAuthError::InvalidGrant(
                "confirmation code has expired".to_string(),
            ));
        }
        if code.subject != subject {
            return Err(OAuthError::InvalidGrant(
                "confirmation code was issued to a different subject".to_string(),
            ));
        }

        self.events
            .log(
                Event::builder(EventType::ConfirmationCodeRedeemed)
                    .subject(subject.to_string())
                    .build(),
            )
            .await;
        Ok(())
    }

    /// Checks the client's registration covers the grant type.
    fn require_grant_type(&self, client: &Client, grant_type: GrantType) -> OAuthResult<()> {
        if client.supports_grant_type(grant_type) {
            Ok(())
        } else {
            Err(OAuthError::UnauthorizedClient(format!(
                "client '{}' is not authorized for {}",
                client.client_id, grant_type
            )))
        }
    }

    /// Loads a principal from the directory, degrading to a bare
    /// subject when the directory has no record.
    async fn load_principal(&self, subject: &str) -> OAuthResult<Principal> {
        Ok(match self.owners.get_by_subject(subject).await? {
            Some(owner) => principal_from_owner(&owner),
            None => Principal::new(subject),
        })
    }

    /// Mints, signs, records, and returns a granted token.
    async fn mint_token(
        &self,
        client: &Client,
        subject: Option<&str>,
        scopes: Vec<String>,
        include_refresh: bool,
        id_token_context: Option<(&Principal, &AuthorizationParameter)>,
    ) -> OAuthResult<GrantedToken> {
        let mut token = GrantedToken::bearer(
            random::random_base64url(32),
            client.client_id.clone(),
            scopes.clone(),
            self.config.tokens.access_token_lifetime,
        );
        token.subject = subject.map(String::from);
        if include_refresh {
            token.refresh_token = Some(random::random_base64url(32));
        }

        if let Some((principal, parameter)) = id_token_context
            && scopes.iter().any(|s| s == "openid")
        {
            let payload = self
                .claims
                .generate_id_token_claims(principal, parameter)
                .await?;
            token.id_token = Some(self.sign_id_token(&payload, client)?);
            token.id_token_payload = Some(payload.into());
        }

        self.tokens.add(token.clone()).await?;
        Ok(token)
    }

    /// Signs an ID-token claim set with the client's preferred
    /// algorithm, then encrypts it to the client when its registration
    /// asks for an encrypted ID token.
    fn sign_id_token(&self, payload: &JwsPayload, client: &Client) -> OAuthResult<String> {
        let alg = client
            .id_token_signed_response_alg
            .clone()
            .unwrap_or_else(|| self.config.crypto.default_signature_algorithm.clone());

        let key = self
            .keystore
            .get_by_alg(KeyUse::Sig, &alg, &[KeyOperation::Sign])
            .or_else(|| self.keystore.default_signing_key())
            .ok_or_else(|| OAuthError::ServerError("no signing key available".to_string()))?;

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

        // Encrypt to the client's registered key when it has one;
        // otherwise hand back the signed token unencrypted.
        match client_encryption_key(client) {
            Some(peer_key) => Ok(self.jwe.encrypt(&signed, &peer_key, alg, enc)?),
            None => Ok(signed),
        }
    }
}

/// Turns a directory record into a claims principal.
fn principal_from_owner(owner: &ids_model::ResourceOwner) -> Principal {
    Principal {
        subject: owner.subject.clone(),
        authentication_instant: Some(owner.updated_at),
        claims: owner.claims.clone(),
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
