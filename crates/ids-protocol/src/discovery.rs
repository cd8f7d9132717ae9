//! Discovery document (OpenID Connect Discovery 1.0 / RFC 8414).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use ids_core::Config;
use ids_store::ScopeStore;

use crate::error::OAuthResult;

/// Provider metadata served at `/.well-known/openid-configuration`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    /// Issuer identifier.
    pub issuer: String,

    /// Authorization endpoint URL.
    pub authorization_endpoint: String,

    /// Token endpoint URL.
    pub token_endpoint: String,

    /// JWKS endpoint URL.
    pub jwks_uri: String,

    /// Introspection endpoint URL.
    pub introspection_endpoint: String,

    /// Revocation endpoint URL.
    pub revocation_endpoint: String,

    /// Supported response types.
    pub response_types_supported: Vec<String>,

    /// Supported grant types.
    pub grant_types_supported: Vec<String>,

    /// Supported subject identifier types.
    pub subject_types_supported: Vec<String>,

    /// Supported token-endpoint client authentication methods.
    pub token_endpoint_auth_methods_supported: Vec<String>,

    /// Supported ID-token signing algorithms.
    pub id_token_signing_alg_values_supported: Vec<String>,

    /// Supported ID-token encryption (`alg`) values.
    pub id_token_encryption_alg_values_supported: Vec<String>,

    /// Supported ID-token encryption (`enc`) values.
    pub id_token_encryption_enc_values_supported: Vec<String>,

    /// Scopes exposed by the scope registry.
    pub scopes_supported: Vec<String>,
}

impl DiscoveryDocument {
    /// Builds the capability advertisement from configuration and the
    /// scope registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope registry cannot be read.
    pub async fn build(config: &Arc<Config>, scopes: &Arc<dyn ScopeStore>) -> OAuthResult<Self> {
        let base = config.issuer.base_url.trim_end_matches('/');

        let mut exposed: Vec<String> = scopes
            .get_all()
            .await?
            .into_iter()
            .filter(|s| s.is_exposed)
            .map(|s| s.name)
            .collect();
        exposed.sort();

        Ok(Self {
            issuer: config.issuer.name.clone(),
            authorization_endpoint: format!("{base}/authorization"),
            token_endpoint: format!("{base}/token"),
            jwks_uri: format!("{base}/jwks"),
            introspection_endpoint: format!("{base}/introspect"),
            revocation_endpoint: format!("{base}/token/revoke"),
            response_types_supported: vec![
                "code".to_string(),
                "token".to_string(),
                "id_token".to_string(),
            ],
            grant_types_supported: vec![
                "authorization_code".to_string(),
                "client_credentials".to_string(),
                "password".to_string(),
                "refresh_token".to_string(),
                "urn:ietf:params:oauth:grant-type:jwt-bearer".to_string(),
                "urn:ietf:params:oauth:grant-type:uma-ticket".to_string(),
            ],
            subject_types_supported: vec!["public".to_string()],
            token_endpoint_auth_methods_supported: vec![
                "client_secret_basic".to_string(),
                "client_secret_post".to_string(),
                "client_secret_jwt".to_string(),
                "private_key_jwt".to_string(),
                "none".to_string(),
            ],
            id_token_signing_alg_values_supported: vec![
                "HS256".to_string(),
                "HS384".to_string(),
                "HS512".to_string(),
                "RS256".to_string(),
                "RS384".to_string(),
                "RS512".to_string(),
                "PS256".to_string(),
                "PS384".to_string(),
                "PS512".to_string(),
                "ES256".to_string(),
                "ES384".to_string(),
                "ES512".to_string(),
            ],
            id_token_encryption_alg_values_supported: vec![
                "RSA1_5".to_string(),
                "RSA-OAEP".to_string(),
                "RSA-OAEP-256".to_string(),
                "A128KW".to_string(),
                "A256KW".to_string(),
            ],
            id_token_encryption_enc_values_supported: vec![
                "A128CBC-HS256".to_string(),
                "A256CBC-HS512".to_string(),
                "A128GCM".to_string(),
                "A256GCM".to_string(),
            ],
            scopes_supported: exposed,
        })
    }
}
