//! Client domain model.
//!
//! Clients represent applications registered with the server that can
//! request tokens (OAuth 2.0 / OIDC relying parties and UMA clients).
//! The registry that owns these records is external; the protocol
//! engine only ever reads them.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// OAuth 2.0 grant types a client may use at the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// `authorization_code` grant.
    AuthorizationCode,
    /// `client_credentials` grant.
    ClientCredentials,
    /// Resource-owner `password` grant.
    Password,
    /// `refresh_token` grant.
    RefreshToken,
    /// `implicit` grant (authorization endpoint only).
    Implicit,
    /// JWT-bearer assertion grant (RFC 7523).
    #[serde(rename = "urn:ietf:params:oauth:grant-type:jwt-bearer")]
    JwtBearer,
    /// UMA ticket grant.
    #[serde(rename = "urn:ietf:params:oauth:grant-type:uma-ticket")]
    UmaTicket,
}

impl GrantType {
    /// Returns the wire name of the grant type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::Password => "password",
            Self::RefreshToken => "refresh_token",
            Self::Implicit => "implicit",
            Self::JwtBearer => "urn:ietf:params:oauth:grant-type:jwt-bearer",
            Self::UmaTicket => "urn:ietf:params:oauth:grant-type:uma-ticket",
        }
    }
}

impl FromStr for GrantType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorization_code" => Ok(Self::AuthorizationCode),
            "client_credentials" => Ok(Self::ClientCredentials),
            "password" => Ok(Self::Password),
            "refresh_token" => Ok(Self::RefreshToken),
            "implicit" => Ok(Self::Implicit),
            "urn:ietf:params:oauth:grant-type:jwt-bearer" => Ok(Self::JwtBearer),
            "urn:ietf:params:oauth:grant-type:uma-ticket" => Ok(Self::UmaTicket),
            other => Err(format!("unknown grant type: {other}")),
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response types a client may request at the authorization endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// `code` response type.
    Code,
    /// `token` response type.
    Token,
    /// `id_token` response type.
    IdToken,
}

/// Client authentication methods at the token endpoint.
///
/// A closed set: the method registered for the client decides which
/// authentication strategy runs, once, at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenEndpointAuthMethod {
    /// `client_secret_basic` - shared secret in the Authorization header.
    #[default]
    ClientSecretBasic,
    /// `client_secret_post` - shared secret in the request body.
    ClientSecretPost,
    /// `client_secret_jwt` - JWE assertion encrypted with the shared secret.
    ClientSecretJwt,
    /// `private_key_jwt` - JWS assertion signed with the client's key.
    PrivateKeyJwt,
    /// No authentication (public client).
    None,
}

impl TokenEndpointAuthMethod {
    /// Returns the wire name of the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClientSecretBasic => "client_secret_basic",
            Self::ClientSecretPost => "client_secret_post",
            Self::ClientSecretJwt => "client_secret_jwt",
            Self::PrivateKeyJwt => "private_key_jwt",
            Self::None => "none",
        }
    }
}

/// A registered client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// Unique client identifier (OAuth `client_id`).
    pub client_id: String,

    /// Shared secret (confidential clients only).
    pub secret: Option<String>,

    /// Display name.
    pub name: Option<String>,

    /// Allowed redirect URIs (exact-match comparison).
    pub redirect_uris: Vec<String>,

    /// Grant types the client may use.
    pub grant_types: Vec<GrantType>,

    /// Response types the client may request.
    pub response_types: Vec<ResponseType>,

    /// Registered client authentication method.
    pub token_endpoint_auth_method: TokenEndpointAuthMethod,

    /// Scope names the client is allowed to request.
    pub allowed_scopes: Vec<String>,

    /// Client's registered public keys, as a raw JWK Set document
    /// (used for `private_key_jwt` and for encrypting tokens to the
    /// client).
    pub jwks: Option<serde_json::Value>,

    /// Preferred JWS algorithm for ID tokens issued to this client.
    pub id_token_signed_response_alg: Option<String>,

    /// JWE key-management algorithm for ID tokens, when the client
    /// requires encrypted ID tokens.
    pub id_token_encrypted_response_alg: Option<String>,

    /// JWE content-encryption algorithm paired with
    /// `id_token_encrypted_response_alg`.
    pub id_token_encrypted_response_enc: Option<String>,

    /// Custom attributes.
    pub attributes: HashMap<String, String>,
}

impl Client {
    /// Creates a confidential client with sensible defaults.
    #[must_use]
    pub fn confidential(client_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            secret: Some(secret.into()),
            name: None,
            redirect_uris: Vec::new(),
            grant_types: vec![GrantType::AuthorizationCode],
            response_types: vec![ResponseType::Code],
            token_endpoint_auth_method: TokenEndpointAuthMethod::ClientSecretBasic,
            allowed_scopes: Vec::new(),
            jwks: None,
            id_token_signed_response_alg: None,
            id_token_encrypted_response_alg: None,
            id_token_encrypted_response_enc: None,
            attributes: HashMap::new(),
        }
    }

    /// Creates a public client (no secret, no token-endpoint auth).
    #[must_use]
    pub fn public(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            secret: None,
            name: None,
            redirect_uris: Vec::new(),
            grant_types: vec![GrantType::AuthorizationCode],
            response_types: vec![ResponseType::Code],
            token_endpoint_auth_method: TokenEndpointAuthMethod::None,
            allowed_scopes: Vec::new(),
            jwks: None,
            id_token_signed_response_alg: None,
            id_token_encrypted_response_alg: None,
            id_token_encrypted_response_enc: None,
            attributes: HashMap::new(),
        }
    }

    /// Returns whether the client may use the given grant type.
    #[must_use]
    pub fn supports_grant_type(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }

    /// Returns whether the client may request the given response type.
    #[must_use]
    pub fn supports_response_type(&self, response_type: ResponseType) -> bool {
        self.response_types.contains(&response_type)
    }

    /// Returns whether every requested scope is in the allowed set.
    #[must_use]
    pub fn allows_scopes<'a>(&self, requested: impl IntoIterator<Item = &'a str>) -> bool {
        requested
            .into_iter()
            .all(|s| self.allowed_scopes.iter().any(|a| a == s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_type_round_trips_wire_names() {
        for grant in [
            GrantType::AuthorizationCode,
            GrantType::ClientCredentials,
            GrantType::Password,
            GrantType::RefreshToken,
            GrantType::JwtBearer,
            GrantType::UmaTicket,
        ] {
            assert_eq!(grant.as_str().parse::<GrantType>().unwrap(), grant);
        }
    }

    #[test]
    fn unknown_grant_type_is_rejected() {
        assert!("device_code".parse::<GrantType>().is_err());
    }

    #[test]
    fn scope_containment() {
        let mut client = Client::confidential("web", "secret");
        client.allowed_scopes = vec!["profile".to_string(), "email".to_string()];

        assert!(client.allows_scopes(["profile"]));
        assert!(client.allows_scopes(["profile", "email"]));
        assert!(!client.allows_scopes(["profile", "admin"]));
    }

    #[test]
    fn public_client_has_no_secret() {
        let client = Client::public("spa");
        assert!(client.secret.is_none());
        assert_eq!(
            client.token_endpoint_auth_method,
            TokenEndpointAuthMethod::None
        );
    }
}
