//! Configuration for the identity server.
//!
//! All token-issuance components read their issuer identity, lifetimes,
//! and default algorithms from here instead of consulting global state.

use serde::{Deserialize, Serialize};

/// Main configuration structure for the identity server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Issuer identity advertised in tokens and discovery metadata.
    pub issuer: IssuerConfig,
    /// Token lifetime configuration.
    pub tokens: TokenConfig,
    /// Cryptographic defaults.
    pub crypto: CryptoConfig,
}

/// Issuer identity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerConfig {
    /// Issuer URL placed in the `iss` claim of every minted token.
    pub name: String,
    /// Public base URL used to derive endpoint locations in the
    /// discovery document.
    pub base_url: String,
}

/// Lifetimes for every time-boxed artifact the server hands out.
///
/// All values are in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Access token lifetime.
    pub access_token_lifetime: i64,
    /// ID token lifetime.
    pub id_token_lifetime: i64,
    /// Refresh token lifetime.
    pub refresh_token_lifetime: i64,
    /// Requesting-party token (RPT) lifetime.
    pub rpt_lifetime: i64,
    /// Authorization code lifetime.
    pub authorization_code_lifetime: i64,
    /// One-time confirmation code lifetime.
    pub confirmation_code_lifetime: i64,
    /// UMA permission ticket lifetime.
    pub ticket_lifetime: i64,
    /// Window during which a JWT-assertion identifier is remembered for
    /// replay detection. Must be at least as long as the longest
    /// assertion lifetime a client can mint.
    pub jti_replay_window: i64,
}

/// Cryptographic defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoConfig {
    /// Default JWS algorithm for newly generated signing keys.
    pub default_signature_algorithm: String,
    /// Default JWE key-management algorithm for newly generated
    /// encryption keys.
    pub default_key_management_algorithm: String,
    /// Default JWE content-encryption algorithm.
    pub default_content_encryption_algorithm: String,
    /// RSA modulus size in bits for generated keys.
    pub rsa_key_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            issuer: IssuerConfig {
                name: "http://localhost:5000".to_string(),
                base_url: "http://localhost:5000".to_string(),
            },
            tokens: TokenConfig {
                access_token_lifetime: 3_600,
                id_token_lifetime: 3_600,
                refresh_token_lifetime: 7_200,
                rpt_lifetime: 3_600,
                authorization_code_lifetime: 600,
                confirmation_code_lifetime: 300,
                ticket_lifetime: 300,
                jti_replay_window: 3_600,
            },
            crypto: CryptoConfig {
                default_signature_algorithm: "RS256".to_string(),
                default_key_management_algorithm: "RSA-OAEP-256".to_string(),
                default_content_encryption_algorithm: "A128CBC-HS256".to_string(),
                rsa_key_size: 2_048,
            },
        }
    }
}
