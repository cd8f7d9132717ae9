//! JSON Web Key Set documents (RFC 7517).
//!
//! [`PublicJsonWebKey`] is the wire representation served by the JWKS
//! endpoint and consumed from client registrations. Private material
//! never appears here: exporting an internal key serializes only its
//! public components.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::alg::EllipticCurve;
use crate::jwk::{JsonWebKey, KeyMaterial, KeyOperation, KeyUse};

/// JSON Web Key Set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    /// Array of public JSON Web Keys.
    pub keys: Vec<PublicJsonWebKey>,
}

impl JsonWebKeySet {
    /// Creates an empty key set.
    #[must_use]
    pub const fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Finds a key by its ID.
    #[must_use]
    pub fn find_key(&self, kid: &str) -> Option<&PublicJsonWebKey> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }
}

/// Public JSON Web Key representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicJsonWebKey {
    /// Key type (`RSA`, `EC`, `oct`).
    pub kty: String,

    /// Public key use (`sig` or `enc`).
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// Key operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<String>>,

    /// Algorithm the key is intended for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Key ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    // === RSA parameters ===
    /// RSA modulus (base64url).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA exponent (base64url).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    // === EC parameters ===
    /// Curve name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// X coordinate (base64url).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// Y coordinate (base64url).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

impl PublicJsonWebKey {
    /// Exports the public half of an internal key.
    ///
    /// Symmetric keys have no public half and yield `None`.
    #[must_use]
    pub fn from_key(key: &JsonWebKey) -> Option<Self> {
        let ops = Some(
            key.key_ops
                .iter()
                .filter(|op| {
                    matches!(
                        op,
                        KeyOperation::Verify | KeyOperation::Encrypt | KeyOperation::WrapKey
                    )
                })
                .map(|op| op_name(*op).to_string())
                .collect(),
        );

        match &key.material {
            KeyMaterial::Rsa { n, e, .. } => Some(Self {
                kty: "RSA".to_string(),
                key_use: Some(key.key_use.as_str().to_string()),
                key_ops: ops,
                alg: Some(key.alg.clone()),
                kid: Some(key.kid.clone()),
                n: Some(URL_SAFE_NO_PAD.encode(n)),
                e: Some(URL_SAFE_NO_PAD.encode(e)),
                crv: None,
                x: None,
                y: None,
            }),
            KeyMaterial::Ec { curve, x, y, .. } => Some(Self {
                kty: "EC".to_string(),
                key_use: Some(key.key_use.as_str().to_string()),
                key_ops: ops,
                alg: Some(key.alg.clone()),
                kid: Some(key.kid.clone()),
                n: None,
                e: None,
                crv: Some(curve.name().to_string()),
                x: Some(URL_SAFE_NO_PAD.encode(x)),
                y: Some(URL_SAFE_NO_PAD.encode(y)),
            }),
            KeyMaterial::Oct { .. } => None,
        }
    }

    /// Imports this wire key as a public-only internal key.
    ///
    /// Returns `None` for malformed or symmetric entries.
    #[must_use]
    pub fn to_key(&self) -> Option<JsonWebKey> {
        let kid = self.kid.clone()?;
        let alg = self.alg.clone()?;
        let key_use = match self.key_use.as_deref() {
            Some("enc") => KeyUse::Enc,
            // Absent `use` defaults to signature verification.
            Some("sig") | None => KeyUse::Sig,
            Some(_) => return None,
        };

        match self.kty.as_str() {
            "RSA" => {
                let n = URL_SAFE_NO_PAD.decode(self.n.as_deref()?).ok()?;
                let e = URL_SAFE_NO_PAD.decode(self.e.as_deref()?).ok()?;
                Some(JsonWebKey::public_rsa(kid, key_use, alg, n, e))
            }
            "EC" => {
                let curve = EllipticCurve::from_name(self.crv.as_deref()?).ok()?;
                let x = URL_SAFE_NO_PAD.decode(self.x.as_deref()?).ok()?;
                let y = URL_SAFE_NO_PAD.decode(self.y.as_deref()?).ok()?;
                if x.len() != curve.coordinate_len() || y.len() != curve.coordinate_len() {
                    return None;
                }
                Some(JsonWebKey::public_ec(kid, key_use, alg, curve, x, y))
            }
            _ => None,
        }
    }
}

/// RFC 7517 operation names.
const fn op_name(op: KeyOperation) -> &'static str {
    match op {
        KeyOperation::Sign => "sign",
        KeyOperation::Verify => "verify",
        KeyOperation::Encrypt => "encrypt",
        KeyOperation::Decrypt => "decrypt",
        KeyOperation::WrapKey => "wrapKey",
        KeyOperation::UnwrapKey => "unwrapKey",
    }
}
