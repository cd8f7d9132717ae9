//! JOSE algorithm registries.
//!
//! Algorithm names follow RFC 7518 (JSON Web Algorithms). Parsing an
//! unknown name is an error at the boundary; once parsed, the enums are
//! total and every match over them is exhaustive.

use serde::{Deserialize, Serialize};

use crate::error::JoseError;

/// JWS signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// HMAC with SHA-256.
    #[serde(rename = "HS256")]
    Hs256,
    /// HMAC with SHA-384.
    #[serde(rename = "HS384")]
    Hs384,
    /// HMAC with SHA-512.
    #[serde(rename = "HS512")]
    Hs512,
    /// RSA PKCS#1 v1.5 with SHA-256.
    #[serde(rename = "RS256")]
    Rs256,
    /// RSA PKCS#1 v1.5 with SHA-384.
    #[serde(rename = "RS384")]
    Rs384,
    /// RSA PKCS#1 v1.5 with SHA-512.
    #[serde(rename = "RS512")]
    Rs512,
    /// RSA-PSS with SHA-256.
    #[serde(rename = "PS256")]
    Ps256,
    /// RSA-PSS with SHA-384.
    #[serde(rename = "PS384")]
    Ps384,
    /// RSA-PSS with SHA-512.
    #[serde(rename = "PS512")]
    Ps512,
    /// ECDSA using P-256 and SHA-256.
    #[serde(rename = "ES256")]
    Es256,
    /// ECDSA using P-384 and SHA-384.
    #[serde(rename = "ES384")]
    Es384,
    /// ECDSA using P-521 and SHA-512.
    #[serde(rename = "ES512")]
    Es512,
}

impl SignatureAlgorithm {
    /// Returns the JWA algorithm name.
    #[must_use]
    pub const fn jwa_name(self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::Ps256 => "PS256",
            Self::Ps384 => "PS384",
            Self::Ps512 => "PS512",
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
        }
    }

    /// Parses a JWA algorithm name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is unknown.
    pub fn from_jwa(name: &str) -> Result<Self, JoseError> {
        match name {
            "HS256" => Ok(Self::Hs256),
            "HS384" => Ok(Self::Hs384),
            "HS512" => Ok(Self::Hs512),
            "RS256" => Ok(Self::Rs256),
            "RS384" => Ok(Self::Rs384),
            "RS512" => Ok(Self::Rs512),
            "PS256" => Ok(Self::Ps256),
            "PS384" => Ok(Self::Ps384),
            "PS512" => Ok(Self::Ps512),
            "ES256" => Ok(Self::Es256),
            "ES384" => Ok(Self::Es384),
            "ES512" => Ok(Self::Es512),
            other => Err(JoseError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    /// Returns whether this is an HMAC algorithm.
    #[must_use]
    pub const fn is_hmac(self) -> bool {
        matches!(self, Self::Hs256 | Self::Hs384 | Self::Hs512)
    }

    /// Returns whether this is an RSA algorithm (PKCS#1 v1.5 or PSS).
    #[must_use]
    pub const fn is_rsa(self) -> bool {
        matches!(
            self,
            Self::Rs256 | Self::Rs384 | Self::Rs512 | Self::Ps256 | Self::Ps384 | Self::Ps512
        )
    }

    /// Returns whether this is an ECDSA algorithm.
    #[must_use]
    pub const fn is_ecdsa(self) -> bool {
        matches!(self, Self::Es256 | Self::Es384 | Self::Es512)
    }

    /// Returns the curve an ECDSA algorithm runs on.
    #[must_use]
    pub const fn curve(self) -> Option<EllipticCurve> {
        match self {
            Self::Es256 => Some(EllipticCurve::P256),
            Self::Es384 => Some(EllipticCurve::P384),
            Self::Es512 => Some(EllipticCurve::P521),
            _ => None,
        }
    }
}

/// Elliptic curves used by the ECDSA algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EllipticCurve {
    /// NIST P-256 (secp256r1).
    #[serde(rename = "P-256")]
    P256,
    /// NIST P-384 (secp384r1).
    #[serde(rename = "P-384")]
    P384,
    /// NIST P-521 (secp521r1).
    #[serde(rename = "P-521")]
    P521,
}

impl EllipticCurve {
    /// Returns the curve name as it appears in a JWK.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
        }
    }

    /// Returns the byte length of one coordinate.
    #[must_use]
    pub const fn coordinate_len(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }

    /// Parses a curve name.
    ///
    /// # Errors
    ///
    /// Returns an error if the curve is unknown.
    pub fn from_name(name: &str) -> Result<Self, JoseError> {
        match name {
            "P-256" => Ok(Self::P256),
            "P-384" => Ok(Self::P384),
            "P-521" => Ok(Self::P521),
            other => Err(JoseError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// JWE key-management algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyManagementAlgorithm {
    /// RSA PKCS#1 v1.5 key transport.
    #[serde(rename = "RSA1_5")]
    Rsa1_5,
    /// RSA OAEP (SHA-1) key transport.
    #[serde(rename = "RSA-OAEP")]
    RsaOaep,
    /// RSA OAEP (SHA-256) key transport.
    #[serde(rename = "RSA-OAEP-256")]
    RsaOaep256,
    /// AES-128 key wrap.
    #[serde(rename = "A128KW")]
    A128Kw,
    /// AES-256 key wrap.
    #[serde(rename = "A256KW")]
    A256Kw,
    /// Direct use of a shared symmetric key.
    #[serde(rename = "dir")]
    Dir,
    /// PBES2 with HMAC-SHA256 and AES-128 key wrap.
    #[serde(rename = "PBES2-HS256+A128KW")]
    Pbes2Hs256A128Kw,
    /// PBES2 with HMAC-SHA512 and AES-256 key wrap.
    #[serde(rename = "PBES2-HS512+A256KW")]
    Pbes2Hs512A256Kw,
}

impl KeyManagementAlgorithm {
    /// Returns the JWA algorithm name.
    #[must_use]
    pub const fn jwa_name(self) -> &'static str {
        match self {
            Self::Rsa1_5 => "RSA1_5",
            Self::RsaOaep => "RSA-OAEP",
            Self::RsaOaep256 => "RSA-OAEP-256",
            Self::A128Kw => "A128KW",
            Self::A256Kw => "A256KW",
            Self::Dir => "dir",
            Self::Pbes2Hs256A128Kw => "PBES2-HS256+A128KW",
            Self::Pbes2Hs512A256Kw => "PBES2-HS512+A256KW",
        }
    }

    /// Parses a JWA algorithm name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is unknown.
    pub fn from_jwa(name: &str) -> Result<Self, JoseError> {
        match name {
            "RSA1_5" => Ok(Self::Rsa1_5),
            "RSA-OAEP" => Ok(Self::RsaOaep),
            "RSA-OAEP-256" => Ok(Self::RsaOaep256),
            "A128KW" => Ok(Self::A128Kw),
            "A256KW" => Ok(Self::A256Kw),
            "dir" => Ok(Self::Dir),
            "PBES2-HS256+A128KW" => Ok(Self::Pbes2Hs256A128Kw),
            "PBES2-HS512+A256KW" => Ok(Self::Pbes2Hs512A256Kw),
            other => Err(JoseError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    /// Returns whether this algorithm wraps the CEK with an RSA key.
    #[must_use]
    pub const fn is_rsa(self) -> bool {
        matches!(self, Self::Rsa1_5 | Self::RsaOaep | Self::RsaOaep256)
    }

    /// Returns whether this algorithm derives the wrapping key from a
    /// password.
    #[must_use]
    pub const fn is_password_based(self) -> bool {
        matches!(self, Self::Pbes2Hs256A128Kw | Self::Pbes2Hs512A256Kw)
    }

    /// Returns the derived-key length for password-based algorithms.
    #[must_use]
    pub const fn derived_key_len(self) -> Option<usize> {
        match self {
            Self::Pbes2Hs256A128Kw => Some(16),
            Self::Pbes2Hs512A256Kw => Some(32),
            _ => None,
        }
    }
}

/// JWE content-encryption algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentEncryptionAlgorithm {
    /// AES-128-CBC with HMAC-SHA-256 authentication.
    #[serde(rename = "A128CBC-HS256")]
    A128CbcHs256,
    /// AES-256-CBC with HMAC-SHA-512 authentication.
    #[serde(rename = "A256CBC-HS512")]
    A256CbcHs512,
    /// AES-128-GCM.
    #[serde(rename = "A128GCM")]
    A128Gcm,
    /// AES-256-GCM.
    #[serde(rename = "A256GCM")]
    A256Gcm,
}

impl ContentEncryptionAlgorithm {
    /// Returns the JWA algorithm name.
    #[must_use]
    pub const fn jwa_name(self) -> &'static str {
        match self {
            Self::A128CbcHs256 => "A128CBC-HS256",
            Self::A256CbcHs512 => "A256CBC-HS512",
            Self::A128Gcm => "A128GCM",
            Self::A256Gcm => "A256GCM",
        }
    }

    /// Parses a JWA algorithm name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is unknown.
    pub fn from_jwa(name: &str) -> Result<Self, JoseError> {
        match name {
            "A128CBC-HS256" => Ok(Self::A128CbcHs256),
            "A256CBC-HS512" => Ok(Self::A256CbcHs512),
            "A128GCM" => Ok(Self::A128Gcm),
            "A256GCM" => Ok(Self::A256Gcm),
            other => Err(JoseError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    /// Returns the content-encryption key length in bytes.
    ///
    /// CBC-HMAC algorithms use a double-length key: the first half is
    /// the MAC key, the second half the AES key.
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            Self::A128CbcHs256 => 32,
            Self::A256CbcHs512 => 64,
            Self::A128Gcm => 16,
            Self::A256Gcm => 32,
        }
    }

    /// Returns the initialization-vector length in bytes.
    #[must_use]
    pub const fn iv_len(self) -> usize {
        match self {
            Self::A128CbcHs256 | Self::A256CbcHs512 => 16,
            Self::A128Gcm | Self::A256Gcm => 12,
        }
    }

    /// Returns the authentication-tag length in bytes.
    #[must_use]
    pub const fn tag_len(self) -> usize {
        match self {
            Self::A128CbcHs256 => 16,
            Self::A256CbcHs512 => 32,
            Self::A128Gcm | Self::A256Gcm => 16,
        }
    }

    /// Returns whether this is an AEAD (GCM) algorithm.
    #[must_use]
    pub const fn is_gcm(self) -> bool {
        matches!(self, Self::A128Gcm | Self::A256Gcm)
    }
}
