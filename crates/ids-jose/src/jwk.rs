//! JSON Web Key material.
//!
//! A [`JsonWebKey`] couples the serialized private material with the
//! metadata (`kid`, `use`, `key_ops`, `alg`) that gates which
//! operations it may perform. Key material is immutable once issued;
//! rotation produces a new key with the same metadata (see
//! [`crate::keystore`]).

use aws_lc_rs::encoding::AsDer;
use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::rsa::{KeySize, PrivateDecryptingKey};
use aws_lc_rs::signature::{
    EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING, ECDSA_P384_SHA384_FIXED_SIGNING,
    ECDSA_P521_SHA512_FIXED_SIGNING,
};
use serde::{Deserialize, Serialize};

use crate::alg::{EllipticCurve, SignatureAlgorithm};
use crate::error::{JoseError, JoseResult};
use crate::random;

/// Key types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    /// RSA key pair.
    #[serde(rename = "RSA")]
    Rsa,
    /// Elliptic-curve key pair.
    #[serde(rename = "EC")]
    Ec,
    /// Symmetric octet key.
    #[serde(rename = "oct")]
    Oct,
}

/// Intended key use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyUse {
    /// Signature creation and verification.
    #[serde(rename = "sig")]
    Sig,
    /// Encryption and decryption.
    #[serde(rename = "enc")]
    Enc,
}

impl KeyUse {
    /// Returns the JWK `use` value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sig => "sig",
            Self::Enc => "enc",
        }
    }
}

/// Key operations per RFC 7517 §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyOperation {
    /// Compute a digital signature or MAC.
    Sign,
    /// Verify a digital signature or MAC.
    Verify,
    /// Encrypt content.
    Encrypt,
    /// Decrypt content.
    Decrypt,
    /// Encrypt (wrap) a key.
    WrapKey,
    /// Decrypt (unwrap) a key.
    UnwrapKey,
}

/// Private key material, by key type.
///
/// RSA and EC carry the PKCS#8 DER private key plus the cached public
/// components a verifier or JWKS export needs; `Oct` carries the raw
/// secret.
#[derive(Clone, Serialize, Deserialize)]
pub enum KeyMaterial {
    /// RSA key pair.
    Rsa {
        /// PKCS#8 DER private key.
        pkcs8_der: Vec<u8>,
        /// Public modulus, big-endian, no leading zero.
        n: Vec<u8>,
        /// Public exponent, big-endian.
        e: Vec<u8>,
    },
    /// Elliptic-curve key pair.
    Ec {
        /// PKCS#8 DER private key.
        pkcs8_der: Vec<u8>,
        /// Curve the key lives on.
        curve: EllipticCurve,
        /// X coordinate.
        x: Vec<u8>,
        /// Y coordinate.
        y: Vec<u8>,
    },
    /// Symmetric secret.
    Oct {
        /// Raw key bytes.
        k: Vec<u8>,
    },
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsa { .. } => f.write_str("KeyMaterial::Rsa([REDACTED])"),
            Self::Ec { curve, .. } => write!(f, "KeyMaterial::Ec({curve:?}, [REDACTED])"),
            Self::Oct { .. } => f.write_str("KeyMaterial::Oct([REDACTED])"),
        }
    }
}

/// A JSON Web Key with private material.
#[derive(Clone, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key identifier; stable across rotations.
    pub kid: String,

    /// Key type.
    pub kty: KeyType,

    /// Intended use.
    pub key_use: KeyUse,

    /// Permitted operations.
    pub key_ops: Vec<KeyOperation>,

    /// JWA algorithm this key is bound to.
    pub alg: String,

    /// The key material.
    pub material: KeyMaterial,
}

impl std::fmt::Debug for JsonWebKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonWebKey")
            .field("kid", &self.kid)
            .field("kty", &self.kty)
            .field("key_use", &self.key_use)
            .field("key_ops", &self.key_ops)
            .field("alg", &self.alg)
            .field("material", &self.material)
            .finish()
    }
}

impl JsonWebKey {
    /// Generates an RSA key pair.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails or the modulus size is
    /// not one of 2048, 3072, 4096, or 8192 bits.
    pub fn generate_rsa(
        kid: impl Into<String>,
        key_use: KeyUse,
        alg: impl Into<String>,
        bits: u32,
    ) -> JoseResult<Self> {
        let size = match bits {
            2048 => KeySize::Rsa2048,
            3072 => KeySize::Rsa3072,
            4096 => KeySize::Rsa4096,
            8192 => KeySize::Rsa8192,
            other => {
                return Err(JoseError::KeyGeneration(format!(
                    "unsupported RSA modulus size: {other} bits"
                )));
            }
        };

        let private = PrivateDecryptingKey::generate(size)
            .map_err(|e| JoseError::KeyGeneration(format!("RSA generation failed: {e}")))?;
        let pkcs8_der = private
            .as_der()
            .map_err(|e| JoseError::KeyGeneration(format!("RSA serialization failed: {e}")))?
            .as_ref()
            .to_vec();

        let spki = private
            .public_key()
            .as_der()
            .map_err(|e| JoseError::KeyGeneration(format!("RSA public export failed: {e}")))?
            .as_ref()
            .to_vec();
        let (n, e) = extract_rsa_components(&spki)?;

        let key_ops = default_key_ops(key_use);
        Ok(Self {
            kid: kid.into(),
            kty: KeyType::Rsa,
            key_use,
            key_ops,
            alg: alg.into(),
            material: KeyMaterial::Rsa { pkcs8_der, n, e },
        })
    }

    /// Generates an ECDSA key pair for the given signature algorithm.
    ///
    /// # Errors
    ///
    /// Returns an error if `alg` is not an ECDSA algorithm or key
    /// generation fails.
    pub fn generate_ec(
        kid: impl Into<String>,
        key_use: KeyUse,
        alg: SignatureAlgorithm,
    ) -> JoseResult<Self> {
        let curve = alg
            .curve()
            .ok_or_else(|| JoseError::UnsupportedAlgorithm(alg.jwa_name().to_string()))?;

        let signing_alg = match alg {
            SignatureAlgorithm::Es256 => &ECDSA_P256_SHA256_FIXED_SIGNING,
            SignatureAlgorithm::Es384 => &ECDSA_P384_SHA384_FIXED_SIGNING,
            SignatureAlgorithm::Es512 => &ECDSA_P521_SHA512_FIXED_SIGNING,
            _ => return Err(JoseError::UnsupportedAlgorithm(alg.jwa_name().to_string())),
        };

        let rng = SystemRandom::new();
        let document = EcdsaKeyPair::generate_pkcs8(signing_alg, &rng)
            .map_err(|e| JoseError::KeyGeneration(format!("ECDSA generation failed: {e}")))?;
        let pkcs8_der = document.as_ref().to_vec();

        let key_pair = EcdsaKeyPair::from_pkcs8(signing_alg, &pkcs8_der)
            .map_err(|e| JoseError::KeyGeneration(format!("ECDSA reload failed: {e}")))?;
        let (x, y) = split_ec_point(key_pair.public_key().as_ref(), curve)?;

        let key_ops = default_key_ops(key_use);
        Ok(Self {
            kid: kid.into(),
            kty: KeyType::Ec,
            key_use,
            key_ops,
            alg: alg.jwa_name().to_string(),
            material: KeyMaterial::Ec {
                pkcs8_der,
                curve,
                x,
                y,
            },
        })
    }

    /// Generates a symmetric key of `len` bytes.
    #[must_use]
    pub fn generate_oct(
        kid: impl Into<String>,
        key_use: KeyUse,
        alg: impl Into<String>,
        len: usize,
    ) -> Self {
        let key_ops = default_key_ops(key_use);
        Self {
            kid: kid.into(),
            kty: KeyType::Oct,
            key_use,
            key_ops,
            alg: alg.into(),
            material: KeyMaterial::Oct {
                k: random::random_bytes(len),
            },
        }
    }

    /// Builds a symmetric key from existing secret bytes.
    ///
    /// Used to turn a client's shared secret into an HMAC key for
    /// `client_secret_jwt`-style verification.
    #[must_use]
    pub fn from_secret(
        kid: impl Into<String>,
        key_use: KeyUse,
        alg: impl Into<String>,
        secret: &[u8],
    ) -> Self {
        let key_ops = default_key_ops(key_use);
        Self {
            kid: kid.into(),
            kty: KeyType::Oct,
            key_use,
            key_ops,
            alg: alg.into(),
            material: KeyMaterial::Oct { k: secret.to_vec() },
        }
    }

    /// Produces a key with fresh material and identical metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if generation fails.
    pub fn regenerate(&self) -> JoseResult<Self> {
        match &self.material {
            KeyMaterial::Rsa { n, .. } => Self::generate_rsa(
                self.kid.clone(),
                self.key_use,
                self.alg.clone(),
                u32::try_from(n.len() * 8)
                    .map_err(|_| JoseError::KeyGeneration("modulus too large".to_string()))?,
            ),
            KeyMaterial::Ec { .. } => Self::generate_ec(
                self.kid.clone(),
                self.key_use,
                SignatureAlgorithm::from_jwa(&self.alg)?,
            ),
            KeyMaterial::Oct { k } => Ok(Self::generate_oct(
                self.kid.clone(),
                self.key_use,
                self.alg.clone(),
                k.len(),
            )),
        }
    }

    /// Builds a public-only RSA key from JWK components.
    ///
    /// Used for keys imported from a peer's JWKS document: signature
    /// verification and key wrapping work, private operations do not.
    #[must_use]
    pub fn public_rsa(
        kid: impl Into<String>,
        key_use: KeyUse,
        alg: impl Into<String>,
        n: Vec<u8>,
        e: Vec<u8>,
    ) -> Self {
        let key_ops = match key_use {
            KeyUse::Sig => vec![KeyOperation::Verify],
            KeyUse::Enc => vec![KeyOperation::Encrypt, KeyOperation::WrapKey],
        };
        Self {
            kid: kid.into(),
            kty: KeyType::Rsa,
            key_use,
            key_ops,
            alg: alg.into(),
            material: KeyMaterial::Rsa {
                pkcs8_der: Vec::new(),
                n,
                e,
            },
        }
    }

    /// Builds a public-only EC key from JWK components.
    #[must_use]
    pub fn public_ec(
        kid: impl Into<String>,
        key_use: KeyUse,
        alg: impl Into<String>,
        curve: EllipticCurve,
        x: Vec<u8>,
        y: Vec<u8>,
    ) -> Self {
        let key_ops = match key_use {
            KeyUse::Sig => vec![KeyOperation::Verify],
            KeyUse::Enc => vec![KeyOperation::Encrypt, KeyOperation::WrapKey],
        };
        Self {
            kid: kid.into(),
            kty: KeyType::Ec,
            key_use,
            key_ops,
            alg: alg.into(),
            material: KeyMaterial::Ec {
                pkcs8_der: Vec::new(),
                curve,
                x,
                y,
            },
        }
    }

    /// Returns whether the key permits the given operation.
    #[must_use]
    pub fn permits(&self, op: KeyOperation) -> bool {
        self.key_ops.contains(&op)
    }
}

/// Encodes an RSA public key (`n`, `e`) as a `SubjectPublicKeyInfo`
/// DER document, the inverse of [`extract_rsa_components`].
pub(crate) fn encode_rsa_spki(n: &[u8], e: &[u8]) -> Vec<u8> {
    // rsaEncryption OID 1.2.840.113549.1.1.1 with NULL parameters.
    const RSA_ALGORITHM_ID: [u8; 15] = [
        0x30, 0x0d, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01, 0x05, 0x00,
    ];

    let n_int = der_integer(n);
    let e_int = der_integer(e);
    let rsa_public_key = der_sequence(&[n_int, e_int].concat());

    let mut bit_string_body = Vec::with_capacity(rsa_public_key.len() + 1);
    bit_string_body.push(0); // no unused bits
    bit_string_body.extend_from_slice(&rsa_public_key);
    let bit_string = der_tlv(0x03, &bit_string_body);

    der_sequence(&[RSA_ALGORITHM_ID.to_vec(), bit_string].concat())
}

/// Encodes a DER INTEGER from unsigned big-endian bytes.
fn der_integer(bytes: &[u8]) -> Vec<u8> {
    let mut body = bytes.to_vec();
    // A set high bit would flip the sign; prepend a zero octet.
    if body.first().is_some_and(|b| b & 0x80 != 0) {
        body.insert(0, 0);
    }
    der_tlv(0x02, &body)
}

/// Encodes a DER SEQUENCE.
fn der_sequence(body: &[u8]) -> Vec<u8> {
    der_tlv(0x30, body)
}

/// Encodes a DER tag-length-value triple.
fn der_tlv(tag: u8, body: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = body.len();
    if len < 0x80 {
        out.push(u8::try_from(len).unwrap_or(0x7f));
    } else {
        let len_bytes: Vec<u8> = len
            .to_be_bytes()
            .into_iter()
            .skip_while(|b| *b == 0)
            .collect();
        out.push(0x80 | u8::try_from(len_bytes.len()).unwrap_or(1));
        out.extend_from_slice(&len_bytes);
    }
    out.extend_from_slice(body);
    out
}

/// Default operation set for a key use.
fn default_key_ops(key_use: KeyUse) -> Vec<KeyOperation> {
    match key_use {
        KeyUse::Sig => vec![KeyOperation::Sign, KeyOperation::Verify],
        KeyUse::Enc => vec![
            KeyOperation::Encrypt,
            KeyOperation::Decrypt,
            KeyOperation::WrapKey,
            KeyOperation::UnwrapKey,
        ],
    }
}

/// Extracts RSA modulus (n) and exponent (e) from a `SubjectPublicKeyInfo`.
///
/// The structure is:
/// ```text
/// SEQUENCE {
///   SEQUENCE { OID, NULL }
///   BIT STRING (containing RSAPublicKey)
/// }
/// RSAPublicKey ::= SEQUENCE { modulus INTEGER, publicExponent INTEGER }
/// ```
pub(crate) fn extract_rsa_components(spki: &[u8]) -> JoseResult<(Vec<u8>, Vec<u8>)> {
    let mut pos = 0;

    // Outer SEQUENCE
    if spki.get(pos) != Some(&0x30) {
        return Err(JoseError::InvalidKey("expected SPKI SEQUENCE".to_string()));
    }
    pos += 1;
    pos = skip_length(spki, pos)?;

    // Algorithm SEQUENCE
    if spki.get(pos) != Some(&0x30) {
        return Err(JoseError::InvalidKey(
            "expected algorithm SEQUENCE".to_string(),
        ));
    }
    pos += 1;
    let alg_len = read_length(spki, pos)?;
    pos = skip_length(spki, pos)?;
    pos += alg_len;

    // BIT STRING containing the key
    if spki.get(pos) != Some(&0x03) {
        return Err(JoseError::InvalidKey("expected BIT STRING".to_string()));
    }
    pos += 1;
    pos = skip_length(spki, pos)?;

    // Unused-bits byte
    pos += 1;

    // RSAPublicKey SEQUENCE
    if spki.get(pos) != Some(&0x30) {
        return Err(JoseError::InvalidKey(
            "expected RSAPublicKey SEQUENCE".to_string(),
        ));
    }
    pos += 1;
    pos = skip_length(spki, pos)?;

    // Modulus (n)
    if spki.get(pos) != Some(&0x02) {
        return Err(JoseError::InvalidKey("expected INTEGER for n".to_string()));
    }
    pos += 1;
    let n_len = read_length(spki, pos)?;
    pos = skip_length(spki, pos)?;
    if spki.len() < pos + n_len {
        return Err(JoseError::InvalidKey("truncated modulus".to_string()));
    }
    let mut n = spki[pos..pos + n_len].to_vec();
    // ASN.1 INTEGER padding
    if n.first() == Some(&0) {
        n.remove(0);
    }
    pos += n_len;

    // Exponent (e)
    if spki.get(pos) != Some(&0x02) {
        return Err(JoseError::InvalidKey("expected INTEGER for e".to_string()));
    }
    pos += 1;
    let e_len = read_length(spki, pos)?;
    pos = skip_length(spki, pos)?;
    if spki.len() < pos + e_len {
        return Err(JoseError::InvalidKey("truncated exponent".to_string()));
    }
    let mut e = spki[pos..pos + e_len].to_vec();
    if e.first() == Some(&0) {
        e.remove(0);
    }

    Ok((n, e))
}

/// Splits an uncompressed EC point (`0x04 || x || y`) into coordinates.
pub(crate) fn split_ec_point(point: &[u8], curve: EllipticCurve) -> JoseResult<(Vec<u8>, Vec<u8>)> {
    let coord = curve.coordinate_len();
    if point.len() != 1 + coord * 2 || point.first() != Some(&0x04) {
        return Err(JoseError::InvalidKey(
            "malformed uncompressed EC point".to_string(),
        ));
    }
    let x = point[1..=coord].to_vec();
    let y = point[1 + coord..].to_vec();
    Ok((x, y))
}

/// Reads an ASN.1 length field and returns the length value.
fn read_length(data: &[u8], pos: usize) -> JoseResult<usize> {
    let first = *data
        .get(pos)
        .ok_or_else(|| JoseError::InvalidKey("unexpected end of DER".to_string()))?;

    if first < 0x80 {
        Ok(first as usize)
    } else {
        let num_bytes = (first & 0x7F) as usize;
        if num_bytes > 4 {
            return Err(JoseError::InvalidKey("DER length too large".to_string()));
        }
        let mut len = 0usize;
        for i in 0..num_bytes {
            let byte = *data
                .get(pos + 1 + i)
                .ok_or_else(|| JoseError::InvalidKey("unexpected end of DER length".to_string()))?;
            len = (len << 8) | (byte as usize);
        }
        Ok(len)
    }
}

/// Skips an ASN.1 length field and returns the new position.
fn skip_length(data: &[u8], pos: usize) -> JoseResult<usize> {
    let first = *data
        .get(pos)
        .ok_or_else(|| JoseError::InvalidKey("unexpected end of DER".to_string()))?;

    if first < 0x80 {
        Ok(pos + 1)
    } else {
        let num_bytes = (first & 0x7F) as usize;
        Ok(pos + 1 + num_bytes)
    }
}
