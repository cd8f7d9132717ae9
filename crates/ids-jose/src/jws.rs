//! Compact JWS signing and verification (RFC 7515).
//!
//! Verification failures (malformed input, wrong algorithm, signature
//! mismatch) are a normal `None` outcome. Nothing in the return value
//! distinguishes why a token failed to verify.

use aws_lc_rs::hmac;
use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::signature::{
    EcdsaKeyPair, RsaKeyPair, RsaPublicKeyComponents, UnparsedPublicKey,
    ECDSA_P256_SHA256_FIXED, ECDSA_P256_SHA256_FIXED_SIGNING, ECDSA_P384_SHA384_FIXED,
    ECDSA_P384_SHA384_FIXED_SIGNING, ECDSA_P521_SHA512_FIXED, ECDSA_P521_SHA512_FIXED_SIGNING,
    RSA_PKCS1_2048_8192_SHA256, RSA_PKCS1_2048_8192_SHA384, RSA_PKCS1_2048_8192_SHA512,
    RSA_PKCS1_SHA256, RSA_PKCS1_SHA384, RSA_PKCS1_SHA512, RSA_PSS_2048_8192_SHA256,
    RSA_PSS_2048_8192_SHA384, RSA_PSS_2048_8192_SHA512, RSA_PSS_SHA256, RSA_PSS_SHA384,
    RSA_PSS_SHA512,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::alg::SignatureAlgorithm;
use crate::claims::JwsPayload;
use crate::error::{JoseError, JoseResult};
use crate::jwk::{JsonWebKey, KeyMaterial, KeyOperation, KeyUse};

/// Protected header of a compact JWS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwsHeader {
    /// Signature algorithm.
    pub alg: String,

    /// Identifier of the signing key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Token type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// Compact JWS signer and verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwsEngine;

impl JwsEngine {
    /// Creates a new engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Signs a claim set into a compact JWS using `key`.
    ///
    /// The header algorithm is the one the key is bound to; a key whose
    /// `use` is not `sig`, or whose operations exclude `sign`, is
    /// refused.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not permit signing, the key
    /// material is invalid, or the backend fails.
    pub fn sign(&self, payload: &JwsPayload, key: &JsonWebKey) -> JoseResult<String> {
        if key.key_use != KeyUse::Sig || !key.permits(KeyOperation::Sign) {
            return Err(JoseError::OperationNotPermitted {
                kid: key.kid.clone(),
                operation: "sign",
            });
        }
        let alg = SignatureAlgorithm::from_jwa(&key.alg)?;

        let header = JwsHeader {
            alg: alg.jwa_name().to_string(),
            kid: Some(key.kid.clone()),
            typ: Some("JWT".to_string()),
        };
        let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload.to_bytes()?);
        let signing_input = format!("{header_b64}.{payload_b64}");

        let signature = compute_signature(alg, key, signing_input.as_bytes())?;
        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Parses only the protected header, without verifying anything.
    ///
    /// Used by introspection and key selection to read `alg`/`kid`
    /// before a key is chosen.
    #[must_use]
    pub fn get_header(&self, token: &str) -> Option<JwsHeader> {
        let header_b64 = token.split('.').next()?;
        let header_bytes = URL_SAFE_NO_PAD.decode(header_b64).ok()?;
        serde_json::from_slice(&header_bytes).ok()
    }

    /// Verifies a compact JWS against `key` and returns its payload.
    ///
    /// Returns `None` on malformed input, an algorithm mismatch with
    /// the key, a key that does not permit verification, or a bad
    /// signature. None of these outcomes is distinguishable from the
    /// others.
    #[must_use]
    pub fn parse(&self, token: &str, key: &JsonWebKey) -> Option<JwsPayload> {
        if key.key_use != KeyUse::Sig || !key.permits(KeyOperation::Verify) {
            return None;
        }

        let mut parts = token.split('.');
        let header_b64 = parts.next()?;
        let payload_b64 = parts.next()?;
        let signature_b64 = parts.next()?;
        if parts.next().is_some() {
            return None;
        }

        let header: JwsHeader =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header_b64).ok()?).ok()?;
        let alg = SignatureAlgorithm::from_jwa(&header.alg).ok()?;
        // The key is bound to one algorithm; a header naming any other
        // algorithm fails closed (no cross-algorithm confusion).
        if header.alg != key.alg {
            return None;
        }
        if let Some(kid) = &header.kid
            && *kid != key.kid
        {
            return None;
        }

        let signature = URL_SAFE_NO_PAD.decode(signature_b64).ok()?;
        let signing_input = format!("{header_b64}.{payload_b64}");
        if !verify_signature(alg, key, signing_input.as_bytes(), &signature) {
            return None;
        }

        let payload_bytes = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
        JwsPayload::from_bytes(&payload_bytes).ok()
    }
}

/// Computes a raw signature over `data`.
fn compute_signature(
    alg: SignatureAlgorithm,
    key: &JsonWebKey,
    data: &[u8],
) -> JoseResult<Vec<u8>> {
    match (&key.material, alg) {
        (KeyMaterial::Oct { k }, _) if alg.is_hmac() => {
            let hmac_alg = match alg {
                SignatureAlgorithm::Hs256 => hmac::HMAC_SHA256,
                SignatureAlgorithm::Hs384 => hmac::HMAC_SHA384,
                _ => hmac::HMAC_SHA512,
            };
            let hmac_key = hmac::Key::new(hmac_alg, k);
            Ok(hmac::sign(&hmac_key, data).as_ref().to_vec())
        }
        (KeyMaterial::Rsa { pkcs8_der, .. }, _) if alg.is_rsa() => {
            let key_pair = RsaKeyPair::from_pkcs8(pkcs8_der)
                .map_err(|e| JoseError::InvalidKey(format!("invalid RSA key: {e}")))?;
            let padding = match alg {
                SignatureAlgorithm::Rs256 => &RSA_PKCS1_SHA256,
                SignatureAlgorithm::Rs384 => &RSA_PKCS1_SHA384,
                SignatureAlgorithm::Rs512 => &RSA_PKCS1_SHA512,
                SignatureAlgorithm::Ps256 => &RSA_PSS_SHA256,
                SignatureAlgorithm::Ps384 => &RSA_PSS_SHA384,
                _ => &RSA_PSS_SHA512,
            };
            let rng = SystemRandom::new();
            let mut signature = vec![0u8; key_pair.public_modulus_len()];
            key_pair
                .sign(padding, &rng, data, &mut signature)
                .map_err(|e| JoseError::Signing(format!("RSA signing failed: {e}")))?;
            Ok(signature)
        }
        (KeyMaterial::Ec { pkcs8_der, .. }, _) if alg.is_ecdsa() => {
            let signing_alg = match alg {
                SignatureAlgorithm::Es256 => &ECDSA_P256_SHA256_FIXED_SIGNING,
                SignatureAlgorithm::Es384 => &ECDSA_P384_SHA384_FIXED_SIGNING,
                _ => &ECDSA_P521_SHA512_FIXED_SIGNING,
            };
            let key_pair = EcdsaKeyPair::from_pkcs8(signing_alg, pkcs8_der)
                .map_err(|e| JoseError::InvalidKey(format!("invalid ECDSA key: {e}")))?;
            let rng = SystemRandom::new();
            let signature = key_pair
                .sign(&rng, data)
                .map_err(|e| JoseError::Signing(format!("ECDSA signing failed: {e}")))?;
            Ok(signature.as_ref().to_vec())
        }
        _ => Err(JoseError::InvalidKey(format!(
            "key type does not match algorithm {}",
            alg.jwa_name()
        ))),
    }
}

/// Verifies a raw signature over `data`. Any mismatch is `false`.
fn verify_signature(
    alg: SignatureAlgorithm,
    key: &JsonWebKey,
    data: &[u8],
    signature: &[u8],
) -> bool {
    match (&key.material, alg) {
        (KeyMaterial::Oct { k }, _) if alg.is_hmac() => {
            let hmac_alg = match alg {
                SignatureAlgorithm::Hs256 => hmac::HMAC_SHA256,
                SignatureAlgorithm::Hs384 => hmac::HMAC_SHA384,
                _ => hmac::HMAC_SHA512,
            };
            let hmac_key = hmac::Key::new(hmac_alg, k);
            hmac::verify(&hmac_key, data, signature).is_ok()
        }
        (KeyMaterial::Rsa { n, e, .. }, _) if alg.is_rsa() => {
            let params = match alg {
                SignatureAlgorithm::Rs256 => &RSA_PKCS1_2048_8192_SHA256,
                SignatureAlgorithm::Rs384 => &RSA_PKCS1_2048_8192_SHA384,
                SignatureAlgorithm::Rs512 => &RSA_PKCS1_2048_8192_SHA512,
                SignatureAlgorithm::Ps256 => &RSA_PSS_2048_8192_SHA256,
                SignatureAlgorithm::Ps384 => &RSA_PSS_2048_8192_SHA384,
                _ => &RSA_PSS_2048_8192_SHA512,
            };
            let components = RsaPublicKeyComponents { n, e };
            components.verify(params, data, signature).is_ok()
        }
        (KeyMaterial::Ec { curve, x, y, .. }, _) if alg.is_ecdsa() => {
            let verify_alg = match alg {
                SignatureAlgorithm::Es256 => &ECDSA_P256_SHA256_FIXED,
                SignatureAlgorithm::Es384 => &ECDSA_P384_SHA384_FIXED,
                _ => &ECDSA_P521_SHA512_FIXED,
            };
            let mut point = Vec::with_capacity(1 + curve.coordinate_len() * 2);
            point.push(0x04);
            point.extend_from_slice(x);
            point.extend_from_slice(y);
            UnparsedPublicKey::new(verify_alg, &point)
                .verify(data, signature)
                .is_ok()
        }
        _ => false,
    }
}
