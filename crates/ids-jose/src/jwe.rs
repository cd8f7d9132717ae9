//! Compact JWE encryption and decryption (RFC 7516).
//!
//! Supported key management: RSA PKCS#1 v1.5 and OAEP key transport,
//! AES key wrap, direct agreement, and PBES2 password-based wrapping.
//! Supported content encryption: AES-GCM and AES-CBC with HMAC
//! authentication (RFC 7518 §5.2).
//!
//! All decryption failures (bad tag, bad padding, unknown key, wrong
//! password) collapse into a single `None` outcome so callers cannot
//! build a padding or timing oracle out of the return value.

use std::num::NonZeroU32;

use aws_lc_rs::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_128_GCM, AES_256_GCM};
use aws_lc_rs::cipher::{
    DecryptionContext, PaddedBlockDecryptingKey, PaddedBlockEncryptingKey,
    UnboundCipherKey, AES_128 as CBC_AES_128, AES_256 as CBC_AES_256,
};
use aws_lc_rs::constant_time::verify_slices_are_equal;
use aws_lc_rs::hmac;
use aws_lc_rs::iv::FixedLength;
use aws_lc_rs::key_wrap::{AesKek, KeyWrap, AES_128 as KW_AES_128, AES_256 as KW_AES_256};
use aws_lc_rs::pbkdf2;
use aws_lc_rs::rsa::{
    OaepPrivateDecryptingKey, OaepPublicEncryptingKey, Pkcs1PrivateDecryptingKey,
    Pkcs1PublicEncryptingKey, PrivateDecryptingKey, PublicEncryptingKey, OAEP_SHA1_MGF1SHA1,
    OAEP_SHA256_MGF1SHA256,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::alg::{ContentEncryptionAlgorithm, KeyManagementAlgorithm};
use crate::error::{JoseError, JoseResult};
use crate::jwk::{encode_rsa_spki, JsonWebKey, KeyMaterial, KeyOperation, KeyUse};
use crate::random;

/// PBKDF2 iteration count for newly produced PBES2 tokens.
const PBES2_ITERATIONS: u32 = 4096;

/// Upper bound accepted from a peer's `p2c` header; anything above is
/// treated as malformed to keep derivation cost bounded.
const PBES2_MAX_ITERATIONS: u32 = 1_000_000;

/// Protected header of a compact JWE.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JweHeader {
    /// Key-management algorithm.
    pub alg: String,

    /// Content-encryption algorithm.
    pub enc: String,

    /// Identifier of the key-management key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Token type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    /// PBES2 salt input, base64url.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p2s: Option<String>,

    /// PBES2 iteration count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p2c: Option<u32>,
}

/// Compact JWE encrypter and decrypter.
#[derive(Debug, Clone, Copy, Default)]
pub struct JweEngine;

impl JweEngine {
    /// Creates a new engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Encrypts `plaintext` into a compact JWE under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not permit encryption, the key
    /// material does not fit `alg`, or the backend fails.
    pub fn encrypt(
        &self,
        plaintext: &str,
        key: &JsonWebKey,
        alg: KeyManagementAlgorithm,
        enc: ContentEncryptionAlgorithm,
    ) -> JoseResult<String> {
        if key.key_use != KeyUse::Enc
            || !(key.permits(KeyOperation::Encrypt) || key.permits(KeyOperation::WrapKey))
        {
            return Err(JoseError::OperationNotPermitted {
                kid: key.kid.clone(),
                operation: "encrypt",
            });
        }
        if alg.is_password_based() {
            return Err(JoseError::UnsupportedAlgorithm(
                "password-based algorithms require encrypt_with_password".to_string(),
            ));
        }

        let cek = match alg {
            KeyManagementAlgorithm::Dir => match &key.material {
                KeyMaterial::Oct { k } if k.len() == enc.key_len() => k.clone(),
                _ => {
                    return Err(JoseError::InvalidKey(
                        "dir requires a symmetric key of the content-encryption size".to_string(),
                    ));
                }
            },
            _ => random::random_bytes(enc.key_len()),
        };

        let encrypted_key = wrap_cek(&cek, key, alg)?;

        let header = JweHeader {
            alg: alg.jwa_name().to_string(),
            enc: enc.jwa_name().to_string(),
            kid: Some(key.kid.clone()),
            typ: Some("JWT".to_string()),
            p2s: None,
            p2c: None,
        };
        seal(&header, &cek, enc, plaintext, &encrypted_key)
    }

    /// Encrypts `plaintext` into a compact JWE under a password (PBES2).
    ///
    /// # Errors
    ///
    /// Returns an error if `alg` is not password-based or the backend
    /// fails.
    pub fn encrypt_with_password(
        &self,
        plaintext: &str,
        alg: KeyManagementAlgorithm,
        enc: ContentEncryptionAlgorithm,
        kid: &str,
        password: &str,
    ) -> JoseResult<String> {
        if !alg.is_password_based() {
            return Err(JoseError::UnsupportedAlgorithm(format!(
                "{} is not password-based",
                alg.jwa_name()
            )));
        }

        let salt_input = random::random_bytes(16);
        let kek = derive_pbes2_key(alg, password, &salt_input, PBES2_ITERATIONS)?;

        let cek = random::random_bytes(enc.key_len());
        let encrypted_key = aes_wrap(&kek, &cek)?;

        let header = JweHeader {
            alg: alg.jwa_name().to_string(),
            enc: enc.jwa_name().to_string(),
            kid: Some(kid.to_string()),
            typ: Some("JWT".to_string()),
            p2s: Some(URL_SAFE_NO_PAD.encode(&salt_input)),
            p2c: Some(PBES2_ITERATIONS),
        };
        seal(&header, &cek, enc, plaintext, &encrypted_key)
    }

    /// Parses only the protected header, without decrypting anything.
    #[must_use]
    pub fn get_header(&self, token: &str) -> Option<JweHeader> {
        let header_b64 = token.split('.').next()?;
        let header_bytes = URL_SAFE_NO_PAD.decode(header_b64).ok()?;
        serde_json::from_slice(&header_bytes).ok()
    }

    /// Decrypts a compact JWE with `key` and returns the plaintext.
    ///
    /// Returns `None` on any failure.
    #[must_use]
    pub fn parse(&self, token: &str, key: &JsonWebKey) -> Option<String> {
        if key.key_use != KeyUse::Enc
            || !(key.permits(KeyOperation::Decrypt) || key.permits(KeyOperation::UnwrapKey))
        {
            return None;
        }

        let segments = split_token(token)?;
        let header: JweHeader =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segments.header).ok()?).ok()?;
        let alg = KeyManagementAlgorithm::from_jwa(&header.alg).ok()?;
        let enc = ContentEncryptionAlgorithm::from_jwa(&header.enc).ok()?;
        if alg.is_password_based() {
            return None;
        }
        if let Some(kid) = &header.kid
            && *kid != key.kid
        {
            return None;
        }

        let encrypted_key = URL_SAFE_NO_PAD.decode(segments.encrypted_key).ok()?;
        let cek = unwrap_cek(&encrypted_key, key, alg, enc)?;
        open(&segments, &cek, enc)
    }

    /// Decrypts a password-based (PBES2) compact JWE.
    ///
    /// Returns `None` on any failure, including a wrong password.
    #[must_use]
    pub fn parse_with_password(&self, token: &str, password: &str) -> Option<String> {
        let segments = split_token(token)?;
        let header: JweHeader =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segments.header).ok()?).ok()?;
        let alg = KeyManagementAlgorithm::from_jwa(&header.alg).ok()?;
        let enc = ContentEncryptionAlgorithm::from_jwa(&header.enc).ok()?;
        if !alg.is_password_based() {
            return None;
        }

        let salt_input = URL_SAFE_NO_PAD.decode(header.p2s.as_deref()?).ok()?;
        let iterations = header.p2c?;
        if iterations == 0 || iterations > PBES2_MAX_ITERATIONS {
            return None;
        }

        let kek = derive_pbes2_key(alg, password, &salt_input, iterations).ok()?;
        let encrypted_key = URL_SAFE_NO_PAD.decode(segments.encrypted_key).ok()?;
        let cek = aes_unwrap(&kek, &encrypted_key)?;
        if cek.len() != enc.key_len() {
            return None;
        }
        open(&segments, &cek, enc)
    }
}

/// The five segments of a compact JWE, still base64url-encoded.
struct Segments<'a> {
    header: &'a str,
    encrypted_key: &'a str,
    iv: &'a str,
    ciphertext: &'a str,
    tag: &'a str,
}

fn split_token(token: &str) -> Option<Segments<'_>> {
    let mut parts = token.split('.');
    let segments = Segments {
        header: parts.next()?,
        encrypted_key: parts.next()?,
        iv: parts.next()?,
        ciphertext: parts.next()?,
        tag: parts.next()?,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(segments)
}

/// Wraps the CEK under the recipient key.
fn wrap_cek(
    cek: &[u8],
    key: &JsonWebKey,
    alg: KeyManagementAlgorithm,
) -> JoseResult<Vec<u8>> {
    match alg {
        KeyManagementAlgorithm::Dir => Ok(Vec::new()),
        KeyManagementAlgorithm::Rsa1_5 => {
            let public = rsa_public_key(key)?;
            let encrypting = Pkcs1PublicEncryptingKey::new(public)
                .map_err(|e| JoseError::Encryption(format!("RSA1_5 key setup failed: {e}")))?;
            let mut ciphertext = vec![0u8; encrypting.ciphertext_size()];
            let len = encrypting
                .encrypt(cek, &mut ciphertext)
                .map_err(|e| JoseError::Encryption(format!("RSA1_5 wrap failed: {e}")))?
                .len();
            ciphertext.truncate(len);
            Ok(ciphertext)
        }
        KeyManagementAlgorithm::RsaOaep | KeyManagementAlgorithm::RsaOaep256 => {
            let oaep_alg = if alg == KeyManagementAlgorithm::RsaOaep {
                &OAEP_SHA1_MGF1SHA1
            } else {
                &OAEP_SHA256_MGF1SHA256
            };
            let public = rsa_public_key(key)?;
            let encrypting = OaepPublicEncryptingKey::new(public)
                .map_err(|e| JoseError::Encryption(format!("OAEP key setup failed: {e}")))?;
            let mut ciphertext = vec![0u8; encrypting.ciphertext_size()];
            let len = encrypting
                .encrypt(oaep_alg, cek, &mut ciphertext, None)
                .map_err(|e| JoseError::Encryption(format!("OAEP wrap failed: {e}")))?
                .len();
            ciphertext.truncate(len);
            Ok(ciphertext)
        }
        KeyManagementAlgorithm::A128Kw | KeyManagementAlgorithm::A256Kw => {
            let KeyMaterial::Oct { k } = &key.material else {
                return Err(JoseError::InvalidKey(
                    "AES key wrap requires a symmetric key".to_string(),
                ));
            };
            let expected = if alg == KeyManagementAlgorithm::A128Kw { 16 } else { 32 };
            if k.len() != expected {
                return Err(JoseError::InvalidKey(format!(
                    "AES key wrap requires a {expected}-byte key"
                )));
            }
            aes_wrap(k, cek)
        }
        KeyManagementAlgorithm::Pbes2Hs256A128Kw | KeyManagementAlgorithm::Pbes2Hs512A256Kw => {
            Err(JoseError::UnsupportedAlgorithm(
                "password-based algorithms require encrypt_with_password".to_string(),
            ))
        }
    }
}

/// Unwraps the CEK with the recipient key. Any failure is `None`.
fn unwrap_cek(
    encrypted_key: &[u8],
    key: &JsonWebKey,
    alg: KeyManagementAlgorithm,
    enc: ContentEncryptionAlgorithm,
) -> Option<Vec<u8>> {
    let cek = match alg {
        KeyManagementAlgorithm::Dir => match &key.material {
            KeyMaterial::Oct { k } if encrypted_key.is_empty() => k.clone(),
            _ => return None,
        },
        KeyManagementAlgorithm::Rsa1_5 => {
            let private = rsa_private_key(key)?;
            let decrypting = Pkcs1PrivateDecryptingKey::new(private).ok()?;
            let mut plaintext = vec![0u8; decrypting.min_output_size()];
            let len = decrypting.decrypt(encrypted_key, &mut plaintext).ok()?.len();
            plaintext.truncate(len);
            plaintext
        }
        KeyManagementAlgorithm::RsaOaep | KeyManagementAlgorithm::RsaOaep256 => {
            let oaep_alg = if alg == KeyManagementAlgorithm::RsaOaep {
                &OAEP_SHA1_MGF1SHA1
            } else {
                &OAEP_SHA256_MGF1SHA256
            };
            let private = rsa_private_key(key)?;
            let decrypting = OaepPrivateDecryptingKey::new(private).ok()?;
            let mut plaintext = vec![0u8; decrypting.min_output_size()];
            let len = decrypting
                .decrypt(oaep_alg, encrypted_key, &mut plaintext, None)
                .ok()?
                .len();
            plaintext.truncate(len);
            plaintext
        }
        KeyManagementAlgorithm::A128Kw | KeyManagementAlgorithm::A256Kw => {
            let KeyMaterial::Oct { k } = &key.material else {
                return None;
            };
            aes_unwrap(k, encrypted_key)?
        }
        KeyManagementAlgorithm::Pbes2Hs256A128Kw | KeyManagementAlgorithm::Pbes2Hs512A256Kw => {
            return None;
        }
    };

    (cek.len() == enc.key_len()).then_some(cek)
}

/// Loads the RSA private key backing `key`.
fn rsa_private_key(key: &JsonWebKey) -> Option<PrivateDecryptingKey> {
    let KeyMaterial::Rsa { pkcs8_der, .. } = &key.material else {
        return None;
    };
    if pkcs8_der.is_empty() {
        // Public-only key (imported from a peer's JWKS).
        return None;
    }
    PrivateDecryptingKey::from_pkcs8(pkcs8_der).ok()
}

/// Builds the RSA public key for `key` from its cached components.
fn rsa_public_key(key: &JsonWebKey) -> JoseResult<PublicEncryptingKey> {
    let KeyMaterial::Rsa { n, e, .. } = &key.material else {
        return Err(JoseError::InvalidKey(
            "RSA key transport requires an RSA key".to_string(),
        ));
    };
    let spki = encode_rsa_spki(n, e);
    PublicEncryptingKey::from_der(&spki)
        .map_err(|e| JoseError::InvalidKey(format!("invalid RSA public key: {e}")))
}

/// AES-KW wrap (RFC 3394).
fn aes_wrap(kek: &[u8], cek: &[u8]) -> JoseResult<Vec<u8>> {
    let cipher = if kek.len() == 16 { &KW_AES_128 } else { &KW_AES_256 };
    let kek = AesKek::new(cipher, kek)
        .map_err(|e| JoseError::Encryption(format!("key-wrap setup failed: {e}")))?;
    let mut output = vec![0u8; cek.len() + 8];
    let len = kek
        .wrap(cek, &mut output)
        .map_err(|e| JoseError::Encryption(format!("key wrap failed: {e}")))?
        .len();
    output.truncate(len);
    Ok(output)
}

/// AES-KW unwrap. Any failure is `None`.
fn aes_unwrap(kek: &[u8], wrapped: &[u8]) -> Option<Vec<u8>> {
    if !matches!(kek.len(), 16 | 32) || wrapped.len() < 16 {
        return None;
    }
    let cipher = if kek.len() == 16 { &KW_AES_128 } else { &KW_AES_256 };
    let kek = AesKek::new(cipher, kek).ok()?;
    let mut output = vec![0u8; wrapped.len()];
    let len = kek.unwrap(wrapped, &mut output).ok()?.len();
    output.truncate(len);
    Some(output)
}

/// PBES2 key derivation (RFC 7518 §4.8): PBKDF2 with salt
/// `alg || 0x00 || p2s`.
fn derive_pbes2_key(
    alg: KeyManagementAlgorithm,
    password: &str,
    salt_input: &[u8],
    iterations: u32,
) -> JoseResult<Vec<u8>> {
    let key_len = alg
        .derived_key_len()
        .ok_or_else(|| JoseError::UnsupportedAlgorithm(alg.jwa_name().to_string()))?;
    let prf = match alg {
        KeyManagementAlgorithm::Pbes2Hs256A128Kw => pbkdf2::PBKDF2_HMAC_SHA256,
        _ => pbkdf2::PBKDF2_HMAC_SHA512,
    };

    let mut salt = Vec::with_capacity(alg.jwa_name().len() + 1 + salt_input.len());
    salt.extend_from_slice(alg.jwa_name().as_bytes());
    salt.push(0);
    salt.extend_from_slice(salt_input);

    let iterations = NonZeroU32::new(iterations)
        .ok_or_else(|| JoseError::Encryption("zero PBES2 iteration count".to_string()))?;
    let mut out = vec![0u8; key_len];
    pbkdf2::derive(prf, iterations, &salt, password.as_bytes(), &mut out);
    Ok(out)
}

/// Encrypts the content and assembles the five-segment token.
fn seal(
    header: &JweHeader,
    cek: &[u8],
    enc: ContentEncryptionAlgorithm,
    plaintext: &str,
    encrypted_key: &[u8],
) -> JoseResult<String> {
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header)?);
    let aad = header_b64.as_bytes();

    let (iv, ciphertext, tag) = if enc.is_gcm() {
        encrypt_gcm(cek, enc, plaintext.as_bytes(), aad)?
    } else {
        encrypt_cbc_hmac(cek, enc, plaintext.as_bytes(), aad)?
    };

    Ok(format!(
        "{header_b64}.{}.{}.{}.{}",
        URL_SAFE_NO_PAD.encode(encrypted_key),
        URL_SAFE_NO_PAD.encode(iv),
        URL_SAFE_NO_PAD.encode(ciphertext),
        URL_SAFE_NO_PAD.encode(tag)
    ))
}

/// Decrypts the content segments. Any failure is `None`.
fn open(segments: &Segments<'_>, cek: &[u8], enc: ContentEncryptionAlgorithm) -> Option<String> {
    let aad = segments.header.as_bytes();
    let iv = URL_SAFE_NO_PAD.decode(segments.iv).ok()?;
    let ciphertext = URL_SAFE_NO_PAD.decode(segments.ciphertext).ok()?;
    let tag = URL_SAFE_NO_PAD.decode(segments.tag).ok()?;
    if iv.len() != enc.iv_len() || tag.len() != enc.tag_len() {
        return None;
    }

    let plaintext = if enc.is_gcm() {
        decrypt_gcm(cek, enc, &iv, &ciphertext, &tag, aad)?
    } else {
        decrypt_cbc_hmac(cek, enc, &iv, &ciphertext, &tag, aad)?
    };
    String::from_utf8(plaintext).ok()
}

/// AES-GCM content encryption.
fn encrypt_gcm(
    cek: &[u8],
    enc: ContentEncryptionAlgorithm,
    plaintext: &[u8],
    aad: &[u8],
) -> JoseResult<(Vec<u8>, Vec<u8>, Vec<u8>)> {
    let aead_alg = if enc == ContentEncryptionAlgorithm::A128Gcm {
        &AES_128_GCM
    } else {
        &AES_256_GCM
    };
    let unbound = UnboundKey::new(aead_alg, cek)
        .map_err(|e| JoseError::Encryption(format!("GCM key setup failed: {e}")))?;
    let sealing = LessSafeKey::new(unbound);

    let iv = random::random_bytes(enc.iv_len());
    let nonce = Nonce::try_assume_unique_for_key(&iv)
        .map_err(|e| JoseError::Encryption(format!("nonce setup failed: {e}")))?;

    let mut in_out = plaintext.to_vec();
    let tag = sealing
        .seal_in_place_separate_tag(nonce, Aad::from(aad), &mut in_out)
        .map_err(|e| JoseError::Encryption(format!("GCM seal failed: {e}")))?;

    Ok((iv, in_out, tag.as_ref().to_vec()))
}

/// AES-GCM content decryption. Any failure is `None`.
fn decrypt_gcm(
    cek: &[u8],
    enc: ContentEncryptionAlgorithm,
    iv: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    aad: &[u8],
) -> Option<Vec<u8>> {
    let aead_alg = if enc == ContentEncryptionAlgorithm::A128Gcm {
        &AES_128_GCM
    } else {
        &AES_256_GCM
    };
    let unbound = UnboundKey::new(aead_alg, cek).ok()?;
    let opening = LessSafeKey::new(unbound);
    let nonce = Nonce::try_assume_unique_for_key(iv).ok()?;

    let mut in_out = Vec::with_capacity(ciphertext.len() + tag.len());
    in_out.extend_from_slice(ciphertext);
    in_out.extend_from_slice(tag);
    let plaintext = opening
        .open_in_place(nonce, Aad::from(aad), &mut in_out)
        .ok()?;
    Some(plaintext.to_vec())
}

/// AES-CBC-HMAC content encryption (RFC 7518 §5.2): the first half of
/// the CEK is the MAC key, the second half the AES key; the tag is the
/// truncated HMAC over `AAD || IV || ciphertext || AL`.
fn encrypt_cbc_hmac(
    cek: &[u8],
    enc: ContentEncryptionAlgorithm,
    plaintext: &[u8],
    aad: &[u8],
) -> JoseResult<(Vec<u8>, Vec<u8>, Vec<u8>)> {
    let half = cek.len() / 2;
    let (mac_key, enc_key) = cek.split_at(half);

    let cipher_alg = if enc == ContentEncryptionAlgorithm::A128CbcHs256 {
        &CBC_AES_128
    } else {
        &CBC_AES_256
    };
    let unbound = UnboundCipherKey::new(cipher_alg, enc_key)
        .map_err(|e| JoseError::Encryption(format!("CBC key setup failed: {e}")))?;
    let encrypting = PaddedBlockEncryptingKey::cbc_pkcs7(unbound)
        .map_err(|e| JoseError::Encryption(format!("CBC setup failed: {e}")))?;

    let mut in_out = plaintext.to_vec();
    let context = encrypting
        .encrypt(&mut in_out)
        .map_err(|e| JoseError::Encryption(format!("CBC encrypt failed: {e}")))?;
    let DecryptionContext::Iv128(iv) = context else {
        return Err(JoseError::Encryption("unexpected cipher context".to_string()));
    };
    let iv = iv.as_ref().to_vec();

    let tag = cbc_hmac_tag(mac_key, enc, aad, &iv, &in_out);
    Ok((iv, in_out, tag))
}

/// AES-CBC-HMAC content decryption. Any failure is `None`.
fn decrypt_cbc_hmac(
    cek: &[u8],
    enc: ContentEncryptionAlgorithm,
    iv: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    aad: &[u8],
) -> Option<Vec<u8>> {
    let half = cek.len() / 2;
    let (mac_key, enc_key) = cek.split_at(half);

    // Authenticate before decrypting.
    let expected = cbc_hmac_tag(mac_key, enc, aad, iv, ciphertext);
    verify_slices_are_equal(&expected, tag).ok()?;

    let cipher_alg = if enc == ContentEncryptionAlgorithm::A128CbcHs256 {
        &CBC_AES_128
    } else {
        &CBC_AES_256
    };
    let unbound = UnboundCipherKey::new(cipher_alg, enc_key).ok()?;
    let decrypting = PaddedBlockDecryptingKey::cbc_pkcs7(unbound).ok()?;

    let iv: FixedLength<16> = iv.try_into().ok()?;
    let mut in_out = ciphertext.to_vec();
    let plaintext = decrypting
        .decrypt(&mut in_out, DecryptionContext::Iv128(iv))
        .ok()?;
    Some(plaintext.to_vec())
}

/// Computes the CBC-HMAC authentication tag.
fn cbc_hmac_tag(
    mac_key: &[u8],
    enc: ContentEncryptionAlgorithm,
    aad: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Vec<u8> {
    let hmac_alg = if enc == ContentEncryptionAlgorithm::A128CbcHs256 {
        hmac::HMAC_SHA256
    } else {
        hmac::HMAC_SHA512
    };
    // AL: the AAD length in bits as a 64-bit big-endian integer.
    let al = (aad.len() as u64 * 8).to_be_bytes();

    let mut input = Vec::with_capacity(aad.len() + iv.len() + ciphertext.len() + 8);
    input.extend_from_slice(aad);
    input.extend_from_slice(iv);
    input.extend_from_slice(ciphertext);
    input.extend_from_slice(&al);

    let key = hmac::Key::new(hmac_alg, mac_key);
    let full = hmac::sign(&key, &input);
    full.as_ref()[..enc.tag_len()].to_vec()
}
