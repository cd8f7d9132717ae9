//! Cryptographically secure random generation for codes, token values,
//! salts, and initialization vectors.

use rand::distr::{Alphanumeric, SampleString};
use rand::Rng;

/// Generates a cryptographically secure random byte array.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}

/// Generates a cryptographically secure alphanumeric string.
///
/// Suitable for authorization codes and opaque token values; a
/// 32-character value carries ~190 bits of entropy, above the 128-bit
/// floor RFC 6749 recommends.
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    let mut rng = rand::rng();
    Alphanumeric.sample_string(&mut rng, len)
}

/// Generates a URL-safe base64-encoded random string from `byte_len`
/// random bytes.
#[must_use]
pub fn random_base64url(byte_len: usize) -> String {
    let bytes = random_bytes(byte_len);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

/// Generates a numeric one-time code of `digits` digits, zero-padded.
#[must_use]
pub fn random_numeric_code(digits: u32) -> String {
    let mut rng = rand::rng();
    let bound = 10u64.pow(digits);
    let value = rng.random_range(0..bound);
    format!("{value:0width$}", width = digits as usize)
}
