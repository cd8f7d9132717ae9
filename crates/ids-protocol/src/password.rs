//! Resource-owner password hashing and verification using Argon2id.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{OAuthError, OAuthResult};

/// Hashes a password into a PHC-formatted Argon2id string.
///
/// # Errors
///
/// Returns an error if hashing fails.
pub fn hash_password(password: &str) -> OAuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| OAuthError::ServerError(format!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Verifies a password against a stored PHC hash string.
///
/// A malformed stored hash counts as a verification failure, not an
/// error: the caller cannot tell the two apart.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
