//! Salted one-way credential hashing.
//!
//! Hashes are PHC strings produced by Argon2id with a fresh random salt per
//! credential. Plaintext secrets are never stored or compared directly.

use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Hash `secret` with a freshly generated salt.
///
/// # Errors
///
/// Returns the [`password_hash::Error`] if Argon2 rejects the input.
pub fn hash_secret(secret: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

/// Whether `stored_hash` is a PHC string this module can verify.
///
/// Hashes from other schemes (werkzeug's `pbkdf2:sha256:...`, say)
/// load fine but never verify.
pub fn is_supported_hash(stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .is_ok_and(|parsed| parsed.algorithm.as_str().starts_with("argon2"))
}

/// Check `secret` against a stored PHC hash.
///
/// A stored value that does not parse as a PHC string never verifies.
pub fn verify_secret(secret: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok()
}

/// Burn one verification against a throwaway hash.
///
/// Used when the identity is unknown so the failure path costs the same as
/// a wrong secret for a known identity.
pub fn verify_against_dummy(secret: &str) {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    if let Some(hash) = DUMMY.get_or_init(|| hash_secret("geopothole-dummy-credential").ok()) {
        let _ = verify_secret(secret, hash);
    }
}
