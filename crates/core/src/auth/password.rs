//! Salted password hashing.
//!
//! Hashes are bcrypt strings (`$2b$10$...`). bcrypt embeds the salt and cost
//! in the hash, and its verification compares digests in constant time.

use super::AuthError;

/// bcrypt work factor used for every new hash.
pub const BCRYPT_COST: u32 = 10;

/// Hash a plaintext password. Called at signup only.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, BCRYPT_COST).map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Check a plaintext password against a stored hash.
///
/// A malformed stored hash never matches.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match bcrypt::verify(password, password_hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash could not be parsed");
            false
        }
    }
}
