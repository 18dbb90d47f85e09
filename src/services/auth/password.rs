use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use std::sync::OnceLock;

use crate::error::AppError;

/// Hash a password for storage using Argon2id with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC-format hash. A malformed stored
/// hash is an internal error, not a failed verification.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AppError::Internal(format!("Stored password hash is invalid: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Internal(format!("Password verification failed: {}", e))),
    }
}

/// Burn the cost of one full Argon2 verification against a throwaway hash.
///
/// Login paths that bail out before reaching a stored hash (unknown email,
/// no local credential, deactivated account) call this so their response
/// timing matches the wrong-password path and does not leak which condition
/// was hit.
pub fn burn_verification(password: &str) {
    static THROWAWAY_HASH: OnceLock<String> = OnceLock::new();
    let hash = THROWAWAY_HASH
        .get_or_init(|| hash_password("throwaway-timing-pad").unwrap_or_default());
    let _ = verify_password(password, hash);
}
