//! Credential hashing and verification for accounts

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum AuthError {
    #[error("invalid password")]
    InvalidPassword,
    #[error("credential hashing failed")]
    HashFailed,
}

/// Hash a password using Argon2id. Returns the PHC-format hash string,
/// which embeds the salt and parameters.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| AuthError::HashFailed)?
        .to_string();

    Ok(password_hash)
}

/// Verify a password against a stored hash. Comparison happens inside
/// argon2's verifier, which is constant-time over the digest.
pub fn verify_password(password: &str, password_hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AuthError::InvalidPassword)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidPassword)
}
