//! Password hashing and verification using Argon2
//!
//! Uses argon2id variant with recommended parameters for password hashing.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::NotewardenError;

/// One-way credential check used by login
pub trait CredentialVerifier: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, NotewardenError>;
    fn verify(&self, password: &str, hash: &str) -> Result<bool, NotewardenError>;
}

/// Argon2id-backed verifier
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Verifier;

impl CredentialVerifier for Argon2Verifier {
    fn hash(&self, password: &str) -> Result<String, NotewardenError> {
        hash_password(password)
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, NotewardenError> {
        verify_password(password, hash)
    }
}

/// Hash a password using Argon2id
///
/// Returns the PHC-formatted hash string that includes the salt and parameters.
pub fn hash_password(password: &str) -> Result<String, NotewardenError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| NotewardenError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, NotewardenError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| NotewardenError::Internal(format!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_verifier_trait() {
        let verifier = Argon2Verifier;
        let hash = verifier.hash("same-password").unwrap();
        let other = verifier.hash("same-password").unwrap();

        // Different salts
        assert_ne!(hash, other);
        assert!(verifier.verify("same-password", &hash).unwrap());
        assert!(verifier.verify("same-password", &other).unwrap());
    }

    #[test]
    fn test_invalid_hash_format() {
        assert!(verify_password("password", "not-a-valid-hash").is_err());
    }
}
