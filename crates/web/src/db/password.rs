//! Argon2 password hashing.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use super::RepositoryError;

/// Hash a password with a fresh random salt.
///
/// # Errors
///
/// Returns `RepositoryError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, RepositoryError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| RepositoryError::PasswordHash)
}

/// Verify a password against a stored PHC hash string.
///
/// # Errors
///
/// Returns `RepositoryError::InvalidCredentials` on mismatch or an unparseable hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), RepositoryError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| RepositoryError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| RepositoryError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("pa$$word").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("pa$$word", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(RepositoryError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("x", "not-a-hash"),
            Err(RepositoryError::InvalidCredentials)
        ));
    }
}
