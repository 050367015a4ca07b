//! Argon2 hashes for the per-curriculum shared secrets
//!
//! Stored form is a PHC string (`$argon2id$v=19$...`). Values that do not
//! parse as one are legacy plaintext and are compared in constant time.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::{Error, Result};

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("Password hashing failed: {}", e)))
}

/// Check a submitted password against a stored value
pub fn verify_password(stored: &str, submitted: &str) -> bool {
    let submitted = submitted.trim();
    match PasswordHash::new(stored) {
        Ok(hash) => Argon2::default()
            .verify_password(submitted.as_bytes(), &hash)
            .is_ok(),
        Err(_) => constant_time_eq(stored.trim().as_bytes(), submitted.as_bytes()),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let stored = hash_password("s3cret").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(verify_password(&stored, "s3cret"));
        assert!(verify_password(&stored, "  s3cret "));
        assert!(!verify_password(&stored, "wrong"));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_legacy_plaintext() {
        assert!(verify_password("1234", "1234"));
        assert!(!verify_password("1234", "12345"));
        assert!(!verify_password("1234", "1235"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
