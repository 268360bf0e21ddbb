//! Password hashing for stored accounts
//!
//! Passwords are kept as Argon2id PHC strings; the parameters travel inside
//! the hash, so verification keeps working if the defaults below change.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::Rng;

use crate::domain::result::{Error, Result};

const MEMORY_COST: u32 = 19_456; // 19 MiB
const TIME_COST: u32 = 2;
const PARALLELISM: u32 = 1;

fn hasher() -> Result<Argon2<'static>> {
    let params = Params::new(MEMORY_COST, TIME_COST, PARALLELISM, None)
        .map_err(|e| Error::Other(format!("Failed to create argon2 params: {:?}", e)))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt_bytes: [u8; 16] = rand::thread_rng().gen();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| Error::Other(format!("Failed to encode salt: {:?}", e)))?;

    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Other(format!("Failed to hash password: {:?}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC string
///
/// An unparseable hash never matches.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("secret1"));
        assert!(verify_password("secret1", &hash));
        assert!(!verify_password("secret2", &hash));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("secret1").unwrap(), hash_password("secret1").unwrap());
    }

    #[test]
    fn test_garbage_hash_never_matches() {
        assert!(!verify_password("secret1", "secret1"));
        assert!(!verify_password("", ""));
    }
}
