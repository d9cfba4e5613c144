//! Master key derivation using Argon2id.
//!
//! The master key is derived from the user's password and a random per-user
//! salt. It is created once at initialization, re-derived at password
//! validation, and lives in memory for the rest of the session. It is never
//! persisted.

use argon2::Argon2;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::ZeroizeOnDrop;

use crate::error::{Result, StoreError};

/// Argon2id parameters.
///
/// Memory-hard settings: 64 MB memory, 3 iterations, single lane.
const ARGON2_MEMORY_KB: u32 = 64 * 1024;
const ARGON2_ITERATIONS: u32 = 3;
const ARGON2_PARALLELISM: u32 = 1;

/// Length of the derived key in bytes (256-bit AES key).
const KEY_LENGTH: usize = 32;

/// Length of the per-user random salt in bytes.
pub const SALT_LENGTH: usize = 16;

/// The session-lifetime symmetric key derived from the user's password.
///
/// Key material is zeroized from memory when dropped. The handle is passed
/// explicitly into the encrypted store at construction; nothing in this crate
/// holds a key as hidden global state.
#[derive(Clone, ZeroizeOnDrop)]
pub struct MasterKey {
    key: [u8; KEY_LENGTH],
}

impl MasterKey {
    pub(crate) fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self { key: bytes }
    }

    /// Raw key bytes. Use only for immediate cipher construction.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Generate a fresh random salt for key derivation.
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    let mut salt = [0u8; SALT_LENGTH];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Derive the master key from a password and salt using Argon2id.
///
/// Same password and salt always produce the same key; the salt is persisted
/// with the account's encryption record and never rotated.
///
/// # Errors
///
/// Returns `StoreError::InvalidInput` for an empty password or a salt shorter
/// than 16 bytes, and `StoreError::Crypto` if derivation itself fails.
pub fn derive_master_key(password: &str, salt: &[u8]) -> Result<MasterKey> {
    if password.is_empty() {
        return Err(StoreError::InvalidInput(
            "Password cannot be empty".to_string(),
        ));
    }

    if salt.len() < SALT_LENGTH {
        return Err(StoreError::InvalidInput(format!(
            "Salt must be at least {} bytes",
            SALT_LENGTH
        )));
    }

    let params = argon2::Params::new(
        ARGON2_MEMORY_KB,
        ARGON2_ITERATIONS,
        ARGON2_PARALLELISM,
        Some(KEY_LENGTH),
    )
    .map_err(|e| StoreError::Crypto(format!("Failed to create Argon2 params: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut key_bytes = [0u8; KEY_LENGTH];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key_bytes)
        .map_err(|e| StoreError::Crypto(format!("Key derivation failed: {}", e)))?;

    Ok(MasterKey::from_bytes(key_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_derivation_deterministic() {
        let salt = generate_salt();

        let key1 = derive_master_key("test-password", &salt).unwrap();
        let key2 = derive_master_key("test-password", &salt).unwrap();

        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_salt_different_key() {
        let salt1 = generate_salt();
        let salt2 = generate_salt();
        assert_ne!(salt1, salt2);

        let key1 = derive_master_key("test-password", &salt1).unwrap();
        let key2 = derive_master_key("test-password", &salt2).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_password_different_key() {
        let salt = generate_salt();

        let key1 = derive_master_key("password-one", &salt).unwrap();
        let key2 = derive_master_key("password-two", &salt).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_empty_password_rejected() {
        let salt = generate_salt();
        let result = derive_master_key("", &salt);
        assert!(result.is_err());
    }

    #[test]
    fn test_short_salt_rejected() {
        let result = derive_master_key("test-password", b"short");
        assert!(result.is_err());
    }

    #[test]
    fn test_master_key_debug_redacts() {
        let salt = generate_salt();
        let key = derive_master_key("test-password", &salt).unwrap();

        let debug_output = format!("{:?}", key);
        assert!(debug_output.contains("REDACTED"));

        let key_hex = hex::encode(&key.as_bytes()[..4]);
        assert!(!debug_output.contains(&key_hex));
    }
}
