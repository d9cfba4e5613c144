//! AES-256-GCM record encryption.
//!
//! Every call generates a fresh random 96-bit IV, so encrypting the same
//! plaintext twice under one key yields different blobs. The blob carries
//! `{ciphertext, iv}` base64-encoded; the ciphertext includes the 16-byte
//! GCM authentication tag.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{Result, StoreError};
use crate::model::EncryptedBlob;

use super::key::MasterKey;

/// IV size for AES-256-GCM (96 bits).
const IV_LENGTH: usize = 12;

/// Encrypt plaintext bytes under the master key.
///
/// # Errors
///
/// Returns `StoreError::Crypto` if the AEAD operation fails.
pub fn encrypt(key: &MasterKey, plaintext: &[u8]) -> Result<EncryptedBlob> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

    let mut iv_bytes = [0u8; IV_LENGTH];
    OsRng.fill_bytes(&mut iv_bytes);
    let nonce = Nonce::from_slice(&iv_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| StoreError::Crypto(format!("Encryption failed: {}", e)))?;

    Ok(EncryptedBlob {
        ciphertext: BASE64.encode(ciphertext),
        iv: BASE64.encode(iv_bytes),
    })
}

/// Decrypt a blob produced by [`encrypt`].
///
/// # Errors
///
/// Returns `StoreError::DecryptionFailure` for a wrong key, a tampered or
/// corrupted ciphertext, or malformed base64/IV input. The failure is never
/// silent and garbage plaintext is never returned; GCM authenticates the
/// ciphertext before releasing any output.
pub fn decrypt(key: &MasterKey, blob: &EncryptedBlob) -> Result<Vec<u8>> {
    let iv_bytes = BASE64
        .decode(&blob.iv)
        .map_err(|_| StoreError::DecryptionFailure)?;
    if iv_bytes.len() != IV_LENGTH {
        return Err(StoreError::DecryptionFailure);
    }

    let ciphertext = BASE64
        .decode(&blob.ciphertext)
        .map_err(|_| StoreError::DecryptionFailure)?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let nonce = Nonce::from_slice(&iv_bytes);

    cipher
        .decrypt(nonce, ciphertext.as_slice())
        .map_err(|_| StoreError::DecryptionFailure)
}
