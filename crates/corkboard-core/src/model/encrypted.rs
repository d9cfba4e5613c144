//! Wire shapes for encrypted records.
//!
//! An encrypted record keeps its identity, timestamps and foreign key as
//! plaintext envelope fields so the remote database can still query by
//! `boardId` and perform cascading deletes. Everything else is serialized to
//! JSON and carried as a single opaque [`EncryptedBlob`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An AEAD ciphertext with its per-call IV, both base64-encoded.
///
/// The ciphertext includes the GCM authentication tag. A fresh random IV is
/// generated for every encryption call, so the same plaintext never produces
/// the same blob twice under one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    /// Base64 ciphertext (includes the integrity tag)
    pub ciphertext: String,

    /// Base64 96-bit IV
    pub iv: String,
}

/// The stored form of an encrypted entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedRecord {
    /// Entity id (plaintext, for addressing)
    pub id: Uuid,

    /// Owning board for cards and chats (plaintext, for querying and cascade)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_id: Option<Uuid>,

    /// When the entity was created
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,

    /// All remaining semantic fields, JSON-serialized and encrypted
    pub data: EncryptedBlob,
}

/// Per-user encryption initialization record, one per account.
///
/// Written once by `initialize` and never rotated. The probe is a fixed known
/// plaintext encrypted under the master key; decrypting it successfully is the
/// only password check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Known plaintext encrypted under the master key
    pub probe: EncryptedBlob,

    /// Base64 random salt used for key derivation
    pub salt: String,
}
