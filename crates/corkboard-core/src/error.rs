//! Error types for core storage operations.
//!
//! Errors are descriptive at the core level; the UI layer maps these to
//! user-facing messages. Write and delete failures always propagate to the
//! caller; per-record decrypt failures inside collection reads are isolated
//! by the encrypted store instead of surfacing here.

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Core error type for the storage and encryption layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No authenticated user in the current session
    #[error("No authenticated user")]
    NotAuthenticated,

    /// Encryption setup attempted twice for the same account
    #[error("Encryption is already initialized for this account")]
    AlreadyInitialized,

    /// Encrypted store used before encryption setup
    #[error("Encryption has not been initialized for this account")]
    NotInitialized,

    /// Wrong key, or tampered/corrupted/malformed ciphertext
    #[error("Decryption failed")]
    DecryptionFailure,

    /// Decrypted payload does not match the expected record shape
    #[error("Invalid record shape: {0}")]
    InvalidRecordShape(String),

    /// Transport or database failure in a remote backend
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Key derivation or cipher setup error
    #[error("Encryption error: {0}")]
    Crypto(String),

    /// Invalid user input (e.g. a too-short password)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage backend error (generic)
    #[error("Storage error: {0}")]
    Storage(String),

    /// SQLite-specific storage error
    #[error("SQLite error: {source}")]
    Sqlite {
        #[from]
        source: rusqlite::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}
