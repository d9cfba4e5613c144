//! # Corkboard Core
//!
//! Persistence and encryption layer for a board-based note organizer.
//!
//! This crate provides the storage backends, data models and client-side
//! encryption independent of any UI layer.
//!
//! ## Architecture
//!
//! - **model**: Boards, cards, chats, settings and the encrypted wire types
//! - **store**: The reactive `Store` contract and its backends (local SQLite,
//!   remote document database, encrypted remote)
//! - **crypto**: Key derivation, AES-256-GCM blob encryption, password rules
//! - **session**: Authentication state the remote backends are scoped by
//! - **error**: Shared error taxonomy and `Result` alias

pub mod crypto;
pub mod error;
pub mod model;
pub mod session;
pub mod store;

pub use error::{Result, StoreError};
pub use session::Session;
pub use store::{
    CipherRemoteStore, EncryptedStore, MemoryDocumentDb, Observer, RemoteStore, SqliteStore,
    Store, Subscription,
};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
