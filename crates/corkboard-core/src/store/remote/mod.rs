//! Remote document-database backends.
//!
//! The remote engine is a multi-tenant document database with native
//! push-based change notification; [`db::DocumentDb`] is the seam this layer
//! talks through. Two backends sit on top of it:
//!
//! - [`plain::RemoteStore`] stores entities as plaintext documents and
//!   implements the full [`Store`](super::traits::Store) contract directly.
//! - [`cipher::CipherRemoteStore`] is structurally identical but its record
//!   payloads are opaque encrypted blobs; it additionally owns the per-user
//!   encryption record (probe + salt) and the initialize/validate-password
//!   operations. The encrypted store decorator composes it with a master key
//!   to present the same `Store` contract as the other backends.
//!
//! Each user's records live in a private namespace:
//! `users/{uid}/{boards,cards,chats}` plus `users/{uid}/settings/{user,encryption}`.

pub mod cipher;
pub mod db;
pub mod memory;
pub mod plain;

pub use cipher::CipherRemoteStore;
pub use db::{DocumentDb, FieldFilter, WriteOp};
pub use memory::MemoryDocumentDb;
pub use plain::RemoteStore;

use serde::de::DeserializeOwned;

pub(crate) const BOARDS_COLLECTION: &str = "boards";
pub(crate) const CARDS_COLLECTION: &str = "cards";
pub(crate) const CHATS_COLLECTION: &str = "chats";
pub(crate) const SETTINGS_COLLECTION: &str = "settings";

/// Document id of the per-user settings singleton.
pub(crate) const SETTINGS_DOC: &str = "user";

/// Document id of the per-user encryption record.
pub(crate) const ENCRYPTION_DOC: &str = "encryption";

/// Decode one watched document, logging and discarding it if it no longer
/// matches the expected shape.
fn decode_doc<T: DeserializeOwned>(collection: &str, doc: serde_json::Value) -> Option<T> {
    match serde_json::from_value(doc) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(collection, error = %err, "dropping malformed document");
            None
        }
    }
}

/// Decode a collection snapshot, isolating per-document failures.
fn decode_list<T: DeserializeOwned>(collection: &str, docs: Vec<serde_json::Value>) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| decode_doc(collection, doc))
        .collect()
}
