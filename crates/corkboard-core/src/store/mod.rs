//! Store backends.
//!
//! Every backend implements the same reactive [`Store`] contract: writes
//! resolve once durable, reads are push-based watches that deliver the
//! current value immediately and again after every change, and
//! [`Subscription::unsubscribe`] is idempotent.
//!
//! - [`SqliteStore`]: single-user local database, one row per entity.
//! - [`RemoteStore`]: plaintext documents in a per-user remote namespace.
//! - [`EncryptedStore`]: client-side encryption over [`CipherRemoteStore`],
//!   which stores opaque record payloads and owns password setup.

mod encrypted;
mod notify;
pub mod remote;
mod sqlite;
mod traits;

pub use encrypted::EncryptedStore;
pub use remote::{CipherRemoteStore, DocumentDb, FieldFilter, MemoryDocumentDb, RemoteStore, WriteOp};
pub use sqlite::SqliteStore;
pub use traits::{Observer, Store, Subscription};
