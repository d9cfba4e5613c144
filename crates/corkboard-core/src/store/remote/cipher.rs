//! Ciphertext remote backend.
//!
//! Structurally identical to the plaintext backend, but every record payload
//! is an opaque [`EncryptedBlob`]: only the envelope fields (`id`, `boardId`,
//! timestamps) stay plaintext so the database can still query by board and
//! cascade deletes. The remote operator never observes note contents.
//!
//! This backend also owns the per-user encryption record at
//! `settings/encryption` and the initialize/validate-password operations.
//! Both hand the derived master key back to the caller as an explicit
//! [`MasterKey`] handle; nothing here retains key material.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::crypto::{blob, derive_master_key, generate_salt, validate_password_strength, MasterKey};
use crate::error::{Result, StoreError};
use crate::model::{EncryptedBlob, EncryptedRecord, EncryptionConfig};
use crate::session::Session;
use crate::store::traits::{Observer, Subscription};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::db::{DocumentDb, FieldFilter, WriteOp};
use super::{
    decode_doc, decode_list, BOARDS_COLLECTION, CARDS_COLLECTION, CHATS_COLLECTION,
    ENCRYPTION_DOC, SETTINGS_COLLECTION, SETTINGS_DOC,
};

/// Fixed known plaintext encrypted at initialization and used solely to
/// validate candidate passwords.
const KEY_PROBE: &[u8] = b"corkboard.key-probe.v1";

/// Which record collection an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordKind {
    Boards,
    Cards,
    Chats,
}

impl RecordKind {
    fn collection(self) -> &'static str {
        match self {
            Self::Boards => BOARDS_COLLECTION,
            Self::Cards => CARDS_COLLECTION,
            Self::Chats => CHATS_COLLECTION,
        }
    }
}

/// Stored form of the encrypted settings singleton.
#[derive(Serialize, Deserialize)]
struct SettingsDoc {
    data: EncryptedBlob,
}

/// Remote backend over encrypted records.
#[derive(Clone)]
pub struct CipherRemoteStore {
    db: Arc<dyn DocumentDb>,
    root: String,
}

impl CipherRemoteStore {
    /// Build a store scoped to the session's user namespace.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` when the session carries no user.
    pub fn new(db: Arc<dyn DocumentDb>, session: &Session) -> Result<Self> {
        let root = format!("users/{}", session.user_id()?);
        Ok(Self { db, root })
    }

    fn collection(&self, kind: RecordKind) -> String {
        format!("{}/{}", self.root, kind.collection())
    }

    fn doc_path(&self, kind: RecordKind, id: Uuid) -> String {
        format!("{}/{}/{}", self.root, kind.collection(), id)
    }

    fn settings_path(&self) -> String {
        format!("{}/{}/{}", self.root, SETTINGS_COLLECTION, SETTINGS_DOC)
    }

    fn encryption_path(&self) -> String {
        format!("{}/{}/{}", self.root, SETTINGS_COLLECTION, ENCRYPTION_DOC)
    }

    fn board_filter(board_id: Uuid) -> FieldFilter {
        FieldFilter::field_eq("boardId", board_id.to_string())
    }

    // --- Encryption setup ---

    /// Whether the per-user encryption record exists.
    pub async fn is_initialized(&self) -> Result<bool> {
        Ok(self.db.get_doc(&self.encryption_path()).await?.is_some())
    }

    /// Set up encryption for this account.
    ///
    /// Generates a fresh random salt, derives the master key, encrypts the
    /// known probe plaintext under it and persists `{probe, salt}`. The
    /// derived key is returned for immediate use by the encrypted store.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyInitialized` if an encryption record already exists,
    /// and `InvalidInput` for a password failing the strength check.
    pub async fn initialize(&self, password: &str) -> Result<MasterKey> {
        validate_password_strength(password)?;
        if self.is_initialized().await? {
            return Err(StoreError::AlreadyInitialized);
        }

        let salt = generate_salt();
        let key = derive_master_key(password, &salt)?;
        let probe = blob::encrypt(&key, KEY_PROBE)?;
        let config = EncryptionConfig {
            probe,
            salt: BASE64.encode(salt),
        };
        self.db
            .set_doc(&self.encryption_path(), serde_json::to_value(&config)?)
            .await?;
        Ok(key)
    }

    /// Check a candidate password against the stored probe.
    ///
    /// Returns the derived master key when the probe decrypts to the known
    /// plaintext, `None` for a wrong password.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` if encryption was never set up for this
    /// account, and `InvalidRecordShape` if the stored encryption record is
    /// unreadable.
    pub async fn validate_password(&self, password: &str) -> Result<Option<MasterKey>> {
        let doc = self
            .db
            .get_doc(&self.encryption_path())
            .await?
            .ok_or(StoreError::NotInitialized)?;
        let config: EncryptionConfig = serde_json::from_value(doc)
            .map_err(|e| StoreError::InvalidRecordShape(e.to_string()))?;
        let salt = BASE64
            .decode(&config.salt)
            .map_err(|_| StoreError::InvalidRecordShape("salt is not base64".to_string()))?;

        let key = derive_master_key(password, &salt)?;
        match blob::decrypt(&key, &config.probe) {
            Ok(plaintext) if plaintext == KEY_PROBE => Ok(Some(key)),
            Ok(_) => Ok(None),
            Err(StoreError::DecryptionFailure) => Ok(None),
            Err(err) => Err(err),
        }
    }

    // --- Record operations (used by the encrypted store decorator) ---

    pub(crate) async fn put_record(
        &self,
        kind: RecordKind,
        record: &EncryptedRecord,
    ) -> Result<()> {
        self.db
            .set_doc(&self.doc_path(kind, record.id), serde_json::to_value(record)?)
            .await
    }

    pub(crate) async fn delete_record(&self, kind: RecordKind, id: Uuid) -> Result<()> {
        self.db.delete_doc(&self.doc_path(kind, id)).await
    }

    /// Delete a board record and every card/chat record it owns, atomically.
    pub(crate) async fn remove_board_tree(&self, board_id: Uuid) -> Result<()> {
        let mut writes = vec![WriteOp::delete(self.doc_path(RecordKind::Boards, board_id))];
        for kind in [RecordKind::Cards, RecordKind::Chats] {
            let docs = self
                .db
                .list_docs(&self.collection(kind), Some(&Self::board_filter(board_id)))
                .await?;
            writes.extend(
                docs.iter()
                    .filter_map(|doc| doc.get("id").and_then(Value::as_str))
                    .map(|id| WriteOp::delete(format!("{}/{}/{}", self.root, kind.collection(), id))),
            );
        }
        self.db.commit(writes).await
    }

    pub(crate) async fn watch_record(
        &self,
        kind: RecordKind,
        id: Uuid,
        observer: Observer<Option<EncryptedRecord>>,
    ) -> Result<Subscription> {
        let collection = self.collection(kind);
        self.db
            .watch_doc(
                &self.doc_path(kind, id),
                Arc::new(move |doc| {
                    observer(doc.and_then(|doc| decode_doc(&collection, doc)));
                }),
            )
            .await
    }

    /// Watch all records of a kind, optionally scoped to one board.
    ///
    /// Snapshots are delivered sorted by the plaintext `createdAt` envelope
    /// field; per-document shape failures are isolated.
    pub(crate) async fn watch_records(
        &self,
        kind: RecordKind,
        board_id: Option<Uuid>,
        observer: Observer<Vec<EncryptedRecord>>,
    ) -> Result<Subscription> {
        let collection = self.collection(kind);
        let name = collection.clone();
        self.db
            .watch_collection(
                &collection,
                board_id.map(Self::board_filter),
                Arc::new(move |docs| {
                    let mut records: Vec<EncryptedRecord> = decode_list(&name, docs);
                    records.sort_by_key(|record| (record.created_at, record.id));
                    observer(records);
                }),
            )
            .await
    }

    pub(crate) async fn put_settings(&self, data: EncryptedBlob) -> Result<()> {
        self.db
            .set_doc(
                &self.settings_path(),
                serde_json::to_value(&SettingsDoc { data })?,
            )
            .await
    }

    pub(crate) async fn watch_settings(
        &self,
        observer: Observer<Option<EncryptedBlob>>,
    ) -> Result<Subscription> {
        let collection = format!("{}/{}", self.root, SETTINGS_COLLECTION);
        self.db
            .watch_doc(
                &self.settings_path(),
                Arc::new(move |doc| {
                    observer(
                        doc.and_then(|doc| decode_doc::<SettingsDoc>(&collection, doc))
                            .map(|doc| doc.data),
                    );
                }),
            )
            .await
    }
}
