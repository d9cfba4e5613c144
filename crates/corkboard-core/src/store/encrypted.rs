//! Encrypted store decorator.
//!
//! Wraps a [`CipherRemoteStore`] and a validated [`MasterKey`] to expose the
//! same [`Store`] contract as the other backends. On every write the entity
//! is split into its plaintext envelope (`id`, `boardId`, timestamps) and a
//! remainder body that is JSON-serialized and encrypted; reads reverse the
//! split.
//!
//! Failure handling follows the contract in the error module: a record that
//! fails to decrypt or no longer matches its expected shape is logged and
//! dropped from collection snapshots, and delivered as `None` from
//! single-record watches. One corrupted card never blocks the rest of a
//! board from loading.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{blob, MasterKey};
use crate::error::{Result, StoreError};
use crate::model::{Board, Card, CardContent, Chat, ChatMessage, EncryptedBlob, EncryptedRecord,
    UserSettings};
use crate::store::remote::cipher::RecordKind;
use crate::store::remote::CipherRemoteStore;
use crate::store::traits::{Observer, Store, Subscription};

/// Store decorator encrypting on write and decrypting on read.
///
/// The key is obtained from [`CipherRemoteStore::initialize`] or
/// [`CipherRemoteStore::validate_password`] and owned by the decorator for
/// the lifetime of the session. It is never persisted; after a reload the
/// password must be validated again.
#[derive(Clone)]
pub struct EncryptedStore {
    remote: CipherRemoteStore,
    key: Arc<MasterKey>,
}

/// Board fields that travel encrypted.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardBody {
    title: String,
    view_type: String,
    layout_config: serde_json::Value,
}

/// Card fields that travel encrypted. Deserializing this body is the
/// structural validity check for the tagged union: payloads matching none of
/// the card variants are rejected here, exactly like a decrypt failure.
#[derive(Serialize, Deserialize)]
struct CardBody {
    title: String,
    #[serde(flatten)]
    content: CardContent,
}

/// Chat fields that travel encrypted.
#[derive(Serialize, Deserialize)]
struct ChatBody {
    title: String,
    messages: Vec<ChatMessage>,
}

fn seal<T: Serialize>(key: &MasterKey, body: &T) -> Result<EncryptedBlob> {
    blob::encrypt(key, &serde_json::to_vec(body)?)
}

fn open<T: DeserializeOwned>(key: &MasterKey, data: &EncryptedBlob) -> Result<T> {
    let plaintext = blob::decrypt(key, data)?;
    serde_json::from_slice(&plaintext).map_err(|e| StoreError::InvalidRecordShape(e.to_string()))
}

fn open_board(key: &MasterKey, record: &EncryptedRecord) -> Result<Board> {
    let body: BoardBody = open(key, &record.data)?;
    Ok(Board {
        id: record.id,
        title: body.title,
        view_type: body.view_type,
        layout_config: body.layout_config,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

fn open_card(key: &MasterKey, record: &EncryptedRecord) -> Result<Card> {
    let board_id = record
        .board_id
        .ok_or_else(|| StoreError::InvalidRecordShape("card record missing boardId".to_string()))?;
    let body: CardBody = open(key, &record.data)?;
    Ok(Card {
        id: record.id,
        board_id,
        title: body.title,
        content: body.content,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

fn open_chat(key: &MasterKey, record: &EncryptedRecord) -> Result<Chat> {
    let board_id = record
        .board_id
        .ok_or_else(|| StoreError::InvalidRecordShape("chat record missing boardId".to_string()))?;
    let body: ChatBody = open(key, &record.data)?;
    Ok(Chat {
        id: record.id,
        board_id,
        title: body.title,
        messages: body.messages,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

/// Decode a collection snapshot, dropping records that fail to decrypt or
/// no longer match their shape.
fn open_list<T>(
    key: &MasterKey,
    kind: &'static str,
    records: Vec<EncryptedRecord>,
    open_one: impl Fn(&MasterKey, &EncryptedRecord) -> Result<T>,
) -> Vec<T> {
    records
        .iter()
        .filter_map(|record| match open_one(key, record) {
            Ok(entity) => Some(entity),
            Err(err) => {
                tracing::warn!(kind, id = %record.id, error = %err, "dropping unreadable record");
                None
            }
        })
        .collect()
}

/// Decode a single watched record; unreadable records deliver `None`.
fn open_single<T>(
    key: &MasterKey,
    kind: &'static str,
    record: Option<EncryptedRecord>,
    open_one: impl Fn(&MasterKey, &EncryptedRecord) -> Result<T>,
) -> Option<T> {
    let record = record?;
    match open_one(key, &record) {
        Ok(entity) => Some(entity),
        Err(err) => {
            tracing::warn!(kind, id = %record.id, error = %err, "record unreadable; delivering null");
            None
        }
    }
}

impl EncryptedStore {
    /// Compose the ciphertext backend with a validated master key.
    pub fn new(remote: CipherRemoteStore, key: MasterKey) -> Self {
        Self {
            remote,
            key: Arc::new(key),
        }
    }

    fn board_record(&self, board: &Board) -> Result<EncryptedRecord> {
        Ok(EncryptedRecord {
            id: board.id,
            board_id: None,
            created_at: board.created_at,
            updated_at: board.updated_at,
            data: seal(
                &self.key,
                &BoardBody {
                    title: board.title.clone(),
                    view_type: board.view_type.clone(),
                    layout_config: board.layout_config.clone(),
                },
            )?,
        })
    }

    fn card_record(&self, card: &Card) -> Result<EncryptedRecord> {
        Ok(EncryptedRecord {
            id: card.id,
            board_id: Some(card.board_id),
            created_at: card.created_at,
            updated_at: card.updated_at,
            data: seal(
                &self.key,
                &CardBody {
                    title: card.title.clone(),
                    content: card.content.clone(),
                },
            )?,
        })
    }

    fn chat_record(&self, chat: &Chat) -> Result<EncryptedRecord> {
        Ok(EncryptedRecord {
            id: chat.id,
            board_id: Some(chat.board_id),
            created_at: chat.created_at,
            updated_at: chat.updated_at,
            data: seal(
                &self.key,
                &ChatBody {
                    title: chat.title.clone(),
                    messages: chat.messages.clone(),
                },
            )?,
        })
    }
}

#[async_trait]
impl Store for EncryptedStore {
    async fn set_board(&self, board: Board) -> Result<()> {
        let record = self.board_record(&board)?;
        self.remote.put_record(RecordKind::Boards, &record).await
    }

    async fn remove_board(&self, id: Uuid) -> Result<()> {
        self.remote.remove_board_tree(id).await
    }

    async fn watch_boards(&self, observer: Observer<Vec<Board>>) -> Result<Subscription> {
        let key = Arc::clone(&self.key);
        self.remote
            .watch_records(
                RecordKind::Boards,
                None,
                Arc::new(move |records| {
                    observer(open_list(&key, "board", records, open_board));
                }),
            )
            .await
    }

    async fn watch_board(
        &self,
        id: Uuid,
        observer: Observer<Option<Board>>,
    ) -> Result<Subscription> {
        let key = Arc::clone(&self.key);
        self.remote
            .watch_record(
                RecordKind::Boards,
                id,
                Arc::new(move |record| {
                    observer(open_single(&key, "board", record, open_board));
                }),
            )
            .await
    }

    async fn set_card(&self, card: Card) -> Result<()> {
        let record = self.card_record(&card)?;
        self.remote.put_record(RecordKind::Cards, &record).await
    }

    async fn remove_card(&self, id: Uuid) -> Result<()> {
        self.remote.delete_record(RecordKind::Cards, id).await
    }

    async fn watch_card(
        &self,
        id: Uuid,
        observer: Observer<Option<Card>>,
    ) -> Result<Subscription> {
        let key = Arc::clone(&self.key);
        self.remote
            .watch_record(
                RecordKind::Cards,
                id,
                Arc::new(move |record| {
                    observer(open_single(&key, "card", record, open_card));
                }),
            )
            .await
    }

    async fn watch_cards_by_board(
        &self,
        board_id: Uuid,
        observer: Observer<Vec<Card>>,
    ) -> Result<Subscription> {
        let key = Arc::clone(&self.key);
        self.remote
            .watch_records(
                RecordKind::Cards,
                Some(board_id),
                Arc::new(move |records| {
                    observer(open_list(&key, "card", records, open_card));
                }),
            )
            .await
    }

    async fn set_chat(&self, chat: Chat) -> Result<()> {
        let record = self.chat_record(&chat)?;
        self.remote.put_record(RecordKind::Chats, &record).await
    }

    async fn remove_chat(&self, id: Uuid) -> Result<()> {
        self.remote.delete_record(RecordKind::Chats, id).await
    }

    async fn watch_chat(
        &self,
        id: Uuid,
        observer: Observer<Option<Chat>>,
    ) -> Result<Subscription> {
        let key = Arc::clone(&self.key);
        self.remote
            .watch_record(
                RecordKind::Chats,
                id,
                Arc::new(move |record| {
                    observer(open_single(&key, "chat", record, open_chat));
                }),
            )
            .await
    }

    async fn watch_chats_by_board(
        &self,
        board_id: Uuid,
        observer: Observer<Vec<Chat>>,
    ) -> Result<Subscription> {
        let key = Arc::clone(&self.key);
        self.remote
            .watch_records(
                RecordKind::Chats,
                Some(board_id),
                Arc::new(move |records| {
                    observer(open_list(&key, "chat", records, open_chat));
                }),
            )
            .await
    }

    async fn set_user_settings(&self, settings: UserSettings) -> Result<()> {
        let data = seal(&self.key, &settings)?;
        self.remote.put_settings(data).await
    }

    async fn watch_user_settings(
        &self,
        observer: Observer<Option<UserSettings>>,
    ) -> Result<Subscription> {
        let key = Arc::clone(&self.key);
        self.remote
            .watch_settings(Arc::new(move |data| {
                observer(data.and_then(|data| match open::<UserSettings>(&key, &data) {
                    Ok(settings) => Some(settings),
                    Err(err) => {
                        tracing::warn!(error = %err, "settings unreadable; delivering null");
                        None
                    }
                }));
            }))
            .await
    }
}
