//! Plaintext remote backend.
//!
//! Stores entities as plain JSON documents in the per-user namespace and
//! implements the [`Store`] contract directly over the database's native
//! listeners. Board removal is one atomic batch: the board document plus
//! every card and chat whose `boardId` matches, all-or-nothing.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{Board, Card, Chat, UserSettings};
use crate::session::Session;
use crate::store::traits::{Observer, Store, Subscription};

use super::db::{DocumentDb, FieldFilter, WriteOp};
use super::{
    decode_doc, decode_list, BOARDS_COLLECTION, CARDS_COLLECTION, CHATS_COLLECTION,
    SETTINGS_COLLECTION, SETTINGS_DOC,
};

/// Remote backend over plaintext documents.
#[derive(Clone)]
pub struct RemoteStore {
    db: Arc<dyn DocumentDb>,
    root: String,
}

impl RemoteStore {
    /// Build a store scoped to the session's user namespace.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` when the session carries no user.
    pub fn new(db: Arc<dyn DocumentDb>, session: &Session) -> Result<Self> {
        let root = format!("users/{}", session.user_id()?);
        Ok(Self { db, root })
    }

    fn collection(&self, name: &str) -> String {
        format!("{}/{}", self.root, name)
    }

    fn doc_path(&self, collection: &str, id: Uuid) -> String {
        format!("{}/{}/{}", self.root, collection, id)
    }

    fn settings_path(&self) -> String {
        format!("{}/{}/{}", self.root, SETTINGS_COLLECTION, SETTINGS_DOC)
    }

    fn board_filter(board_id: Uuid) -> FieldFilter {
        FieldFilter::field_eq("boardId", board_id.to_string())
    }

    /// Delete ops for every document of `collection` owned by `board_id`.
    async fn cascade_deletes(&self, collection: &str, board_id: Uuid) -> Result<Vec<WriteOp>> {
        let docs = self
            .db
            .list_docs(&self.collection(collection), Some(&Self::board_filter(board_id)))
            .await?;
        Ok(docs
            .iter()
            .filter_map(|doc| doc.get("id").and_then(Value::as_str))
            .map(|id| WriteOp::delete(format!("{}/{}/{}", self.root, collection, id)))
            .collect())
    }
}

#[async_trait]
impl Store for RemoteStore {
    async fn set_board(&self, board: Board) -> Result<()> {
        self.db
            .set_doc(
                &self.doc_path(BOARDS_COLLECTION, board.id),
                serde_json::to_value(&board)?,
            )
            .await
    }

    async fn remove_board(&self, id: Uuid) -> Result<()> {
        let mut writes = vec![WriteOp::delete(self.doc_path(BOARDS_COLLECTION, id))];
        writes.extend(self.cascade_deletes(CARDS_COLLECTION, id).await?);
        writes.extend(self.cascade_deletes(CHATS_COLLECTION, id).await?);
        self.db.commit(writes).await
    }

    async fn watch_boards(&self, observer: Observer<Vec<Board>>) -> Result<Subscription> {
        let collection = self.collection(BOARDS_COLLECTION);
        let name = collection.clone();
        self.db
            .watch_collection(
                &collection,
                None,
                Arc::new(move |docs| {
                    let mut boards: Vec<Board> = decode_list(&name, docs);
                    boards.sort_by_key(|board| (board.created_at, board.id));
                    observer(boards);
                }),
            )
            .await
    }

    async fn watch_board(
        &self,
        id: Uuid,
        observer: Observer<Option<Board>>,
    ) -> Result<Subscription> {
        let collection = self.collection(BOARDS_COLLECTION);
        self.db
            .watch_doc(
                &self.doc_path(BOARDS_COLLECTION, id),
                Arc::new(move |doc| {
                    observer(doc.and_then(|doc| decode_doc(&collection, doc)));
                }),
            )
            .await
    }

    async fn set_card(&self, card: Card) -> Result<()> {
        self.db
            .set_doc(
                &self.doc_path(CARDS_COLLECTION, card.id),
                serde_json::to_value(&card)?,
            )
            .await
    }

    async fn remove_card(&self, id: Uuid) -> Result<()> {
        self.db
            .delete_doc(&self.doc_path(CARDS_COLLECTION, id))
            .await
    }

    async fn watch_card(
        &self,
        id: Uuid,
        observer: Observer<Option<Card>>,
    ) -> Result<Subscription> {
        let collection = self.collection(CARDS_COLLECTION);
        self.db
            .watch_doc(
                &self.doc_path(CARDS_COLLECTION, id),
                Arc::new(move |doc| {
                    observer(doc.and_then(|doc| decode_doc(&collection, doc)));
                }),
            )
            .await
    }

    async fn watch_cards_by_board(
        &self,
        board_id: Uuid,
        observer: Observer<Vec<Card>>,
    ) -> Result<Subscription> {
        let collection = self.collection(CARDS_COLLECTION);
        let name = collection.clone();
        self.db
            .watch_collection(
                &collection,
                Some(Self::board_filter(board_id)),
                Arc::new(move |docs| {
                    let mut cards: Vec<Card> = decode_list(&name, docs);
                    cards.sort_by_key(|card| (card.created_at, card.id));
                    observer(cards);
                }),
            )
            .await
    }

    async fn set_chat(&self, chat: Chat) -> Result<()> {
        self.db
            .set_doc(
                &self.doc_path(CHATS_COLLECTION, chat.id),
                serde_json::to_value(&chat)?,
            )
            .await
    }

    async fn remove_chat(&self, id: Uuid) -> Result<()> {
        self.db
            .delete_doc(&self.doc_path(CHATS_COLLECTION, id))
            .await
    }

    async fn watch_chat(
        &self,
        id: Uuid,
        observer: Observer<Option<Chat>>,
    ) -> Result<Subscription> {
        let collection = self.collection(CHATS_COLLECTION);
        self.db
            .watch_doc(
                &self.doc_path(CHATS_COLLECTION, id),
                Arc::new(move |doc| {
                    observer(doc.and_then(|doc| decode_doc(&collection, doc)));
                }),
            )
            .await
    }

    async fn watch_chats_by_board(
        &self,
        board_id: Uuid,
        observer: Observer<Vec<Chat>>,
    ) -> Result<Subscription> {
        let collection = self.collection(CHATS_COLLECTION);
        let name = collection.clone();
        self.db
            .watch_collection(
                &collection,
                Some(Self::board_filter(board_id)),
                Arc::new(move |docs| {
                    let mut chats: Vec<Chat> = decode_list(&name, docs);
                    chats.sort_by_key(|chat| (chat.created_at, chat.id));
                    observer(chats);
                }),
            )
            .await
    }

    async fn set_user_settings(&self, settings: UserSettings) -> Result<()> {
        self.db
            .set_doc(&self.settings_path(), serde_json::to_value(&settings)?)
            .await
    }

    async fn watch_user_settings(
        &self,
        observer: Observer<Option<UserSettings>>,
    ) -> Result<Subscription> {
        let path = self.settings_path();
        let collection = self.collection(SETTINGS_COLLECTION);
        self.db
            .watch_doc(
                &path,
                Arc::new(move |doc| {
                    observer(doc.and_then(|doc| decode_doc(&collection, doc)));
                }),
            )
            .await
    }
}
