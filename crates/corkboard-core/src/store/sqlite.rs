//! Embedded SQLite backend.
//!
//! Records live in four tables (`boards`, `cards`, `chats`, `settings`),
//! each keyed by id with the entity JSON in a single `data` column. There
//! are no secondary indexes: board-scoped queries scan the whole table and
//! filter by `boardId` client-side.
//!
//! The engine has no native push, so every mutation runs inside a
//! transaction and, once the transaction commits, fans out typed
//! notifications through [`Notifier`]. Each notified watch re-queries the
//! affected collection in full rather than applying a delta.
//!
//! Instances do not see each other's writes: the observer registry is
//! per-instance and in-memory. Cross-process consistency is an accepted
//! limitation of this backend.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::model::{Board, Card, Chat, UserSettings};

use super::notify::{Notifier, Topic};
use super::traits::{Observer, Store, Subscription};

const BOARDS_TABLE: &str = "boards";
const CARDS_TABLE: &str = "cards";
const CHATS_TABLE: &str = "chats";
const SETTINGS_TABLE: &str = "settings";

/// Row id of the settings singleton.
const SETTINGS_ROW_ID: &str = "user";

/// Local per-device store over embedded SQLite.
#[derive(Clone)]
pub struct SqliteStore {
    inner: Arc<Inner>,
}

struct Inner {
    conn: Mutex<Connection>,
    notifier: Notifier,
}

/// Minimal projection used when scanning for cascade targets, so a row whose
/// payload no longer parses as a full entity can still be matched by owner.
#[derive(Deserialize)]
struct OwnedRow {
    #[serde(rename = "boardId")]
    board_id: Uuid,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open a store backed by an in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS boards (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cards (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chats (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS settings (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );
            "#,
        )?;

        Ok(Self {
            inner: Arc::new(Inner {
                conn: Mutex::new(conn),
                notifier: Notifier::new(),
            }),
        })
    }
}

impl Inner {
    /// Lock the database connection, returning an error if the mutex is poisoned.
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Storage("SQLite connection poisoned".to_string()))
    }

    fn upsert(&self, table: &str, id: &str, data: &str) -> Result<()> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO {} (id, data) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET data = excluded.data",
                table
            ),
            params![id, data],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn load_all<T: DeserializeOwned>(conn: &Connection, table: &str) -> Result<Vec<T>> {
        let mut stmt = conn.prepare(&format!("SELECT data FROM {}", table))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut out = Vec::new();
        for row in rows {
            let data = row?;
            match serde_json::from_str(&data) {
                Ok(value) => out.push(value),
                Err(err) => tracing::warn!(table, error = %err, "skipping unreadable row"),
            }
        }
        Ok(out)
    }

    fn load_one<T: DeserializeOwned>(
        conn: &Connection,
        table: &str,
        id: &str,
    ) -> Result<Option<T>> {
        let data: Option<String> = conn
            .query_row(
                &format!("SELECT data FROM {} WHERE id = ?1", table),
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    fn fetch_boards(&self) -> Result<Vec<Board>> {
        let conn = self.lock_conn()?;
        let mut boards: Vec<Board> = Self::load_all(&conn, BOARDS_TABLE)?;
        boards.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(boards)
    }

    fn fetch_board(&self, id: Uuid) -> Result<Option<Board>> {
        let conn = self.lock_conn()?;
        Self::load_one(&conn, BOARDS_TABLE, &id.to_string())
    }

    fn fetch_cards_by_board(&self, board_id: Uuid) -> Result<Vec<Card>> {
        let conn = self.lock_conn()?;
        let mut cards: Vec<Card> = Self::load_all(&conn, CARDS_TABLE)?;
        cards.retain(|card| card.board_id == board_id);
        cards.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(cards)
    }

    fn fetch_card(&self, id: Uuid) -> Result<Option<Card>> {
        let conn = self.lock_conn()?;
        Self::load_one(&conn, CARDS_TABLE, &id.to_string())
    }

    fn fetch_chats_by_board(&self, board_id: Uuid) -> Result<Vec<Chat>> {
        let conn = self.lock_conn()?;
        let mut chats: Vec<Chat> = Self::load_all(&conn, CHATS_TABLE)?;
        chats.retain(|chat| chat.board_id == board_id);
        chats.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(chats)
    }

    fn fetch_chat(&self, id: Uuid) -> Result<Option<Chat>> {
        let conn = self.lock_conn()?;
        Self::load_one(&conn, CHATS_TABLE, &id.to_string())
    }

    fn fetch_settings(&self) -> Result<Option<UserSettings>> {
        let conn = self.lock_conn()?;
        Self::load_one(&conn, SETTINGS_TABLE, SETTINGS_ROW_ID)
    }

    /// Delete every row in `table` whose payload references `board_id`.
    ///
    /// Returns the ids of the deleted rows so their single-record topics can
    /// be notified after the transaction commits.
    fn delete_owned_rows(
        tx: &rusqlite::Transaction<'_>,
        table: &str,
        board_id: Uuid,
    ) -> Result<Vec<Uuid>> {
        let mut stmt = tx.prepare(&format!("SELECT id, data FROM {}", table))?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut doomed = Vec::new();
        for row in rows {
            let (id, data) = row?;
            let owner: OwnedRow = match serde_json::from_str(&data) {
                Ok(owner) => owner,
                Err(err) => {
                    tracing::warn!(table, id, error = %err, "row has no readable owner; leaving it");
                    continue;
                }
            };
            if owner.board_id == board_id {
                doomed.push(id);
            }
        }
        drop(stmt);

        let mut ids = Vec::with_capacity(doomed.len());
        for id in doomed {
            tx.execute(&format!("DELETE FROM {} WHERE id = ?1", table), params![id])?;
            if let Ok(parsed) = Uuid::parse_str(&id) {
                ids.push(parsed);
            }
        }
        Ok(ids)
    }

    /// Register a re-query callback for `topic` that pushes the fresh result
    /// into `observer`, logging instead of panicking if the re-query fails.
    fn watch<T: 'static>(
        self: &Arc<Self>,
        topic: Topic,
        observer: Observer<T>,
        fetch: impl Fn(&Inner) -> Result<T> + Send + Sync + 'static,
    ) -> Subscription {
        let inner = Arc::clone(self);
        self.notifier.subscribe(
            topic,
            Arc::new(move || match fetch(&inner) {
                Ok(value) => observer(value),
                Err(err) => tracing::warn!(?topic, error = %err, "re-query after change failed"),
            }),
        )
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn set_board(&self, board: Board) -> Result<()> {
        let data = serde_json::to_string(&board)?;
        self.inner
            .upsert(BOARDS_TABLE, &board.id.to_string(), &data)?;
        self.inner
            .notifier
            .notify(&[Topic::Board(board.id), Topic::Boards]);
        Ok(())
    }

    async fn remove_board(&self, id: Uuid) -> Result<()> {
        let (card_ids, chat_ids) = {
            let mut conn = self.inner.lock_conn()?;
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM boards WHERE id = ?1",
                params![id.to_string()],
            )?;
            let card_ids = Inner::delete_owned_rows(&tx, CARDS_TABLE, id)?;
            let chat_ids = Inner::delete_owned_rows(&tx, CHATS_TABLE, id)?;
            tx.commit()?;
            (card_ids, chat_ids)
        };

        let mut topics = vec![
            Topic::Board(id),
            Topic::Boards,
            Topic::CardsOfBoard(id),
            Topic::ChatsOfBoard(id),
        ];
        topics.extend(card_ids.into_iter().map(Topic::Card));
        topics.extend(chat_ids.into_iter().map(Topic::Chat));
        self.inner.notifier.notify(&topics);
        Ok(())
    }

    async fn watch_boards(&self, observer: Observer<Vec<Board>>) -> Result<Subscription> {
        observer(self.inner.fetch_boards()?);
        Ok(self
            .inner
            .watch(Topic::Boards, observer, Inner::fetch_boards))
    }

    async fn watch_board(
        &self,
        id: Uuid,
        observer: Observer<Option<Board>>,
    ) -> Result<Subscription> {
        observer(self.inner.fetch_board(id)?);
        Ok(self
            .inner
            .watch(Topic::Board(id), observer, move |inner| {
                inner.fetch_board(id)
            }))
    }

    async fn set_card(&self, card: Card) -> Result<()> {
        let data = serde_json::to_string(&card)?;
        self.inner.upsert(CARDS_TABLE, &card.id.to_string(), &data)?;
        self.inner
            .notifier
            .notify(&[Topic::Card(card.id), Topic::CardsOfBoard(card.board_id)]);
        Ok(())
    }

    async fn remove_card(&self, id: Uuid) -> Result<()> {
        let board_id = {
            let mut conn = self.inner.lock_conn()?;
            let tx = conn.transaction()?;
            let card: Option<Card> = Inner::load_one(&tx, CARDS_TABLE, &id.to_string())?;
            tx.execute("DELETE FROM cards WHERE id = ?1", params![id.to_string()])?;
            tx.commit()?;
            card.map(|card| card.board_id)
        };

        let mut topics = vec![Topic::Card(id)];
        if let Some(board_id) = board_id {
            topics.push(Topic::CardsOfBoard(board_id));
        }
        self.inner.notifier.notify(&topics);
        Ok(())
    }

    async fn watch_card(
        &self,
        id: Uuid,
        observer: Observer<Option<Card>>,
    ) -> Result<Subscription> {
        observer(self.inner.fetch_card(id)?);
        Ok(self.inner.watch(Topic::Card(id), observer, move |inner| {
            inner.fetch_card(id)
        }))
    }

    async fn watch_cards_by_board(
        &self,
        board_id: Uuid,
        observer: Observer<Vec<Card>>,
    ) -> Result<Subscription> {
        observer(self.inner.fetch_cards_by_board(board_id)?);
        Ok(self
            .inner
            .watch(Topic::CardsOfBoard(board_id), observer, move |inner| {
                inner.fetch_cards_by_board(board_id)
            }))
    }

    async fn set_chat(&self, chat: Chat) -> Result<()> {
        let data = serde_json::to_string(&chat)?;
        self.inner.upsert(CHATS_TABLE, &chat.id.to_string(), &data)?;
        self.inner
            .notifier
            .notify(&[Topic::Chat(chat.id), Topic::ChatsOfBoard(chat.board_id)]);
        Ok(())
    }

    async fn remove_chat(&self, id: Uuid) -> Result<()> {
        let board_id = {
            let mut conn = self.inner.lock_conn()?;
            let tx = conn.transaction()?;
            let chat: Option<Chat> = Inner::load_one(&tx, CHATS_TABLE, &id.to_string())?;
            tx.execute("DELETE FROM chats WHERE id = ?1", params![id.to_string()])?;
            tx.commit()?;
            chat.map(|chat| chat.board_id)
        };

        let mut topics = vec![Topic::Chat(id)];
        if let Some(board_id) = board_id {
            topics.push(Topic::ChatsOfBoard(board_id));
        }
        self.inner.notifier.notify(&topics);
        Ok(())
    }

    async fn watch_chat(
        &self,
        id: Uuid,
        observer: Observer<Option<Chat>>,
    ) -> Result<Subscription> {
        observer(self.inner.fetch_chat(id)?);
        Ok(self.inner.watch(Topic::Chat(id), observer, move |inner| {
            inner.fetch_chat(id)
        }))
    }

    async fn watch_chats_by_board(
        &self,
        board_id: Uuid,
        observer: Observer<Vec<Chat>>,
    ) -> Result<Subscription> {
        observer(self.inner.fetch_chats_by_board(board_id)?);
        Ok(self
            .inner
            .watch(Topic::ChatsOfBoard(board_id), observer, move |inner| {
                inner.fetch_chats_by_board(board_id)
            }))
    }

    async fn set_user_settings(&self, settings: UserSettings) -> Result<()> {
        let data = serde_json::to_string(&settings)?;
        self.inner.upsert(SETTINGS_TABLE, SETTINGS_ROW_ID, &data)?;
        self.inner.notifier.notify(&[Topic::Settings]);
        Ok(())
    }

    async fn watch_user_settings(
        &self,
        observer: Observer<Option<UserSettings>>,
    ) -> Result<Subscription> {
        observer(self.inner.fetch_settings()?);
        Ok(self
            .inner
            .watch(Topic::Settings, observer, Inner::fetch_settings))
    }
}
