//! The uniform reactive store contract.
//!
//! All backends implement [`Store`]: the local SQLite backend, the plaintext
//! remote backend, and the encrypted store decorator. Callers pick one
//! concrete store based on the user's storage-mode choice and thereafter only
//! talk to this trait.
//!
//! Every `watch_*` method delivers the current value to the observer
//! immediately (an empty list or `None` when nothing exists) and again after
//! every subsequent change, until the returned [`Subscription`] is cancelled.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{Board, Card, Chat, UserSettings};

/// Change observer callback.
///
/// Observers run inline on the task that committed the triggering write, so
/// they should hand the value off rather than block.
pub type Observer<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Handle for an active watch.
///
/// [`unsubscribe`](Subscription::unsubscribe) is idempotent and safe to call
/// any number of times. Dropping the handle also cancels the watch. After
/// cancellation the observer is never invoked again, even for writes already
/// in flight.
pub struct Subscription {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// Stop delivery to this watch's observer.
    pub fn unsubscribe(&self) {
        if let Ok(mut slot) = self.cancel.lock() {
            if let Some(cancel) = slot.take() {
                cancel();
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let active = self
            .cancel
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false);
        f.debug_struct("Subscription").field("active", &active).finish()
    }
}

/// Reactive CRUD contract implemented by every backend.
///
/// Writes are upserts by id with last-write-wins semantics; there is no
/// optimistic locking and no field-level patching. After a `set_*` call
/// resolves, any subscription (new or existing) observes the new value. No
/// ordering is guaranteed between independent concurrent writers.
#[async_trait]
pub trait Store: Send + Sync {
    // --- Boards ---

    /// Upsert a board.
    async fn set_board(&self, board: Board) -> Result<()>;

    /// Delete a board and cascade to every card and chat that references it.
    async fn remove_board(&self, id: Uuid) -> Result<()>;

    /// Watch the full board list.
    async fn watch_boards(&self, observer: Observer<Vec<Board>>) -> Result<Subscription>;

    /// Watch a single board; delivers `None` while it does not exist.
    async fn watch_board(&self, id: Uuid, observer: Observer<Option<Board>>)
        -> Result<Subscription>;

    // --- Cards ---

    /// Upsert a card.
    async fn set_card(&self, card: Card) -> Result<()>;

    /// Delete a single card. Never cascades.
    async fn remove_card(&self, id: Uuid) -> Result<()>;

    /// Watch a single card; delivers `None` while it does not exist.
    async fn watch_card(&self, id: Uuid, observer: Observer<Option<Card>>)
        -> Result<Subscription>;

    /// Watch all cards belonging to a board.
    async fn watch_cards_by_board(
        &self,
        board_id: Uuid,
        observer: Observer<Vec<Card>>,
    ) -> Result<Subscription>;

    // --- Chats ---

    /// Upsert a chat (full message snapshot every time).
    async fn set_chat(&self, chat: Chat) -> Result<()>;

    /// Delete a single chat. Never cascades.
    async fn remove_chat(&self, id: Uuid) -> Result<()>;

    /// Watch a single chat; delivers `None` while it does not exist.
    async fn watch_chat(&self, id: Uuid, observer: Observer<Option<Chat>>)
        -> Result<Subscription>;

    /// Watch all chats belonging to a board.
    async fn watch_chats_by_board(
        &self,
        board_id: Uuid,
        observer: Observer<Vec<Chat>>,
    ) -> Result<Subscription>;

    // --- Settings ---

    /// Replace the per-user settings singleton.
    async fn set_user_settings(&self, settings: UserSettings) -> Result<()>;

    /// Watch the per-user settings singleton.
    async fn watch_user_settings(
        &self,
        observer: Observer<Option<UserSettings>>,
    ) -> Result<Subscription>;
}
