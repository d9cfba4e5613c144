//! Typed change-notification registry for the local backend.
//!
//! The embedded SQLite engine has no native push mechanism, so the local
//! backend fans out its own notifications after each transaction commits.
//! Topics are a sum type rather than concatenated channel strings, so two
//! logically different channels can never collide on a key.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use super::traits::Subscription;

/// A logical change channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Topic {
    /// The board list
    Boards,
    /// One board
    Board(Uuid),
    /// One card
    Card(Uuid),
    /// All cards of one board
    CardsOfBoard(Uuid),
    /// One chat
    Chat(Uuid),
    /// All chats of one board
    ChatsOfBoard(Uuid),
    /// The settings singleton
    Settings,
}

struct Entry {
    id: u64,
    topic: Topic,
    active: Arc<AtomicBool>,
    callback: Arc<dyn Fn() + Send + Sync>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
}

/// Observer registry keyed by [`Topic`].
///
/// Callbacks re-query the affected collection and push the fresh result to
/// the caller's observer; notification carries no payload of its own.
#[derive(Clone, Default)]
pub(crate) struct Notifier {
    inner: Arc<Mutex<Registry>>,
}

impl Notifier {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a callback for a topic.
    ///
    /// The returned subscription removes the entry and flips its active flag,
    /// so a cancellation always wins over an in-flight notification.
    pub(crate) fn subscribe(
        &self,
        topic: Topic,
        callback: Arc<dyn Fn() + Send + Sync>,
    ) -> Subscription {
        let active = Arc::new(AtomicBool::new(true));
        let id = {
            let mut registry = match self.inner.lock() {
                Ok(registry) => registry,
                Err(poisoned) => poisoned.into_inner(),
            };
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.push(Entry {
                id,
                topic,
                active: Arc::clone(&active),
                callback,
            });
            id
        };

        let inner = Arc::clone(&self.inner);
        Subscription::new(move || {
            active.store(false, Ordering::SeqCst);
            let mut registry = match inner.lock() {
                Ok(registry) => registry,
                Err(poisoned) => poisoned.into_inner(),
            };
            registry.entries.retain(|entry| entry.id != id);
        })
    }

    /// Invoke every active callback registered for any of `topics`.
    ///
    /// Matching callbacks are collected first and invoked outside the
    /// registry lock, so a callback may subscribe or unsubscribe freely.
    pub(crate) fn notify(&self, topics: &[Topic]) {
        let pending: Vec<(Arc<AtomicBool>, Arc<dyn Fn() + Send + Sync>)> = {
            let registry = match self.inner.lock() {
                Ok(registry) => registry,
                Err(poisoned) => poisoned.into_inner(),
            };
            registry
                .entries
                .iter()
                .filter(|entry| topics.contains(&entry.topic))
                .map(|entry| (Arc::clone(&entry.active), Arc::clone(&entry.callback)))
                .collect()
        };

        for (active, callback) in pending {
            if active.load(Ordering::SeqCst) {
                callback();
            }
        }
    }
}
