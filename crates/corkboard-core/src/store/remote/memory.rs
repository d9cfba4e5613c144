//! In-process document database with push fan-out.
//!
//! Reference implementation of [`DocumentDb`]: documents in a `BTreeMap`
//! keyed by path, atomic batches under one lock, and watch snapshots
//! delivered synchronously in commit order. The production transport adapter
//! lives outside this layer; tests and single-process deployments use this
//! engine directly.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::store::traits::{Observer, Subscription};

use super::db::{parent_collection, DocumentDb, FieldFilter, WriteOp};

/// In-memory multi-tenant document database.
#[derive(Clone, Default)]
pub struct MemoryDocumentDb {
    state: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    docs: BTreeMap<String, Value>,
    watches: Vec<WatchEntry>,
    next_id: u64,
}

enum Watch {
    Doc {
        path: String,
        observer: Observer<Option<Value>>,
    },
    Collection {
        path: String,
        filter: Option<FieldFilter>,
        observer: Observer<Vec<Value>>,
    },
}

struct WatchEntry {
    id: u64,
    active: Arc<AtomicBool>,
    watch: Watch,
}

/// A snapshot paired with its observer, ready to deliver.
enum Delivery {
    Doc(Observer<Option<Value>>, Option<Value>),
    Collection(Observer<Vec<Value>>, Vec<Value>),
}

impl MemoryDocumentDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::BackendUnavailable("document store poisoned".to_string()))
    }

    /// Register a watch and deliver its initial snapshot.
    ///
    /// The initial snapshot is delivered while the state lock is still held,
    /// so a commit racing with registration cannot hand the observer a newer
    /// snapshot before the initial one. The observer therefore must not call
    /// back into the database during delivery.
    fn register_watch(&self, watch: Watch) -> Result<Subscription> {
        let active = Arc::new(AtomicBool::new(true));
        let id = {
            let mut state = self.lock()?;
            let id = state.next_id;
            state.next_id += 1;
            let initial = state.snapshot_for(&watch);
            state.watches.push(WatchEntry {
                id,
                active: Arc::clone(&active),
                watch,
            });
            match initial {
                Delivery::Doc(observer, doc) => observer(doc),
                Delivery::Collection(observer, docs) => observer(docs),
            }
            id
        };

        let state = Arc::clone(&self.state);
        Ok(Subscription::new(move || {
            active.store(false, Ordering::SeqCst);
            let mut state = match state.lock() {
                Ok(state) => state,
                Err(poisoned) => poisoned.into_inner(),
            };
            state.watches.retain(|entry| entry.id != id);
        }))
    }
}

impl State {
    fn collection_snapshot(&self, path: &str, filter: Option<&FieldFilter>) -> Vec<Value> {
        let prefix = format!("{}/", path);
        self.docs
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter(|(key, _)| !key[prefix.len()..].contains('/'))
            .filter(|(_, doc)| filter.map_or(true, |f| f.matches(doc)))
            .map(|(_, doc)| doc.clone())
            .collect()
    }

    fn snapshot_for(&self, watch: &Watch) -> Delivery {
        match watch {
            Watch::Doc { path, observer } => {
                Delivery::Doc(Arc::clone(observer), self.docs.get(path).cloned())
            }
            Watch::Collection {
                path,
                filter,
                observer,
            } => Delivery::Collection(
                Arc::clone(observer),
                self.collection_snapshot(path, filter.as_ref()),
            ),
        }
    }

    fn affected(&self, written_paths: &[&str]) -> Vec<(Arc<AtomicBool>, Delivery)> {
        self.watches
            .iter()
            .filter(|entry| {
                written_paths.iter().any(|path| match &entry.watch {
                    Watch::Doc { path: watched, .. } => watched == path,
                    Watch::Collection { path: collection, .. } => {
                        parent_collection(path) == collection
                    }
                })
            })
            .map(|entry| {
                (
                    Arc::clone(&entry.active),
                    self.snapshot_for(&entry.watch),
                )
            })
            .collect()
    }
}

fn deliver(pending: Vec<(Arc<AtomicBool>, Delivery)>) {
    for (active, delivery) in pending {
        if !active.load(Ordering::SeqCst) {
            continue;
        }
        match delivery {
            Delivery::Doc(observer, doc) => observer(doc),
            Delivery::Collection(observer, docs) => observer(docs),
        }
    }
}

#[async_trait]
impl DocumentDb for MemoryDocumentDb {
    async fn get_doc(&self, path: &str) -> Result<Option<Value>> {
        Ok(self.lock()?.docs.get(path).cloned())
    }

    async fn set_doc(&self, path: &str, doc: Value) -> Result<()> {
        self.commit(vec![WriteOp::set(path, doc)]).await
    }

    async fn delete_doc(&self, path: &str) -> Result<()> {
        self.commit(vec![WriteOp::delete(path)]).await
    }

    async fn commit(&self, writes: Vec<WriteOp>) -> Result<()> {
        let pending = {
            let mut state = self.lock()?;
            for write in &writes {
                match write {
                    WriteOp::Set { path, doc } => {
                        state.docs.insert(path.clone(), doc.clone());
                    }
                    WriteOp::Delete { path } => {
                        state.docs.remove(path);
                    }
                }
            }
            let paths: Vec<&str> = writes.iter().map(|write| write.path()).collect();
            state.affected(&paths)
        };

        deliver(pending);
        Ok(())
    }

    async fn list_docs(
        &self,
        collection: &str,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<Value>> {
        Ok(self.lock()?.collection_snapshot(collection, filter))
    }

    async fn watch_doc(
        &self,
        path: &str,
        observer: Observer<Option<Value>>,
    ) -> Result<Subscription> {
        self.register_watch(Watch::Doc {
            path: path.to_string(),
            observer,
        })
    }

    async fn watch_collection(
        &self,
        collection: &str,
        filter: Option<FieldFilter>,
        observer: Observer<Vec<Value>>,
    ) -> Result<Subscription> {
        self.register_watch(Watch::Collection {
            path: collection.to_string(),
            filter,
            observer,
        })
    }
}
