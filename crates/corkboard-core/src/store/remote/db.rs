//! Client seam for the remote document database.
//!
//! Documents are JSON values addressed by slash-separated paths
//! (`users/u1/boards/<id>`); a collection is the path prefix above the final
//! segment. The engine delivers push updates natively, so watches here map
//! straight onto its listeners and no fan-out bus is needed on top.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::store::traits::{Observer, Subscription};

/// One write inside an atomic batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Create or replace the document at `path`.
    Set { path: String, doc: Value },
    /// Delete the document at `path` (no-op if absent).
    Delete { path: String },
}

impl WriteOp {
    pub fn set(path: impl Into<String>, doc: Value) -> Self {
        Self::Set {
            path: path.into(),
            doc,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::Delete { path: path.into() }
    }

    pub(crate) fn path(&self) -> &str {
        match self {
            Self::Set { path, .. } | Self::Delete { path } => path,
        }
    }
}

/// Equality filter on a top-level document field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn field_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub(crate) fn matches(&self, doc: &Value) -> bool {
        doc.get(&self.field) == Some(&self.value)
    }
}

/// Transport-level client for the remote document database.
///
/// Implementations must deliver the current snapshot to a watch observer
/// immediately on registration and again after every committed change that
/// affects it, in commit order. Batches commit atomically: either every
/// write in the batch is visible or none is.
///
/// Failures surface as [`StoreError::BackendUnavailable`]
/// (crate::error::StoreError); no retries happen at this level.
#[async_trait]
pub trait DocumentDb: Send + Sync {
    /// Fetch a single document.
    async fn get_doc(&self, path: &str) -> Result<Option<Value>>;

    /// Create or replace a single document.
    async fn set_doc(&self, path: &str, doc: Value) -> Result<()>;

    /// Delete a single document.
    async fn delete_doc(&self, path: &str) -> Result<()>;

    /// Apply a batch of writes atomically.
    async fn commit(&self, writes: Vec<WriteOp>) -> Result<()>;

    /// List the documents of a collection, optionally filtered.
    async fn list_docs(&self, collection: &str, filter: Option<&FieldFilter>)
        -> Result<Vec<Value>>;

    /// Watch a single document. Delivers the current value immediately.
    async fn watch_doc(
        &self,
        path: &str,
        observer: Observer<Option<Value>>,
    ) -> Result<Subscription>;

    /// Watch a collection query. Delivers the current snapshot immediately.
    async fn watch_collection(
        &self,
        collection: &str,
        filter: Option<FieldFilter>,
        observer: Observer<Vec<Value>>,
    ) -> Result<Subscription>;
}

/// The collection prefix of a document path.
pub(crate) fn parent_collection(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_filter_matches() {
        let filter = FieldFilter::field_eq("boardId", "b-1");
        assert!(filter.matches(&serde_json::json!({"boardId": "b-1", "title": "x"})));
        assert!(!filter.matches(&serde_json::json!({"boardId": "b-2"})));
        assert!(!filter.matches(&serde_json::json!({"title": "no board"})));
    }

    #[test]
    fn test_parent_collection() {
        assert_eq!(parent_collection("users/u1/boards/abc"), "users/u1/boards");
        assert_eq!(parent_collection("solo"), "");
    }
}
