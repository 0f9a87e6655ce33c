use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::watch;

use crate::document::{Document, Fields};
use crate::path::DocPath;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Equality filter on one document field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Read-side contract over content collections.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Cheap existence probe for a collection (limit-1 semantics).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the probe cannot be executed.
    async fn exists(&self, collection: &DocPath) -> Result<bool, StorageError>;

    /// Number of documents in a collection.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the count query fails.
    async fn count(&self, collection: &DocPath) -> Result<u32, StorageError>;

    /// Every document in a collection, optionally ordered by a field.
    ///
    /// Documents missing the ordering field sort last; backends that cannot
    /// order fall back to their natural order rather than failing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn get_all(
        &self,
        collection: &DocPath,
        order_by: Option<&str>,
    ) -> Result<Vec<Document>, StorageError>;

    /// Point read of a single document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure; an absent document is
    /// `Ok(None)`, not an error.
    async fn get_one(&self, doc: &DocPath) -> Result<Option<Document>, StorageError>;
}

/// Write-side contract over the user-scoped progress subtree.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Point read keyed by the full path; never a filtered scan.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn get(&self, doc: &DocPath) -> Result<Option<Document>, StorageError>;

    /// Merge fields into a document, creating it if absent. Fields not named
    /// by the patch are preserved. Idempotent, safe to retry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn upsert_merge(&self, doc: &DocPath, patch: Fields) -> Result<(), StorageError>;

    /// Delete one document; deleting an absent document is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    async fn delete(&self, doc: &DocPath) -> Result<(), StorageError>;

    /// Delete every document in the collection matching all filters.
    /// Returns the number deleted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the scan or a delete fails.
    async fn delete_where(
        &self,
        collection: &DocPath,
        filters: &[FieldFilter],
    ) -> Result<u32, StorageError>;

    /// Count documents in the collection matching all filters.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn count_where(
        &self,
        collection: &DocPath,
        filters: &[FieldFilter],
    ) -> Result<u32, StorageError>;

    /// Add a value to a set-valued array field. Adding a value already
    /// present is a no-op, so concurrent calls from multiple devices are
    /// safe.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn array_union(&self, doc: &DocPath, field: &str, value: &str)
    -> Result<(), StorageError>;

    /// Remove a value from a set-valued array field; absent values are a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn array_remove(
        &self,
        doc: &DocPath,
        field: &str,
        value: &str,
    ) -> Result<(), StorageError>;

    /// Transactionally persist one submission: merge `patch` into the record
    /// and update the stats aggregate in the same transaction. `total` is
    /// always incremented; `correct` only when `correct_now` is true and the
    /// record was not already correct *before* this write. Reading the
    /// previous value inside the transaction keeps duplicate or retried
    /// writes and second devices from double-counting.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the transaction fails.
    async fn record_submission(
        &self,
        record: &DocPath,
        patch: Fields,
        stats: &DocPath,
        correct_now: bool,
    ) -> Result<(), StorageError>;
}

/// Live-updating reads over a collection.
pub trait WatchStore: Send + Sync {
    /// Subscribe to snapshots of a collection. The subscription detaches on
    /// `cancel()` and automatically on drop.
    fn watch(&self, collection: &DocPath) -> Subscription;
}

/// Handle for one collection listener.
///
/// Dropping the handle cancels the listener, so teardown can never leak a
/// backend subscription.
#[derive(Debug)]
pub struct Subscription {
    rx: watch::Receiver<Vec<Document>>,
    canceled: Arc<AtomicBool>,
}

impl Subscription {
    #[must_use]
    pub(crate) fn new(rx: watch::Receiver<Vec<Document>>, canceled: Arc<AtomicBool>) -> Self {
        Self { rx, canceled }
    }

    /// Latest snapshot of the watched collection.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Document> {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` once the store side is gone.
    pub async fn changed(&mut self) -> Result<(), StorageError> {
        self.rx
            .changed()
            .await
            .map_err(|_| StorageError::Connection("watch channel closed".to_string()))
    }

    /// Detach the listener.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Aggregates the store contracts behind trait objects for easy backend
/// swapping. The watch handle is present only for backends with a change
/// feed.
#[derive(Clone)]
pub struct Storage {
    pub content: Arc<dyn ContentStore>,
    pub progress: Arc<dyn ProgressStore>,
    pub watch: Option<Arc<dyn WatchStore>>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let store = crate::memory::InMemoryStore::new();
        let content: Arc<dyn ContentStore> = Arc::new(store.clone());
        let progress: Arc<dyn ProgressStore> = Arc::new(store.clone());
        let watch: Arc<dyn WatchStore> = Arc::new(store);
        Self {
            content,
            progress,
            watch: Some(watch),
        }
    }
}
