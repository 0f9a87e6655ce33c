use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::document::{Document, Fields, merge_fields, sort_documents};
use crate::path::DocPath;
use crate::repository::{
    ContentStore, FieldFilter, ProgressStore, StorageError, Subscription, WatchStore,
};

/// In-memory document tree for tests and prototyping.
///
/// One mutex guards the whole tree, which doubles as the transaction
/// boundary for `record_submission`.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    docs: BTreeMap<String, Fields>,
    watchers: Vec<Watcher>,
}

struct Watcher {
    collection: String,
    tx: watch::Sender<Vec<Document>>,
    canceled: Arc<AtomicBool>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

/// Direct children of a collection, in id order.
fn collection_docs(docs: &BTreeMap<String, Fields>, collection: &str) -> Vec<Document> {
    let prefix = format!("{collection}/");
    docs.range(prefix.clone()..)
        .take_while(|(path, _)| path.starts_with(&prefix))
        .filter_map(|(path, fields)| {
            let id = &path[prefix.len()..];
            if id.contains('/') {
                None
            } else {
                Some(Document::new(id, fields.clone()))
            }
        })
        .collect()
}

/// Push a fresh snapshot of `collection` to its live watchers.
fn notify(inner: &mut Inner, collection: &str) {
    inner.watchers.retain(|w| !w.canceled.load(Ordering::SeqCst));
    let snapshot = collection_docs(&inner.docs, collection);
    for watcher in &inner.watchers {
        if watcher.collection == collection {
            // send only fails when every receiver is gone; pruned next pass
            let _ = watcher.tx.send(snapshot.clone());
        }
    }
}

fn parent_of(doc: &DocPath) -> Result<(String, String), StorageError> {
    doc.split_last()
        .map(|(parent, id)| (parent.to_string(), id.to_string()))
        .ok_or_else(|| StorageError::Serialization(format!("document path has no parent: {doc}")))
}

fn count_u32(n: usize) -> Result<u32, StorageError> {
    u32::try_from(n).map_err(|_| StorageError::Serialization("count overflow".to_string()))
}

#[async_trait]
impl ContentStore for InMemoryStore {
    async fn exists(&self, collection: &DocPath) -> Result<bool, StorageError> {
        let inner = self.lock()?;
        let prefix = format!("{}/", collection.as_str());
        Ok(inner
            .docs
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .any(|(path, _)| !path[prefix.len()..].contains('/')))
    }

    async fn count(&self, collection: &DocPath) -> Result<u32, StorageError> {
        let inner = self.lock()?;
        count_u32(collection_docs(&inner.docs, collection.as_str()).len())
    }

    async fn get_all(
        &self,
        collection: &DocPath,
        order_by: Option<&str>,
    ) -> Result<Vec<Document>, StorageError> {
        let inner = self.lock()?;
        let mut docs = collection_docs(&inner.docs, collection.as_str());
        sort_documents(&mut docs, order_by);
        Ok(docs)
    }

    async fn get_one(&self, doc: &DocPath) -> Result<Option<Document>, StorageError> {
        ProgressStore::get(self, doc).await
    }
}

#[async_trait]
impl ProgressStore for InMemoryStore {
    async fn get(&self, doc: &DocPath) -> Result<Option<Document>, StorageError> {
        let inner = self.lock()?;
        let (_, id) = parent_of(doc)?;
        Ok(inner
            .docs
            .get(doc.as_str())
            .map(|fields| Document::new(id, fields.clone())))
    }

    async fn upsert_merge(&self, doc: &DocPath, patch: Fields) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let (parent, _) = parent_of(doc)?;
        let existing = inner.docs.entry(doc.as_str().to_string()).or_default();
        merge_fields(existing, &patch);
        notify(&mut inner, &parent);
        Ok(())
    }

    async fn delete(&self, doc: &DocPath) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let (parent, _) = parent_of(doc)?;
        inner.docs.remove(doc.as_str());
        notify(&mut inner, &parent);
        Ok(())
    }

    async fn delete_where(
        &self,
        collection: &DocPath,
        filters: &[FieldFilter],
    ) -> Result<u32, StorageError> {
        let mut inner = self.lock()?;
        let doomed: Vec<String> = collection_docs(&inner.docs, collection.as_str())
            .into_iter()
            .filter(|doc| doc.matches(filters))
            .map(|doc| format!("{}/{}", collection.as_str(), doc.id()))
            .collect();
        for path in &doomed {
            inner.docs.remove(path);
        }
        notify(&mut inner, collection.as_str());
        count_u32(doomed.len())
    }

    async fn count_where(
        &self,
        collection: &DocPath,
        filters: &[FieldFilter],
    ) -> Result<u32, StorageError> {
        let inner = self.lock()?;
        count_u32(
            collection_docs(&inner.docs, collection.as_str())
                .into_iter()
                .filter(|doc| doc.matches(filters))
                .count(),
        )
    }

    async fn array_union(
        &self,
        doc: &DocPath,
        field: &str,
        value: &str,
    ) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let (parent, _) = parent_of(doc)?;
        let fields = inner.docs.entry(doc.as_str().to_string()).or_default();
        let list = fields
            .entry(field.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        let Value::Array(items) = list else {
            return Err(StorageError::Serialization(format!(
                "field {field} is not an array"
            )));
        };
        if !items.iter().any(|item| item.as_str() == Some(value)) {
            items.push(Value::String(value.to_string()));
        }
        notify(&mut inner, &parent);
        Ok(())
    }

    async fn array_remove(
        &self,
        doc: &DocPath,
        field: &str,
        value: &str,
    ) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let (parent, _) = parent_of(doc)?;
        if let Some(fields) = inner.docs.get_mut(doc.as_str())
            && let Some(Value::Array(items)) = fields.get_mut(field)
        {
            items.retain(|item| item.as_str() != Some(value));
        }
        notify(&mut inner, &parent);
        Ok(())
    }

    async fn record_submission(
        &self,
        record: &DocPath,
        patch: Fields,
        stats: &DocPath,
        correct_now: bool,
    ) -> Result<(), StorageError> {
        // single lock span = the transaction
        let mut inner = self.lock()?;
        let (record_parent, _) = parent_of(record)?;
        let (stats_parent, _) = parent_of(stats)?;

        let already_correct = inner
            .docs
            .get(record.as_str())
            .and_then(|fields| fields.get("correct"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let existing = inner.docs.entry(record.as_str().to_string()).or_default();
        merge_fields(existing, &patch);

        let fields = inner.docs.entry(stats.as_str().to_string()).or_default();
        let total = fields.get("total").and_then(Value::as_u64).unwrap_or(0) + 1;
        let mut correct = fields.get("correct").and_then(Value::as_u64).unwrap_or(0);
        if correct_now && !already_correct {
            correct += 1;
        }
        fields.insert("total".to_string(), Value::from(total));
        fields.insert("correct".to_string(), Value::from(correct));

        notify(&mut inner, &record_parent);
        notify(&mut inner, &stats_parent);
        Ok(())
    }
}

impl WatchStore for InMemoryStore {
    fn watch(&self, collection: &DocPath) -> Subscription {
        let canceled = Arc::new(AtomicBool::new(false));
        let initial = match self.lock() {
            Ok(inner) => collection_docs(&inner.docs, collection.as_str()),
            Err(_) => Vec::new(),
        };
        let (tx, rx) = watch::channel(initial);
        if let Ok(mut inner) = self.lock() {
            inner.watchers.push(Watcher {
                collection: collection.as_str().to_string(),
                tx,
                canceled: Arc::clone(&canceled),
            });
        }
        Subscription::new(rx, canceled)
    }
}
