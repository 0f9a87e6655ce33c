use async_trait::async_trait;
use serde_json::Value;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteStore;
use crate::document::{Document, Fields, merge_fields, sort_documents};
use crate::path::DocPath;
use crate::repository::{ContentStore, FieldFilter, ProgressStore, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn parent_of(doc: &DocPath) -> Result<(&str, &str), StorageError> {
    doc.split_last()
        .ok_or_else(|| StorageError::Serialization(format!("document path has no parent: {doc}")))
}

fn decode_fields(raw: &str) -> Result<Fields, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

fn encode_fields(fields: &Fields) -> Result<String, StorageError> {
    serde_json::to_string(fields).map_err(ser)
}

fn document_from_row(row: &SqliteRow) -> Result<Document, StorageError> {
    let id = row.try_get::<String, _>("id").map_err(ser)?;
    let raw = row.try_get::<String, _>("fields").map_err(ser)?;
    Ok(Document::new(id, decode_fields(&raw)?))
}

impl SqliteStore {
    /// Read one document's field map inside an open transaction.
    async fn fields_in_tx(
        tx: &mut sqlx::SqliteConnection,
        path: &DocPath,
    ) -> Result<Option<Fields>, StorageError> {
        let row = sqlx::query("SELECT fields FROM documents WHERE path = ?1")
            .bind(path.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?;
        match row {
            Some(row) => {
                let raw = row.try_get::<String, _>("fields").map_err(ser)?;
                decode_fields(&raw).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Write one document's field map inside an open transaction.
    async fn put_in_tx(
        tx: &mut sqlx::SqliteConnection,
        path: &DocPath,
        fields: &Fields,
    ) -> Result<(), StorageError> {
        let (parent, id) = parent_of(path)?;
        sqlx::query(
            r"
            INSERT INTO documents (path, parent, id, fields)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(path) DO UPDATE SET fields = excluded.fields
            ",
        )
        .bind(path.as_str())
        .bind(parent)
        .bind(id)
        .bind(encode_fields(fields)?)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        Ok(())
    }

    /// Read-modify-write one document under a transaction.
    async fn mutate_doc<F>(&self, doc: &DocPath, apply: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut Fields) -> Result<(), StorageError> + Send,
    {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let mut fields = Self::fields_in_tx(&mut *tx, doc).await?.unwrap_or_default();
        apply(&mut fields)?;
        Self::put_in_tx(&mut *tx, doc, &fields).await?;
        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn exists(&self, collection: &DocPath) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM documents WHERE parent = ?1 LIMIT 1")
            .bind(collection.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        Ok(row.is_some())
    }

    async fn count(&self, collection: &DocPath) -> Result<u32, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM documents WHERE parent = ?1")
            .bind(collection.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        let n = row.try_get::<i64, _>("n").map_err(ser)?;
        u32::try_from(n).map_err(|_| StorageError::Serialization("count overflow".into()))
    }

    async fn get_all(
        &self,
        collection: &DocPath,
        order_by: Option<&str>,
    ) -> Result<Vec<Document>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, fields FROM documents
            WHERE parent = ?1
            ORDER BY id ASC
            ",
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in &rows {
            docs.push(document_from_row(row)?);
        }
        // ordering fields live inside the JSON blob, so sorting stays in Rust
        sort_documents(&mut docs, order_by);
        Ok(docs)
    }

    async fn get_one(&self, doc: &DocPath) -> Result<Option<Document>, StorageError> {
        ProgressStore::get(self, doc).await
    }
}

#[async_trait]
impl ProgressStore for SqliteStore {
    async fn get(&self, doc: &DocPath) -> Result<Option<Document>, StorageError> {
        let row = sqlx::query("SELECT id, fields FROM documents WHERE path = ?1")
            .bind(doc.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        match row {
            Some(row) => document_from_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn upsert_merge(&self, doc: &DocPath, patch: Fields) -> Result<(), StorageError> {
        self.mutate_doc(doc, |fields| {
            merge_fields(fields, &patch);
            Ok(())
        })
        .await
    }

    async fn delete(&self, doc: &DocPath) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM documents WHERE path = ?1")
            .bind(doc.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }

    async fn delete_where(
        &self,
        collection: &DocPath,
        filters: &[FieldFilter],
    ) -> Result<u32, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let rows = sqlx::query("SELECT id, fields FROM documents WHERE parent = ?1")
            .bind(collection.as_str())
            .fetch_all(&mut *tx)
            .await
            .map_err(conn)?;

        let mut deleted = 0_u32;
        for row in &rows {
            let doc = document_from_row(row)?;
            if doc.matches(filters) {
                sqlx::query("DELETE FROM documents WHERE path = ?1")
                    .bind(format!("{}/{}", collection.as_str(), doc.id()))
                    .execute(&mut *tx)
                    .await
                    .map_err(conn)?;
                deleted += 1;
            }
        }
        tx.commit().await.map_err(conn)?;
        Ok(deleted)
    }

    async fn count_where(
        &self,
        collection: &DocPath,
        filters: &[FieldFilter],
    ) -> Result<u32, StorageError> {
        let docs = ContentStore::get_all(self, collection, None).await?;
        let n = docs.iter().filter(|doc| doc.matches(filters)).count();
        u32::try_from(n).map_err(|_| StorageError::Serialization("count overflow".into()))
    }

    async fn array_union(
        &self,
        doc: &DocPath,
        field: &str,
        value: &str,
    ) -> Result<(), StorageError> {
        self.mutate_doc(doc, |fields| {
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
            Ok(())
        })
        .await
    }

    async fn array_remove(
        &self,
        doc: &DocPath,
        field: &str,
        value: &str,
    ) -> Result<(), StorageError> {
        self.mutate_doc(doc, |fields| {
            if let Some(Value::Array(items)) = fields.get_mut(field) {
                items.retain(|item| item.as_str() != Some(value));
            }
            Ok(())
        })
        .await
    }

    async fn record_submission(
        &self,
        record: &DocPath,
        patch: Fields,
        stats: &DocPath,
        correct_now: bool,
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let mut record_fields = Self::fields_in_tx(&mut *tx, record).await?.unwrap_or_default();
        let already_correct = record_fields
            .get("correct")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        merge_fields(&mut record_fields, &patch);
        Self::put_in_tx(&mut *tx, record, &record_fields).await?;

        let mut stats_fields = Self::fields_in_tx(&mut *tx, stats).await?.unwrap_or_default();
        let total = stats_fields
            .get("total")
            .and_then(Value::as_u64)
            .unwrap_or(0)
            + 1;
        let mut correct = stats_fields
            .get("correct")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if correct_now && !already_correct {
            correct += 1;
        }
        stats_fields.insert("total".to_string(), Value::from(total));
        stats_fields.insert("correct".to_string(), Value::from(correct));
        Self::put_in_tx(&mut *tx, stats, &stats_fields).await?;

        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
