use super::{CompiledFilter, apply_set, apply_update, validate_identifier};
use crate::datastore::{DataStore, WriteOp};
use async_trait::async_trait;
use neraca_ir::collections;
use serde_json::Value;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Stores each collection as a `(id, doc)` table with the document serialized as JSON text.
pub struct SqliteDataStore {
    pool: SqlitePool,
}

impl SqliteDataStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the tables of the known collections.
    pub async fn migrate(&self) -> Result<(), String> {
        for collection in collections::ALL {
            self.ensure_table(collection).await?;
        }
        Ok(())
    }

    async fn ensure_table(&self, collection: &str) -> Result<(), String> {
        validate_identifier(collection)?;
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (id TEXT PRIMARY KEY, doc TEXT NOT NULL)",
            collection
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn decode(raw: &str) -> Result<Value, String> {
        serde_json::from_str(raw).map_err(|e| format!("Corrupt document: {}", e))
    }

    async fn fetch_doc(
        tx: &mut Transaction<'_, Sqlite>,
        collection: &str,
        id: &str,
    ) -> Result<Option<Value>, String> {
        let sql = format!("SELECT doc FROM \"{}\" WHERE id = ?", collection);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| e.to_string())?;
        match row {
            Some(row) => {
                let raw: String = row.try_get("doc").map_err(|e| e.to_string())?;
                Ok(Some(Self::decode(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn write_doc(
        tx: &mut Transaction<'_, Sqlite>,
        collection: &str,
        id: &str,
        doc: &Value,
    ) -> Result<(), String> {
        let sql = format!(
            "INSERT INTO \"{}\" (id, doc) VALUES (?, ?) ON CONFLICT(id) DO UPDATE SET doc = excluded.doc",
            collection
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(doc.to_string())
            .execute(&mut **tx)
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    async fn apply(tx: &mut Transaction<'_, Sqlite>, op: WriteOp) -> Result<(), String> {
        match op {
            WriteOp::Set {
                collection,
                id,
                record,
                merge,
            } => {
                let existing = if merge {
                    Self::fetch_doc(tx, &collection, &id).await?
                } else {
                    None
                };
                let doc = apply_set(existing.as_ref(), &id, record, merge);
                Self::write_doc(tx, &collection, &id, &doc).await
            }
            WriteOp::Update { collection, id, fields } => {
                let existing = Self::fetch_doc(tx, &collection, &id)
                    .await?
                    .ok_or_else(|| format!("Record not found: {}", id))?;
                let doc = apply_update(&existing, &id, fields)?;
                Self::write_doc(tx, &collection, &id, &doc).await
            }
        }
    }

    async fn run_batch(&self, ops: Vec<WriteOp>) -> Result<(), String> {
        for op in &ops {
            let collection = match op {
                WriteOp::Set { collection, .. } | WriteOp::Update { collection, .. } => collection,
            };
            self.ensure_table(collection).await?;
        }

        let mut tx = self.pool.begin().await.map_err(|e| e.to_string())?;
        for op in ops {
            // Dropping `tx` on error rolls the batch back.
            Self::apply(&mut tx, op).await?;
        }
        tx.commit().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl DataStore for SqliteDataStore {
    async fn insert(&self, collection: &str, mut record: Value) -> Result<String, String> {
        let id = record
            .get("id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if let Some(obj) = record.as_object_mut() {
            obj.insert("id".to_string(), Value::String(id.clone()));
        }
        self.run_batch(vec![WriteOp::set(collection, &id, record, false)]).await?;
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Arc<Value>>, String> {
        self.ensure_table(collection).await?;
        let sql = format!("SELECT doc FROM \"{}\" WHERE id = ?", collection);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| e.to_string())?;

        if let Some(row) = row {
            let raw: String = row.try_get("doc").map_err(|e| e.to_string())?;
            Ok(Some(Arc::new(Self::decode(&raw)?)))
        } else {
            Ok(None)
        }
    }

    async fn set(&self, collection: &str, id: &str, record: Value, merge: bool) -> Result<(), String> {
        self.run_batch(vec![WriteOp::set(collection, id, record, merge)]).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<(), String> {
        self.run_batch(vec![WriteOp::update(collection, id, fields)]).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<Arc<Value>>, String> {
        self.ensure_table(collection).await?;
        let sql = format!("SELECT doc FROM \"{}\" ORDER BY id", collection);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.to_string())?;

        rows.iter()
            .map(|row| {
                let raw: String = row.try_get("doc").map_err(|e| e.to_string())?;
                Ok(Arc::new(Self::decode(&raw)?))
            })
            .collect()
    }

    async fn find(&self, collection: &str, filters: HashMap<String, String>) -> Result<Vec<Arc<Value>>, String> {
        let parsed_filters = CompiledFilter::compile(filters);
        let docs = self.list(collection).await?;
        Ok(docs
            .into_iter()
            .filter(|doc| CompiledFilter::matches_all(doc, &parsed_filters))
            .collect())
    }

    async fn commit_batch(&self, ops: Vec<WriteOp>) -> Result<(), String> {
        self.run_batch(ops).await
    }
}
