use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// One write inside a batch. `Update` fails when the document does not exist.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or replace a document; with `merge` the fields are merged into the existing one.
    Set {
        collection: String,
        id: String,
        record: Value,
        merge: bool,
    },
    /// Merge fields into an existing document. Keys may be dotted paths (`balances.2025-09-30`).
    Update {
        collection: String,
        id: String,
        fields: Value,
    },
}

impl WriteOp {
    pub fn set(collection: &str, id: &str, record: Value, merge: bool) -> Self {
        WriteOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            record,
            merge,
        }
    }

    pub fn update(collection: &str, id: &str, fields: Value) -> Self {
        WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        }
    }
}

/// Document store holding JSON documents keyed by id inside named collections.
/// Listing order is ascending document id.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn insert(&self, collection: &str, record: Value) -> Result<String, String>;
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Arc<Value>>, String>;
    async fn set(&self, collection: &str, id: &str, record: Value, merge: bool) -> Result<(), String>;
    async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<(), String>;
    async fn list(&self, collection: &str) -> Result<Vec<Arc<Value>>, String>;
    async fn find(&self, collection: &str, filters: HashMap<String, String>) -> Result<Vec<Arc<Value>>, String>;
    /// Applies every op or none of them.
    async fn commit_batch(&self, ops: Vec<WriteOp>) -> Result<(), String>;
}
