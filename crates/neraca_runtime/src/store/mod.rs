use crate::datastore::{DataStore, WriteOp};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryDataStore;
pub use sqlite::SqliteDataStore;

pub fn validate_identifier(name: &str) -> Result<(), String> {
    if name.is_empty() || name.len() > 64 {
        return Err(format!("Invalid identifier length: '{}'", name));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("Invalid identifier: '{}'", name));
    }
    Ok(())
}

/// Merges `fields` into `target`. A dotted key writes into nested objects,
/// creating intermediate objects as needed.
pub fn merge_fields(target: &mut Value, fields: Map<String, Value>) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    for (path, value) in fields {
        let mut cursor = &mut *target;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            let Some(obj) = cursor.as_object_mut() else {
                break;
            };
            if segments.peek().is_none() {
                obj.insert(segment.to_string(), value);
                break;
            }
            let child = obj
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            cursor = child;
        }
    }
}

/// Applies a `Set` op to an optional existing document.
pub(crate) fn apply_set(existing: Option<&Value>, id: &str, record: Value, merge: bool) -> Value {
    let mut doc = match (existing, merge) {
        (Some(current), true) => {
            let mut doc = current.clone();
            if let Value::Object(source) = record {
                for (k, v) in source {
                    if let Some(obj) = doc.as_object_mut() {
                        obj.insert(k, v);
                    }
                }
            }
            doc
        }
        _ => record,
    };
    if let Some(obj) = doc.as_object_mut() {
        obj.insert("id".to_string(), Value::String(id.to_string()));
    }
    doc
}

/// Applies an `Update` op to an existing document.
pub(crate) fn apply_update(existing: &Value, id: &str, fields: Value) -> Result<Value, String> {
    let Value::Object(fields) = fields else {
        return Err("Update fields must be an object".to_string());
    };
    let mut doc = existing.clone();
    merge_fields(&mut doc, fields);
    if let Some(obj) = doc.as_object_mut() {
        obj.insert("id".to_string(), Value::String(id.to_string()));
    }
    Ok(doc)
}

pub(crate) struct CompiledFilter {
    key: String,
    val: String,
    val_i64: Option<i64>,
    val_f64: Option<f64>,
    val_bool: Option<bool>,
}

impl CompiledFilter {
    fn new(key: String, val: String) -> Self {
        Self {
            val_i64: val.parse::<i64>().ok(),
            val_f64: val.parse::<f64>().ok(),
            val_bool: val.parse::<bool>().ok(),
            key,
            val,
        }
    }

    fn matches(&self, record: &Value) -> bool {
        match record.get(&self.key) {
            Some(Value::String(s)) => s == &self.val,
            Some(Value::Number(n)) => {
                if let (Some(i), Some(vi)) = (n.as_i64(), self.val_i64) {
                    i == vi
                } else if let (Some(f), Some(vf)) = (n.as_f64(), self.val_f64) {
                    (f - vf).abs() < f64::EPSILON
                } else {
                    n.to_string() == self.val
                }
            }
            Some(Value::Bool(b)) => self.val_bool == Some(*b),
            _ => false,
        }
    }

    pub(crate) fn compile(filters: HashMap<String, String>) -> Vec<CompiledFilter> {
        filters.into_iter().map(|(k, v)| CompiledFilter::new(k, v)).collect()
    }

    pub(crate) fn matches_all(record: &Value, filters: &[CompiledFilter]) -> bool {
        filters.iter().all(|f| f.matches(record))
    }
}

/// Commits `ops` in consecutive batches of at most `chunk_size`.
/// Each batch is atomic; batches committed before a failure stay applied.
pub async fn commit_chunked(
    datastore: &dyn DataStore,
    ops: Vec<WriteOp>,
    chunk_size: usize,
) -> Result<usize, String> {
    let chunk_size = chunk_size.max(1);
    let mut committed = 0;
    let mut ops = ops.into_iter().peekable();
    while ops.peek().is_some() {
        let chunk: Vec<WriteOp> = ops.by_ref().take(chunk_size).collect();
        let len = chunk.len();
        datastore.commit_batch(chunk).await?;
        committed += 1;
        tracing::debug!(batch = committed, operations = len, "batch committed");
    }
    Ok(committed)
}

/// Picks a store from a database URL: none or `memory` gives the in-memory store,
/// `sqlite:` URLs open (and create) a SQLite document database.
pub async fn init_datastore(database_url: Option<&str>) -> Result<Arc<dyn DataStore>, String> {
    match database_url.map(str::trim) {
        None | Some("") | Some("memory") => Ok(Arc::new(MemoryDataStore::new())),
        Some(url) if url.starts_with("sqlite:") => {
            let options = SqliteConnectOptions::from_str(url)
                .map_err(|e| e.to_string())?
                .create_if_missing(true);
            let max_connections = if url.contains(":memory:") { 1 } else { 5 };
            let pool = SqlitePoolOptions::new()
                .max_connections(max_connections)
                .connect_with(options)
                .await
                .map_err(|e| e.to_string())?;
            let store = SqliteDataStore::new(pool);
            store.migrate().await?;
            Ok(Arc::new(store))
        }
        Some(other) => Err(format!("Unsupported database URL: {}", other)),
    }
}
