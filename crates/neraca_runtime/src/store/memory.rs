use super::{CompiledFilter, apply_set, apply_update};
use crate::datastore::{DataStore, WriteOp};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

type Collection = BTreeMap<String, Arc<Value>>;
type DataStoreData = HashMap<String, Collection>;

pub struct MemoryDataStore {
    data: Arc<Mutex<DataStoreData>>,
}

impl Default for MemoryDataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, DataStoreData>, String> {
        self.data.lock().map_err(|_| "DataStore lock poisoned".to_string())
    }

    fn apply(data: &mut DataStoreData, op: WriteOp) -> Result<(), String> {
        match op {
            WriteOp::Set {
                collection,
                id,
                record,
                merge,
            } => {
                let table = data.entry(collection).or_default();
                let doc = apply_set(table.get(&id).map(|d| d.as_ref()), &id, record, merge);
                table.insert(id, Arc::new(doc));
            }
            WriteOp::Update { collection, id, fields } => {
                let table = data.entry(collection).or_default();
                let existing = table.get(&id).ok_or_else(|| format!("Record not found: {}", id))?;
                let doc = apply_update(existing, &id, fields)?;
                table.insert(id, Arc::new(doc));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn insert(&self, collection: &str, mut record: Value) -> Result<String, String> {
        let mut data = self.lock()?;
        let table = data.entry(collection.to_string()).or_default();

        let id = if let Some(existing_id) = record.get("id").and_then(|v| v.as_str()) {
            existing_id.to_string()
        } else {
            Uuid::new_v4().to_string()
        };

        if let Some(obj) = record.as_object_mut() {
            obj.insert("id".to_string(), Value::String(id.clone()));
        }

        table.insert(id.clone(), Arc::new(record));
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Arc<Value>>, String> {
        let data = self.lock()?;
        Ok(data.get(collection).and_then(|table| table.get(id).cloned()))
    }

    async fn set(&self, collection: &str, id: &str, record: Value, merge: bool) -> Result<(), String> {
        let mut data = self.lock()?;
        Self::apply(&mut data, WriteOp::set(collection, id, record, merge))
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<(), String> {
        let mut data = self.lock()?;
        Self::apply(&mut data, WriteOp::update(collection, id, fields))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Arc<Value>>, String> {
        let data = self.lock()?;
        Ok(data
            .get(collection)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn find(&self, collection: &str, filters: HashMap<String, String>) -> Result<Vec<Arc<Value>>, String> {
        let data = self.lock()?;
        if let Some(table) = data.get(collection) {
            let parsed_filters = CompiledFilter::compile(filters);

            let results: Vec<Arc<Value>> = table
                .values()
                .filter(|record| CompiledFilter::matches_all(record, &parsed_filters))
                .cloned()
                .collect();
            Ok(results)
        } else {
            Ok(vec![])
        }
    }

    async fn commit_batch(&self, ops: Vec<WriteOp>) -> Result<(), String> {
        let mut data = self.lock()?;
        // Stage on a copy of the touched collections so a failing op leaves nothing behind.
        let mut staged: DataStoreData = HashMap::new();
        for op in &ops {
            let name = match op {
                WriteOp::Set { collection, .. } | WriteOp::Update { collection, .. } => collection,
            };
            if !staged.contains_key(name) {
                staged.insert(name.clone(), data.get(name).cloned().unwrap_or_default());
            }
        }
        for op in ops {
            Self::apply(&mut staged, op)?;
        }
        data.extend(staged);
        Ok(())
    }
}
