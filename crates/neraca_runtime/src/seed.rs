use crate::datastore::{DataStore, WriteOp};
use crate::errors::RuntimeError;
use crate::store::commit_chunked;
use neraca_ir::collections;
use serde_json::Value;

pub const SEED_BATCH_SIZE: usize = 400;

/// Collections that may be loaded from seed files.
pub const SEEDABLE: [&str; 3] = [
    collections::ACCOUNTS,
    collections::JOURNAL_ACCOUNTS,
    collections::REPORT_LAYOUTS,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub documents: usize,
    pub batches: usize,
}

/// Merges a JSON array of documents into `collection`, keyed by their `id`.
pub async fn seed_documents(
    datastore: &dyn DataStore,
    collection: &str,
    documents: Value,
) -> Result<SeedReport, RuntimeError> {
    if !SEEDABLE.contains(&collection) {
        return Err(RuntimeError::ValidationError(format!(
            "Collection '{}' cannot be seeded",
            collection
        )));
    }
    let Value::Array(documents) = documents else {
        return Err(RuntimeError::ValidationError("Seed file must contain a JSON array".to_string()));
    };

    let mut ops = Vec::with_capacity(documents.len());
    for (index, doc) in documents.into_iter().enumerate() {
        let id = match doc.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => {
                return Err(RuntimeError::ValidationError(format!(
                    "Document #{} has no id",
                    index
                )));
            }
        };
        ops.push(WriteOp::set(collection, &id, doc, true));
    }

    let documents = ops.len();
    let batches = commit_chunked(datastore, ops, SEED_BATCH_SIZE)
        .await
        .map_err(RuntimeError::DataStoreError)?;
    tracing::info!(collection, documents, batches, "seed complete");

    Ok(SeedReport { documents, batches })
}
