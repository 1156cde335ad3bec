use super::validation::validate_journal;
use chrono::{DateTime, Utc};
use neraca_ir::{Journal, JournalStatus, collections};
use neraca_runtime::auth::SharedSecret;
use neraca_runtime::datastore::DataStore;
use neraca_runtime::errors::RuntimeError;
use serde_json::Value;
use uuid::Uuid;

/// Checks the shared secret, validates `payload` and stores it as a draft journal.
/// Returns the new journal id. Account balances are left untouched.
pub async fn create_journal(
    datastore: &dyn DataStore,
    secret: &SharedSecret,
    payload: &Value,
    now: DateTime<Utc>,
) -> Result<String, RuntimeError> {
    secret.verify(payload.get("pass").and_then(|v| v.as_str()))?;

    let valid = validate_journal(payload)?;
    let journal = Journal {
        id: Uuid::new_v4().to_string(),
        date: valid.date,
        description: valid.description,
        period: valid.period,
        entries: valid.entries,
        status: JournalStatus::Draft,
        total_debit: valid.total_debit,
        total_credit: valid.total_credit,
        created_at: Some(now),
        posted_at: None,
    };

    let record = serde_json::to_value(&journal)
        .map_err(|e| RuntimeError::InternalError(format!("Failed to encode journal: {}", e)))?;
    let id = datastore
        .insert(collections::JOURNALS, record)
        .await
        .map_err(RuntimeError::DataStoreError)?;

    tracing::info!(journal_id = %id, total = %journal.total_debit, "journal created");
    Ok(id)
}
