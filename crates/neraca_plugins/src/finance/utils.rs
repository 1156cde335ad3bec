use chrono::{DateTime, Utc};
use neraca_common::time::parse_timestamp;
use neraca_ir::{Account, Journal, JournalAccount, collections};
use neraca_runtime::datastore::DataStore;
use neraca_runtime::errors::RuntimeError;
use neraca_runtime::queries::decode_all;
use serde_json::Value;
use std::collections::HashMap;

/// Journals dated within `[start, end]`, in store order.
/// Documents outside the range are not decoded; a malformed one inside it is an error.
pub async fn fetch_journals_in_range(
    datastore: &dyn DataStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Journal>, RuntimeError> {
    let docs = datastore
        .list(collections::JOURNALS)
        .await
        .map_err(RuntimeError::DataStoreError)?;

    let candidates = docs
        .into_iter()
        .filter(|doc| match doc.get("date").and_then(Value::as_str).and_then(parse_timestamp) {
            Some(date) => date >= start && date <= end,
            None => true,
        })
        .collect();
    decode_all::<Journal>(collections::JOURNALS, candidates)
}

/// Every account document, failing on the first one that cannot be read.
pub async fn fetch_accounts(datastore: &dyn DataStore) -> Result<Vec<Account>, RuntimeError> {
    let docs = datastore
        .list(collections::ACCOUNTS)
        .await
        .map_err(RuntimeError::DataStoreError)?;
    decode_all(collections::ACCOUNTS, docs)
}

/// Detail account id to the report account it rolls up into.
/// Detail accounts without a `report_account_id` are left out.
pub async fn fetch_report_account_map(datastore: &dyn DataStore) -> Result<HashMap<String, String>, RuntimeError> {
    let docs = datastore
        .list(collections::JOURNAL_ACCOUNTS)
        .await
        .map_err(RuntimeError::DataStoreError)?;

    Ok(decode_all::<JournalAccount>(collections::JOURNAL_ACCOUNTS, docs)?
        .into_iter()
        .filter_map(|acc| match acc.report_account_id {
            Some(target) if !target.is_empty() => Some((acc.id, target)),
            _ => None,
        })
        .collect())
}
