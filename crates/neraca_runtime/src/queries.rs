//! Read-side queries behind the listing endpoints.

use crate::datastore::DataStore;
use crate::errors::RuntimeError;
use neraca_common::time::parse_timestamp;
use neraca_ir::{Account, Journal, JournalAccount, Period, collections};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Deserializes store documents, skipping (and logging) the ones that do not fit `T`.
pub fn decode_docs<T: DeserializeOwned>(collection: &str, docs: Vec<Arc<Value>>) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| match serde_json::from_value::<T>(doc.as_ref().clone()) {
            Ok(item) => Some(item),
            Err(e) => {
                let id = doc.get("id").and_then(|v| v.as_str()).unwrap_or("?");
                tracing::warn!(collection, id, error = %e, "skipping malformed document");
                None
            }
        })
        .collect()
}

/// Deserializes every document or fails on the first one that does not fit `T`.
pub fn decode_all<T: DeserializeOwned>(collection: &str, docs: Vec<Arc<Value>>) -> Result<Vec<T>, RuntimeError> {
    docs.into_iter()
        .map(|doc| {
            serde_json::from_value::<T>(doc.as_ref().clone()).map_err(|e| {
                let id = doc.get("id").and_then(|v| v.as_str()).unwrap_or("?");
                RuntimeError::DataStoreError(format!("Malformed document {}/{}: {}", collection, id, e))
            })
        })
        .collect()
}

pub async fn load_accounts(datastore: &dyn DataStore) -> Result<Vec<Account>, RuntimeError> {
    let docs = datastore
        .list(collections::ACCOUNTS)
        .await
        .map_err(RuntimeError::DataStoreError)?;
    Ok(decode_docs(collections::ACCOUNTS, docs))
}

/// Accounts whose `category` equals `category` exactly.
pub async fn accounts_by_category(datastore: &dyn DataStore, category: &str) -> Result<Vec<Account>, RuntimeError> {
    let mut filters = HashMap::new();
    filters.insert("category".to_string(), category.to_string());

    let docs = datastore
        .find(collections::ACCOUNTS, filters)
        .await
        .map_err(RuntimeError::DataStoreError)?;
    Ok(decode_docs(collections::ACCOUNTS, docs))
}

/// Closed periods, latest end date first.
pub async fn list_periods(datastore: &dyn DataStore) -> Result<Vec<Period>, RuntimeError> {
    let docs = datastore
        .list(collections::PERIODS)
        .await
        .map_err(RuntimeError::DataStoreError)?;
    let mut periods: Vec<Period> = decode_docs(collections::PERIODS, docs);
    periods.sort_by(|a, b| b.end_date.cmp(&a.end_date));
    Ok(periods)
}

/// Detail accounts ordered by name.
pub async fn list_journal_accounts(datastore: &dyn DataStore) -> Result<Vec<JournalAccount>, RuntimeError> {
    let docs = datastore
        .list(collections::JOURNAL_ACCOUNTS)
        .await
        .map_err(RuntimeError::DataStoreError)?;
    let mut accounts: Vec<JournalAccount> = decode_docs(collections::JOURNAL_ACCOUNTS, docs);
    accounts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(accounts)
}

fn parse_bound(name: &str, value: Option<&str>) -> Result<Option<chrono::DateTime<chrono::Utc>>, RuntimeError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => parse_timestamp(raw)
            .map(Some)
            .ok_or_else(|| RuntimeError::ValidationError(format!("Invalid {}: {}", name, raw))),
        None => Ok(None),
    }
}

/// Journals newest-created first, optionally limited to `start_date <= date <= end_date`.
/// Bare dates are taken at midnight UTC.
pub async fn list_journals(
    datastore: &dyn DataStore,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Result<Vec<Journal>, RuntimeError> {
    let start = parse_bound("start_date", start_date)?;
    let end = parse_bound("end_date", end_date)?;

    let docs = datastore
        .list(collections::JOURNALS)
        .await
        .map_err(RuntimeError::DataStoreError)?;
    let mut journals: Vec<Journal> = decode_docs::<Journal>(collections::JOURNALS, docs)
        .into_iter()
        .filter(|j| start.is_none_or(|s| j.date >= s))
        .filter(|j| end.is_none_or(|e| j.date <= e))
        .collect();

    // Missing creation stamps sort last.
    journals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(journals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDataStore;
    use serde_json::json;

    async fn seeded() -> MemoryDataStore {
        let store = MemoryDataStore::new();
        for (id, date, created) in [
            ("j1", "2025-08-20T00:00:00.000Z", "2025-08-20T08:00:00.000Z"),
            ("j2", "2025-09-05T00:00:00.000Z", "2025-09-05T08:00:00.000Z"),
            ("j3", "2025-09-30T00:00:00.000Z", "2025-09-30T08:00:00.000Z"),
        ] {
            store
                .insert(
                    collections::JOURNALS,
                    json!({"id": id, "date": date, "description": id, "entries": [], "created_at": created}),
                )
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_journals_newest_first() {
        let store = seeded().await;
        let journals = list_journals(&store, None, None).await.unwrap();
        let ids: Vec<&str> = journals.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["j3", "j2", "j1"]);
    }

    #[tokio::test]
    async fn test_journals_date_range_inclusive() {
        let store = seeded().await;
        let journals = list_journals(&store, Some("2025-09-01"), Some("2025-09-30")).await.unwrap();
        let ids: Vec<&str> = journals.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["j3", "j2"]);
    }

    #[tokio::test]
    async fn test_journals_rejects_bad_date() {
        let store = seeded().await;
        let err = list_journals(&store, Some("kemarin"), None).await.unwrap_err();
        assert!(matches!(err, RuntimeError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_periods_latest_first() {
        let store = MemoryDataStore::new();
        for (end, month) in [("2025-08-31", 8), ("2025-09-30", 9), ("2025-07-31", 7)] {
            store
                .insert(
                    collections::PERIODS,
                    json!({"id": end, "code": end, "label": "x", "endDate": end, "year": 2025, "month": month}),
                )
                .await
                .unwrap();
        }
        let periods = list_periods(&store).await.unwrap();
        let ends: Vec<&str> = periods.iter().map(|p| p.end_date.as_str()).collect();
        assert_eq!(ends, vec!["2025-09-30", "2025-08-31", "2025-07-31"]);
    }

    #[tokio::test]
    async fn test_accounts_by_category_exact_match() {
        let store = MemoryDataStore::new();
        store
            .insert(collections::ACCOUNTS, json!({"id": "kas", "category": "asset"}))
            .await
            .unwrap();
        store
            .insert(collections::ACCOUNTS, json!({"id": "utang", "category": "liability"}))
            .await
            .unwrap();

        let assets = accounts_by_category(&store, "asset").await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].id, "kas");
        assert!(accounts_by_category(&store, "Asset").await.unwrap().is_empty());
    }

    #[test]
    fn test_decode_all_reports_the_bad_document() {
        let docs = vec![
            Arc::new(json!({"id": "kas", "name": null, "balances": {"2025-08-31": 5}})),
            Arc::new(json!({"id": "rusak", "balances": "banyak"})),
        ];
        let err = decode_all::<Account>(collections::ACCOUNTS, docs.clone()).unwrap_err();
        assert!(matches!(err, RuntimeError::DataStoreError(_)));
        assert!(err.message().starts_with("Malformed document accounts/rusak"));

        let lenient: Vec<Account> = decode_docs(collections::ACCOUNTS, docs);
        assert_eq!(lenient.len(), 1);
        assert_eq!(lenient[0].name, "");
    }
}
