use neraca_runtime::datastore::{DataStore, WriteOp};
use neraca_runtime::store::sqlite::SqliteDataStore;
use neraca_runtime::store::{commit_chunked, init_datastore};
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use std::collections::HashMap;

async fn sqlite_store() -> SqliteDataStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create pool");
    let store = SqliteDataStore::new(pool);
    store.migrate().await.expect("Failed to migrate");
    store
}

#[tokio::test]
async fn test_sqlite_roundtrip_and_order() {
    let store = sqlite_store().await;
    store
        .insert("accounts", json!({"id": "utang_usaha", "category": "liability"}))
        .await
        .unwrap();
    store
        .insert("accounts", json!({"id": "kas", "category": "asset", "is_total": false}))
        .await
        .unwrap();

    let ids: Vec<String> = store
        .list("accounts")
        .await
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["kas", "utang_usaha"]);

    let found = store
        .find(
            "accounts",
            HashMap::from([("category".to_string(), "asset".to_string())]),
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["id"], json!("kas"));
}

#[tokio::test]
async fn test_sqlite_dotted_update() {
    let store = sqlite_store().await;
    store
        .insert("accounts", json!({"id": "kas", "balances": {"2025-08-31": 500}}))
        .await
        .unwrap();
    store
        .update("accounts", "kas", json!({"balances.2025-09-30": 700}))
        .await
        .unwrap();

    let kas = store.get("accounts", "kas").await.unwrap().unwrap();
    assert_eq!(kas["balances"], json!({"2025-08-31": 500, "2025-09-30": 700}));
}

#[tokio::test]
async fn test_sqlite_batch_rolls_back_on_failure() {
    let store = sqlite_store().await;
    store
        .insert("journals", json!({"id": "j1", "status": "draft"}))
        .await
        .unwrap();

    let result = store
        .commit_batch(vec![
            WriteOp::update("journals", "j1", json!({"status": "closed"})),
            WriteOp::update("journals", "missing", json!({"status": "closed"})),
        ])
        .await;
    assert!(result.is_err());

    let j1 = store.get("journals", "j1").await.unwrap().unwrap();
    assert_eq!(j1["status"], json!("draft"));
}

#[tokio::test]
async fn test_chunked_commit_keeps_earlier_chunks() {
    let store = sqlite_store().await;
    for id in ["a", "b", "c"] {
        store.insert("journals", json!({"id": id, "status": "draft"})).await.unwrap();
    }

    // The second chunk fails; the first stays committed.
    let ops = vec![
        WriteOp::update("journals", "a", json!({"status": "closed"})),
        WriteOp::update("journals", "b", json!({"status": "closed"})),
        WriteOp::update("journals", "zz", json!({"status": "closed"})),
    ];
    assert!(commit_chunked(&store, ops, 2).await.is_err());

    let statuses: Vec<String> = store
        .list("journals")
        .await
        .unwrap()
        .iter()
        .map(|d| d["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(statuses, vec!["closed", "closed", "draft"]);
}

#[tokio::test]
async fn test_init_datastore_urls() {
    assert!(init_datastore(None).await.is_ok());
    assert!(init_datastore(Some("memory")).await.is_ok());

    let store = init_datastore(Some("sqlite::memory:")).await.unwrap();
    store.insert("periods", json!({"id": "2025-09-30"})).await.unwrap();
    assert!(store.get("periods", "2025-09-30").await.unwrap().is_some());

    assert!(init_datastore(Some("postgres://localhost/neraca")).await.is_err());
}
