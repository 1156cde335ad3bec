use chrono::{TimeZone, Utc};
use neraca_plugins::finance::{create_journal, general_ledger};
use neraca_runtime::auth::SharedSecret;
use neraca_runtime::datastore::DataStore;
use neraca_runtime::errors::RuntimeError;
use neraca_runtime::store::MemoryDataStore;
use rust_decimal::Decimal;
use serde_json::{Value, json};

fn payload(pass: &str, entries: Value) -> Value {
    json!({
        "date": "2025-09-15",
        "description": "Penjualan tunai",
        "period": "2025-09-30",
        "entries": entries,
        "pass": pass
    })
}

fn balanced() -> Value {
    json!([
        {"account": "kas_bank", "debit": 250, "credit": 0},
        {"account": "penjualan", "debit": 0, "credit": 250}
    ])
}

#[tokio::test]
async fn test_create_journal_as_draft() {
    let store = MemoryDataStore::new();
    let secret = SharedSecret::new(Some("rahasia")).unwrap();
    let now = Utc.with_ymd_and_hms(2025, 9, 15, 8, 30, 0).unwrap();

    let id = create_journal(&store, &secret, &payload("rahasia", balanced()), now)
        .await
        .unwrap();

    let doc = store.get("journals", &id).await.unwrap().unwrap();
    assert_eq!(doc["status"], json!("draft"));
    assert_eq!(doc["total_debit"], json!(250));
    assert_eq!(doc["total_credit"], json!(250));
    assert_eq!(doc["date"], json!("2025-09-15T00:00:00.000Z"));
    assert_eq!(doc["created_at"], json!("2025-09-15T08:30:00.000Z"));
    assert_eq!(doc["posted_at"], Value::Null);
    assert_eq!(doc["period"], json!("2025-09-30"));
    assert_eq!(doc["entries"][0], json!({"account": "kas_bank", "debit": 250, "credit": 0}));
    assert!(doc.get("pass").is_none());

    // Balances are not touched by journal creation.
    assert!(store.list("accounts").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_secret_is_checked_before_payload() {
    let store = MemoryDataStore::new();
    let secret = SharedSecret::new(Some("rahasia")).unwrap();
    let now = Utc::now();

    let err = create_journal(&store, &secret, &json!({"pass": "salah"}), now)
        .await
        .unwrap_err();
    assert_eq!(err, RuntimeError::Unauthorized("Wrong Password".to_string()));

    let err = create_journal(&store, &secret, &json!({"pass": "rahasia"}), now)
        .await
        .unwrap_err();
    assert_eq!(err, RuntimeError::ValidationError("Invalid journal payload".to_string()));
}

#[tokio::test]
async fn test_unconfigured_secret_refuses_writes() {
    let store = MemoryDataStore::new();
    let err = create_journal(&store, &SharedSecret::disabled(), &payload("", balanced()), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Unauthorized(_)));
    assert!(store.list("journals").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_journals_are_not_stored() {
    let store = MemoryDataStore::new();
    let secret = SharedSecret::new(Some("rahasia")).unwrap();

    for (entries, expected) in [
        (json!([{"account": "kas_bank", "debit": 100}]), "Invalid journal payload"),
        (
            json!([{"account": "kas_bank", "debit": 100, "credit": 100}, {"account": "penjualan", "credit": 100}]),
            "Invalid journal entry",
        ),
        (
            json!([{"account": "kas_bank", "debit": 0, "credit": 0}, {"account": "penjualan", "credit": 100}]),
            "Invalid journal entry",
        ),
        (
            json!([{"account": "kas_bank", "debit": 100}, {"account": "penjualan", "credit": 90}]),
            "Journal not balanced",
        ),
    ] {
        let err = create_journal(&store, &secret, &payload("rahasia", entries), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.message(), expected);
    }
    assert!(store.list("journals").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_general_ledger_running_balance() {
    let store = MemoryDataStore::new();
    store
        .insert("journal_accounts", json!({"id": "kas_bank", "name": "Bank BCA", "code": "1101"}))
        .await
        .unwrap();
    for (id, date, entries) in [
        (
            "bbbbbbbb",
            "2025-09-20",
            json!([{"account": "kas_bank", "credit": 40}, {"account": "gaji", "debit": 40}]),
        ),
        (
            "aaaaaaaa",
            "2025-09-05",
            json!([{"account": {"id": "kas_bank"}, "debit": 100}, {"account": "modal", "credit": 100}]),
        ),
        (
            "cccccccc",
            "2025-10-02",
            json!([{"account": "kas_bank", "debit": 5}, {"account": "modal", "credit": 5}]),
        ),
    ] {
        store
            .insert("journals", json!({"id": id, "date": date, "description": id, "entries": entries}))
            .await
            .unwrap();
    }

    let ledger = general_ledger(&store, "kas_bank", Some("2025-09-01"), Some("2025-09-30"))
        .await
        .unwrap();

    assert_eq!(ledger.account_name, "1101 - Bank BCA");
    let balances: Vec<Decimal> = ledger.rows.iter().map(|r| r.balance).collect();
    assert_eq!(balances, vec![Decimal::from(100), Decimal::from(60)]);
    assert_eq!(ledger.rows[0].reference, "AAAAAA");
    assert_eq!(ledger.total_debit, Decimal::from(100));
    assert_eq!(ledger.total_credit, Decimal::from(40));
    assert_eq!(ledger.ending_balance, Decimal::from(60));

    let everything = general_ledger(&store, "kas_bank", None, None).await.unwrap();
    assert_eq!(everything.rows.len(), 3);
    assert_eq!(everything.ending_balance, Decimal::from(65));

    let unknown = general_ledger(&store, "tidak_ada", None, None).await.unwrap();
    assert_eq!(unknown.account_name, "Unknown Account");
    assert!(unknown.rows.is_empty());
}
