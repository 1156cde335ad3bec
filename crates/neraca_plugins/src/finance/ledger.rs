use chrono::{DateTime, Utc};
use neraca_common::time::iso_millis;
use neraca_ir::utils::serialize_amount;
use neraca_ir::{JournalAccount, collections};
use neraca_runtime::datastore::DataStore;
use neraca_runtime::errors::RuntimeError;
use neraca_runtime::queries::list_journals;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LedgerRow {
    pub journal_id: String,
    #[serde(with = "iso_millis")]
    pub date: DateTime<Utc>,
    pub description: String,
    /// Short journal reference: the first six characters of the id, upper-cased.
    pub reference: String,
    #[serde(serialize_with = "serialize_amount")]
    pub debit: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub credit: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Ledger {
    pub account_id: String,
    pub account_name: String,
    pub rows: Vec<LedgerRow>,
    #[serde(serialize_with = "serialize_amount")]
    pub total_debit: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub total_credit: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub ending_balance: Decimal,
}

/// General ledger of one detail account over an optional date range.
/// Lines are ordered by journal date; the running balance is `Σ(debit − credit)`.
pub async fn general_ledger(
    datastore: &dyn DataStore,
    account_id: &str,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Result<Ledger, RuntimeError> {
    let account_name = match datastore
        .get(collections::JOURNAL_ACCOUNTS, account_id)
        .await
        .map_err(RuntimeError::DataStoreError)?
    {
        Some(doc) => serde_json::from_value::<JournalAccount>(doc.as_ref().clone())
            .map(|acc| acc.display_name())
            .unwrap_or_else(|_| "Unknown Account".to_string()),
        None => "Unknown Account".to_string(),
    };

    let mut journals = list_journals(datastore, start_date, end_date).await?;
    journals.sort_by_key(|j| j.date);

    let mut rows = Vec::new();
    let mut balance = Decimal::ZERO;
    for journal in &journals {
        for line in journal.entries.iter().filter(|l| l.account.id() == account_id) {
            balance += line.debit - line.credit;
            rows.push(LedgerRow {
                journal_id: journal.id.clone(),
                date: journal.date,
                description: journal.description.clone(),
                reference: journal.id.chars().take(6).collect::<String>().to_uppercase(),
                debit: line.debit,
                credit: line.credit,
                balance,
            });
        }
    }

    Ok(Ledger {
        account_id: account_id.to_string(),
        account_name,
        total_debit: rows.iter().map(|r| r.debit).sum(),
        total_credit: rows.iter().map(|r| r.credit).sum(),
        ending_balance: balance,
        rows,
    })
}
