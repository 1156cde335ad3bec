use super::rules::{CASH_ACCOUNT, Classification, TotalInputs, evaluate_total, prior_balance};
use super::utils::{fetch_accounts, fetch_journals_in_range, fetch_report_account_map};
use chrono::{DateTime, Utc};
use neraca_common::time::PeriodBounds;
use neraca_ir::utils::{decimal_to_value, serialize_amount};
use neraca_ir::{JournalStatus, Period, collections};
use neraca_runtime::datastore::{DataStore, WriteOp};
use neraca_runtime::errors::RuntimeError;
use neraca_runtime::store::commit_chunked;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Upper bound of write operations per atomic batch.
pub const CLOSING_BATCH_SIZE: usize = 450;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TotalSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "final", serialize_with = "serialize_amount")]
    pub final_balance: Decimal,
    pub is_total: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClosingResult {
    pub success: bool,
    pub processed_accounts: usize,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<TotalSummary>>,
}

impl ClosingResult {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            processed_accounts: 0,
            message,
            details: None,
        }
    }
}

/// Closes the books for `period_code` (`YYYY-MM`).
///
/// Never returns an error: failures come back as `success: false`. Batches
/// committed before a failure stay applied.
pub async fn close_books(datastore: &dyn DataStore, period_code: &str, previous_period_code: Option<&str>) -> ClosingResult {
    tracing::info!(period_code, ?previous_period_code, "closing books");
    match run_closing(datastore, period_code, previous_period_code, Utc::now()).await {
        Ok(result) => {
            tracing::info!(processed = result.processed_accounts, "{}", result.message);
            result
        }
        Err(e) => {
            tracing::error!(period_code, error = %e, "closing failed");
            ClosingResult::failed(e.message().to_string())
        }
    }
}

async fn upsert_period(datastore: &dyn DataStore, bounds: &PeriodBounds, now: DateTime<Utc>) -> Result<(), RuntimeError> {
    let end_key = bounds.end_key();
    let existing = datastore
        .get(collections::PERIODS, &end_key)
        .await
        .map_err(RuntimeError::DataStoreError)?;

    let period = Period {
        id: end_key.clone(),
        code: end_key.clone(),
        label: bounds.label(),
        end_date: end_key.clone(),
        year: bounds.year,
        month: bounds.month,
        period_type: "monthly".to_string(),
        created_at: existing.is_none().then_some(now),
        updated_at: Some(now),
    };
    let record = serde_json::to_value(&period)
        .map_err(|e| RuntimeError::InternalError(format!("Failed to encode period: {}", e)))?;

    let result = if existing.is_some() {
        datastore.update(collections::PERIODS, &end_key, record).await
    } else {
        datastore.set(collections::PERIODS, &end_key, record, false).await
    };
    result.map_err(RuntimeError::DataStoreError)
}

fn balance_update(account_id: &str, end_key: &str, balance: Decimal) -> WriteOp {
    let mut fields = Map::new();
    fields.insert(format!("balances.{}", end_key), decimal_to_value(balance));
    WriteOp::update(collections::ACCOUNTS, account_id, Value::Object(fields))
}

async fn run_closing(
    datastore: &dyn DataStore,
    period_code: &str,
    previous_period_code: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ClosingResult, RuntimeError> {
    let bounds = PeriodBounds::from_code(period_code).map_err(|e| RuntimeError::ValidationError(e.to_string()))?;
    let end_key = bounds.end_key();
    let start_key = bounds.start_key();
    let previous_end_key = bounds.previous_end_key();
    let label = bounds.label();

    upsert_period(datastore, &bounds, now).await?;

    let journals = fetch_journals_in_range(datastore, bounds.range_start(), bounds.range_end()).await?;
    let report_accounts = fetch_report_account_map(datastore).await?;
    let accounts = fetch_accounts(datastore).await?;
    tracing::debug!(journals = journals.len(), accounts = accounts.len(), "closing inputs loaded");

    // Debit and credit per report account; lines on unmapped detail accounts are skipped.
    let mut mutations: HashMap<&str, (Decimal, Decimal)> = HashMap::new();
    for line in journals.iter().flat_map(|j| j.entries.iter()) {
        if let Some(target) = report_accounts.get(line.account.id()) {
            let entry = mutations.entry(target.as_str()).or_default();
            entry.0 += line.debit;
            entry.1 += line.credit;
        }
    }

    let mut ops = Vec::with_capacity(accounts.len() + journals.len());
    let mut inputs = TotalInputs::default();
    let mut processed = 0usize;

    for account in accounts.iter().filter(|a| !a.is_total) {
        let (debit, credit) = mutations.get(account.id.as_str()).copied().unwrap_or_default();
        let prior = prior_balance(&account.balances, &previous_end_key, previous_period_code, &start_key);

        let class = Classification::of(account.category_text());
        let balance = class.new_balance(prior, class.net_mutation(debit, credit));

        inputs.record(account, balance, class);
        ops.push(balance_update(&account.id, &end_key, balance));
        processed += 1;
    }

    inputs.prior_cash = accounts
        .iter()
        .find(|a| a.id == CASH_ACCOUNT)
        .map(|cash| prior_balance(&cash.balances, &previous_end_key, None, &start_key))
        .unwrap_or(Decimal::ZERO);

    let mut details = Vec::new();
    for account in accounts.iter().filter(|a| a.is_total) {
        let value = evaluate_total(account, &inputs);
        ops.push(balance_update(&account.id, &end_key, value));
        details.push(TotalSummary {
            id: account.id.clone(),
            name: account.name.clone(),
            final_balance: value,
            is_total: true,
        });
        processed += 1;
    }

    let closed = serde_json::json!({ "status": JournalStatus::Closed });
    ops.extend(
        journals
            .iter()
            .map(|j| WriteOp::update(collections::JOURNALS, &j.id, closed.clone())),
    );

    let batches = commit_chunked(datastore, ops, CLOSING_BATCH_SIZE)
        .await
        .map_err(RuntimeError::DataStoreError)?;
    tracing::debug!(batches, "closing committed");

    Ok(ClosingResult {
        success: true,
        processed_accounts: processed,
        message: format!(
            "Closed books for {} (ID: {}). Updated {} accounts.",
            label, end_key, processed
        ),
        details: Some(details),
    })
}
