use chrono::{DateTime, Utc};
use neraca_common::time::parse_timestamp;
use neraca_ir::utils::{line_account_id, parse_decimal_opt};
use neraca_ir::{AccountRef, JournalLine};
use neraca_runtime::errors::RuntimeError;
use rust_decimal::Decimal;
use serde_json::Value;

/// A journal that passed validation, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidJournal {
    pub date: DateTime<Utc>,
    pub description: String,
    pub period: Option<String>,
    pub entries: Vec<JournalLine>,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
}

fn invalid_payload() -> RuntimeError {
    RuntimeError::ValidationError("Invalid journal payload".to_string())
}

fn invalid_entry() -> RuntimeError {
    RuntimeError::ValidationError("Invalid journal entry".to_string())
}

fn non_blank<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Exactly one side strictly positive, neither negative, and an account reference.
pub fn check_journal_line(line: &Value) -> Result<JournalLine, RuntimeError> {
    let account = line_account_id(line)
        .filter(|id| !id.is_empty())
        .ok_or_else(invalid_entry)?;

    let debit = parse_decimal_opt(line.get("debit"));
    let credit = parse_decimal_opt(line.get("credit"));

    if debit < Decimal::ZERO || credit < Decimal::ZERO {
        return Err(invalid_entry());
    }
    let debit_set = debit > Decimal::ZERO;
    let credit_set = credit > Decimal::ZERO;
    if debit_set == credit_set {
        return Err(invalid_entry());
    }

    Ok(JournalLine {
        account: AccountRef::Id(account.to_string()),
        debit,
        credit,
    })
}

/// Debit and credit totals must match exactly.
pub fn check_balanced_transaction(entries: &[JournalLine]) -> Result<(Decimal, Decimal), RuntimeError> {
    let total_debit: Decimal = entries.iter().map(|l| l.debit).sum();
    let total_credit: Decimal = entries.iter().map(|l| l.credit).sum();

    if total_debit != total_credit {
        tracing::debug!(%total_debit, %total_credit, "journal not balanced");
        return Err(RuntimeError::ValidationError("Journal not balanced".to_string()));
    }
    Ok((total_debit, total_credit))
}

/// Validates a raw journal payload.
pub fn validate_journal(payload: &Value) -> Result<ValidJournal, RuntimeError> {
    let date_raw = non_blank(payload, "date").ok_or_else(invalid_payload)?;
    let description = non_blank(payload, "description").ok_or_else(invalid_payload)?;
    let lines = payload
        .get("entries")
        .and_then(|v| v.as_array())
        .filter(|lines| lines.len() >= 2)
        .ok_or_else(invalid_payload)?;

    let date = parse_timestamp(date_raw)
        .ok_or_else(|| RuntimeError::ValidationError(format!("Invalid journal date: {}", date_raw)))?;

    let entries = lines.iter().map(check_journal_line).collect::<Result<Vec<_>, _>>()?;
    let (total_debit, total_credit) = check_balanced_transaction(&entries)?;

    let period = match payload.get("period") {
        Some(Value::String(p)) => Some(p.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    Ok(ValidJournal {
        date,
        description: description.to_string(),
        period,
        entries,
        total_debit,
        total_credit,
    })
}
