use chrono::{DateTime, Utc};
use neraca_common::time::iso_millis;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub mod utils;

/// Collection names in the document store.
pub mod collections {
    pub const ACCOUNTS: &str = "accounts";
    pub const JOURNAL_ACCOUNTS: &str = "journal_accounts";
    pub const JOURNALS: &str = "journals";
    pub const PERIODS: &str = "periods";
    pub const REPORT_LAYOUTS: &str = "reportLayouts";

    pub const ALL: [&str; 5] = [ACCOUNTS, JOURNAL_ACCOUNTS, JOURNALS, PERIODS, REPORT_LAYOUTS];
}

/// Report-level account. Balances are keyed by period end date (`YYYY-MM-DD`).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Account {
    #[serde(default, deserialize_with = "utils::null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "utils::null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "utils::lenient_text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "utils::lenient_text")]
    pub group: Option<String>,
    #[serde(default, deserialize_with = "utils::null_as_default")]
    pub is_total: bool,
    #[serde(
        default,
        deserialize_with = "utils::lenient_decimal_map",
        serialize_with = "utils::serialize_amount_map"
    )]
    pub balances: BTreeMap<String, Decimal>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Account {
    pub fn category_text(&self) -> &str {
        self.category.as_deref().unwrap_or("")
    }

    /// Group name, ignoring blanks.
    pub fn group_key(&self) -> Option<&str> {
        self.group.as_deref().filter(|g| !g.is_empty())
    }

    pub fn balance_at(&self, key: &str) -> Decimal {
        self.balances.get(key).copied().unwrap_or(Decimal::ZERO)
    }
}

/// Transaction-level account that rolls up into a report account.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct JournalAccount {
    #[serde(default, deserialize_with = "utils::null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "utils::null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "utils::lenient_text")]
    pub report_account_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JournalAccount {
    pub fn display_name(&self) -> String {
        match self.code.as_deref() {
            Some(code) if !code.is_empty() => format!("{} - {}", code, self.name),
            _ => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JournalStatus {
    #[default]
    Draft,
    Posted,
    Closed,
}

/// A journal line may reference its detail account by id or by an embedded document.
/// Any other shape is kept as-is and resolves to no account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum AccountRef {
    Id(String),
    Doc { id: String },
    Other(Value),
}

impl Default for AccountRef {
    fn default() -> Self {
        AccountRef::Other(Value::Null)
    }
}

impl AccountRef {
    /// Empty when the reference carries no usable id.
    pub fn id(&self) -> &str {
        match self {
            AccountRef::Id(id) => id,
            AccountRef::Doc { id } => id,
            AccountRef::Other(_) => "",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalLine {
    #[serde(default)]
    pub account: AccountRef,
    #[serde(
        default,
        deserialize_with = "utils::lenient_decimal",
        serialize_with = "utils::serialize_amount"
    )]
    pub debit: Decimal,
    #[serde(
        default,
        deserialize_with = "utils::lenient_decimal",
        serialize_with = "utils::serialize_amount"
    )]
    pub credit: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Journal {
    #[serde(default, deserialize_with = "utils::null_as_default")]
    pub id: String,
    #[serde(with = "iso_millis")]
    pub date: DateTime<Utc>,
    #[serde(default, deserialize_with = "utils::null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "utils::lenient_text")]
    pub period: Option<String>,
    #[serde(default, deserialize_with = "utils::null_as_default")]
    pub entries: Vec<JournalLine>,
    #[serde(default, deserialize_with = "utils::null_as_default")]
    pub status: JournalStatus,
    #[serde(
        default,
        deserialize_with = "utils::lenient_decimal",
        serialize_with = "utils::serialize_amount"
    )]
    pub total_debit: Decimal,
    #[serde(
        default,
        deserialize_with = "utils::lenient_decimal",
        serialize_with = "utils::serialize_amount"
    )]
    pub total_credit: Decimal,
    #[serde(default, with = "iso_millis::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "iso_millis::option")]
    pub posted_at: Option<DateTime<Utc>>,
}

/// Registry record of a closed period; the document id is the end date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Period {
    pub id: String,
    pub code: String,
    pub label: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
    pub year: i32,
    pub month: u32,
    #[serde(rename = "type", default = "default_period_type")]
    pub period_type: String,
    #[serde(default, with = "iso_millis::option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "iso_millis::option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_period_type() -> String {
    "monthly".to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LayoutSection {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub side: Option<Side>,
    #[serde(default)]
    pub order: i64,
    #[serde(rename = "accountGroups", default)]
    pub account_groups: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ReportLayout {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub statement: String,
    #[serde(default)]
    pub sections: Vec<LayoutSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub id: String,
    pub name: String,
    #[serde(serialize_with = "utils::serialize_amount")]
    pub amount: Decimal,
    pub is_total: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportSection {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    pub order: i64,
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinancialReport {
    pub id: String,
    pub name: String,
    pub statement: String,
    pub period_code: String,
    pub currency: String,
    pub unit: String,
    pub sections: Vec<ReportSection>,
}
