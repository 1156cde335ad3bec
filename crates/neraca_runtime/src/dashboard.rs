use crate::datastore::DataStore;
use crate::errors::RuntimeError;
use crate::queries::{decode_docs, list_periods};
use futures::future::try_join_all;
use neraca_ir::utils::serialize_amount;
use neraca_ir::{Account, collections};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// Stored balances are in thousands of rupiah.
pub const DISPLAY_SCALE: i64 = 1000;

const SUMMARY_CARDS: [(&str, &str); 4] = [
    ("total_aset", "Total Aset"),
    ("total_liabilitas", "Total Liabilitas"),
    ("total_ekuitas", "Total Ekuitas"),
    ("laba_periode_berjalan", "Laba Bersih"),
];

pub const CHART_ACCOUNTS: [&str; 6] = [
    "penjualan_neto",
    "beban_pokok_penjualan",
    "beban_penjualan_dan_pemasaran",
    "beban_umum_dan_administrasi",
    "beban_keuangan",
    "beban_pajak_penghasilan",
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryCard {
    pub id: String,
    pub title: String,
    #[serde(serialize_with = "serialize_amount")]
    pub value: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChartPoint {
    pub name: String,
    #[serde(serialize_with = "serialize_amount")]
    pub value: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// Balance key the figures were read at; `None` when nothing has been closed yet.
    pub period: Option<String>,
    pub cards: Vec<SummaryCard>,
    pub revenue_vs_expense: Vec<ChartPoint>,
    pub expense_composition: Vec<ChartPoint>,
}

pub struct DashboardEngine;

impl Default for DashboardEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardEngine {
    pub fn new() -> Self {
        Self
    }

    /// Builds the summary at `period` (a balance key), defaulting to the latest closed period.
    pub async fn evaluate(&self, datastore: &dyn DataStore, period: Option<&str>) -> Result<DashboardSummary, RuntimeError> {
        let period = match period.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => Some(p.to_string()),
            None => list_periods(datastore).await?.into_iter().next().map(|p| p.end_date),
        };

        let (totals, charts) = futures::try_join!(load_total_accounts(datastore), load_chart_accounts(datastore))?;

        let key = period.as_deref().unwrap_or_default();
        let scaled = |acc: &Account| acc.balance_at(key) * Decimal::from(DISPLAY_SCALE);

        let cards = SUMMARY_CARDS
            .iter()
            .filter_map(|(id, title)| {
                totals.iter().find(|a| a.id == *id).map(|acc| SummaryCard {
                    id: id.to_string(),
                    title: title.to_string(),
                    value: scaled(acc),
                })
            })
            .collect();

        let chart: HashMap<&str, Decimal> = charts.iter().map(|acc| (acc.id.as_str(), scaled(acc).abs())).collect();
        let amount = |id: &str| chart.get(id).copied().unwrap_or(Decimal::ZERO);

        let total_expense: Decimal = CHART_ACCOUNTS[1..].iter().map(|id| amount(id)).sum();
        let revenue_vs_expense = vec![
            ChartPoint {
                name: "Pendapatan".to_string(),
                value: amount("penjualan_neto"),
            },
            ChartPoint {
                name: "Total Beban".to_string(),
                value: total_expense,
            },
        ];

        let expense_composition = [
            ("Beban Pokok (COGS)", amount("beban_pokok_penjualan")),
            ("Penjualan & Pemasaran", amount("beban_penjualan_dan_pemasaran")),
            ("Umum & Administrasi", amount("beban_umum_dan_administrasi")),
            (
                "Keuangan & Pajak",
                amount("beban_keuangan") + amount("beban_pajak_penghasilan"),
            ),
        ]
        .into_iter()
        .filter(|(_, value)| *value > Decimal::ZERO)
        .map(|(name, value)| ChartPoint {
            name: name.to_string(),
            value,
        })
        .collect();

        Ok(DashboardSummary {
            period,
            cards,
            revenue_vs_expense,
            expense_composition,
        })
    }
}

async fn load_total_accounts(datastore: &dyn DataStore) -> Result<Vec<Account>, RuntimeError> {
    let filters = HashMap::from([("is_total".to_string(), "true".to_string())]);
    let docs = datastore
        .find(collections::ACCOUNTS, filters)
        .await
        .map_err(RuntimeError::DataStoreError)?;
    Ok(decode_docs(collections::ACCOUNTS, docs))
}

async fn load_chart_accounts(datastore: &dyn DataStore) -> Result<Vec<Account>, RuntimeError> {
    let docs = try_join_all(CHART_ACCOUNTS.iter().map(|id| datastore.get(collections::ACCOUNTS, id)))
        .await
        .map_err(RuntimeError::DataStoreError)?;
    Ok(decode_docs(collections::ACCOUNTS, docs.into_iter().flatten().collect()))
}
