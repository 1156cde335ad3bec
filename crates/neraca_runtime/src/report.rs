//! Financial statements assembled from a stored layout and account balances.

use crate::datastore::DataStore;
use crate::errors::RuntimeError;
use crate::queries::load_accounts;
use neraca_ir::{FinancialReport, ReportLayout, ReportRow, ReportSection, Side, collections};
use std::fmt::Write;

pub const CURRENCY: &str = "IDR";
pub const UNIT: &str = "thousand";

/// Public report key to layout document id.
pub const REPORT_MAP: [(&str, &str); 4] = [
    ("balance-sheet", "statement_of_financial_position"),
    ("income-statement", "statement_of_profit_or_loss"),
    ("cash-flow", "statement_of_cash_flows"),
    ("equity-changes", "statement_of_changes_in_equity"),
];

pub fn layout_id(report_key: &str) -> Option<&'static str> {
    REPORT_MAP
        .iter()
        .find(|(key, _)| *key == report_key)
        .map(|(_, layout)| *layout)
}

/// Builds the statement `report_key` at balance key `period`.
///
/// Each section collects the accounts whose group is listed in its `accountGroups`,
/// reading the balance stored under `period` (zero when absent). Regular rows come
/// before total rows and both keep account order. Sections are sorted by `order`.
pub async fn assemble_report(
    datastore: &dyn DataStore,
    report_key: &str,
    period: Option<&str>,
) -> Result<FinancialReport, RuntimeError> {
    let period = period
        .filter(|p| !p.is_empty())
        .ok_or_else(|| RuntimeError::ValidationError("Period wajib diisi".to_string()))?;
    let layout_id =
        layout_id(report_key).ok_or_else(|| RuntimeError::NotFound("Pilih Laporan Terlebih Dahulu!".to_string()))?;

    let doc = datastore
        .get(collections::REPORT_LAYOUTS, layout_id)
        .await
        .map_err(RuntimeError::DataStoreError)?
        .ok_or_else(|| RuntimeError::NotFound("Layout tidak ditemukan".to_string()))?;
    let layout: ReportLayout = serde_json::from_value(doc.as_ref().clone())
        .map_err(|e| RuntimeError::InternalError(format!("Malformed layout {}: {}", layout_id, e)))?;

    let accounts = load_accounts(datastore).await?;

    let mut sections: Vec<ReportSection> = layout
        .sections
        .iter()
        .map(|section| {
            let (mut rows, totals): (Vec<ReportRow>, Vec<ReportRow>) = accounts
                .iter()
                .filter(|acc| {
                    acc.group
                        .as_deref()
                        .is_some_and(|group| section.account_groups.iter().any(|g| g == group))
                })
                .map(|acc| ReportRow {
                    id: acc.id.clone(),
                    name: acc.name.clone(),
                    amount: acc.balance_at(period),
                    is_total: acc.is_total,
                })
                .partition(|row| !row.is_total);
            rows.extend(totals);

            ReportSection {
                id: section.id.clone(),
                label: section.label.clone(),
                side: section.side,
                order: section.order,
                rows,
            }
        })
        .collect();
    sections.sort_by_key(|s| s.order);

    Ok(FinancialReport {
        id: layout_id.to_string(),
        name: layout.name,
        statement: layout.statement,
        period_code: period.to_string(),
        currency: CURRENCY.to_string(),
        unit: UNIT.to_string(),
        sections,
    })
}

/// Plain-text rendering used by the command line.
pub fn render_text(report: &FinancialReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", report.name);
    let _ = writeln!(out, "Period: {} ({}, {})", report.period_code, report.currency, report.unit);

    for section in &report.sections {
        out.push('\n');
        match section.side {
            Some(Side::Left) => {
                let _ = writeln!(out, "{} [left]", section.label);
            }
            Some(Side::Right) => {
                let _ = writeln!(out, "{} [right]", section.label);
            }
            None => {
                let _ = writeln!(out, "{}", section.label);
            }
        }
        for row in &section.rows {
            let marker = if row.is_total { "= " } else { "" };
            let _ = writeln!(out, "  {}{}: {}", marker, row.name, row.amount);
        }
    }
    out
}
