//! Balance rules for the closing run.
//!
//! Regular accounts are classified by category text; total accounts are
//! evaluated through an ordered rule table keyed by account id.

use neraca_ir::Account;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

pub const BALANCE_SHEET_CATEGORIES: [&str; 6] = ["asset", "liability", "equity", "harta", "kewajiban", "modal"];
pub const DEBIT_NORMAL_CATEGORIES: [&str; 4] = ["asset", "expense", "beban", "harta"];
pub const REVENUE_CATEGORIES: [&str; 2] = ["revenue", "pendapatan"];
pub const EXPENSE_CATEGORIES: [&str; 2] = ["expense", "beban"];

pub const CASH_ACCOUNT: &str = "kas_dan_setara_kas";

fn mentions_any(category: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| category.contains(n))
}

/// How a regular account's category text (case-insensitive substring match) drives closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub balance_sheet: bool,
    pub debit_normal: bool,
    pub revenue: bool,
    pub expense: bool,
}

impl Classification {
    pub fn of(category: &str) -> Self {
        let category = category.to_lowercase();
        Self {
            balance_sheet: mentions_any(&category, &BALANCE_SHEET_CATEGORIES),
            debit_normal: mentions_any(&category, &DEBIT_NORMAL_CATEGORIES),
            revenue: mentions_any(&category, &REVENUE_CATEGORIES),
            expense: mentions_any(&category, &EXPENSE_CATEGORIES),
        }
    }

    /// Period movement in the account's normal direction.
    pub fn net_mutation(&self, debit: Decimal, credit: Decimal) -> Decimal {
        if self.debit_normal { debit - credit } else { credit - debit }
    }

    /// Balance sheet accounts carry the prior balance forward; flow accounts restart each period.
    pub fn new_balance(&self, prior: Decimal, net: Decimal) -> Decimal {
        if self.balance_sheet { prior + net } else { net }
    }

    /// Contribution of `balance` to the period's profit or loss.
    pub fn profit_loss_delta(&self, balance: Decimal) -> Decimal {
        let mut delta = Decimal::ZERO;
        if self.revenue {
            delta += balance;
        }
        if self.expense {
            delta -= balance;
        }
        delta
    }
}

/// Balance carried into a period: the previous period end, then `fallback_key`,
/// then the latest key before `start_key`, then zero.
pub fn prior_balance(
    balances: &BTreeMap<String, Decimal>,
    previous_end_key: &str,
    fallback_key: Option<&str>,
    start_key: &str,
) -> Decimal {
    if let Some(balance) = balances.get(previous_end_key) {
        return *balance;
    }
    if let Some(key) = fallback_key.filter(|k| !k.is_empty())
        && let Some(balance) = balances.get(key)
    {
        return *balance;
    }
    balances
        .range::<str, _>((Bound::Unbounded, Bound::Excluded(start_key)))
        .next_back()
        .map(|(_, balance)| *balance)
        .unwrap_or(Decimal::ZERO)
}

/// Figures gathered from the regular accounts, read by the total rules.
#[derive(Debug, Clone, Default)]
pub struct TotalInputs {
    pub group_sums: HashMap<String, Decimal>,
    pub category_sums: HashMap<String, Decimal>,
    pub profit_loss: Decimal,
    pub final_balances: HashMap<String, Decimal>,
    /// Opening balance of the cash account.
    pub prior_cash: Decimal,
}

impl TotalInputs {
    pub fn group(&self, key: &str) -> Decimal {
        self.group_sums.get(key).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn category(&self, key: &str) -> Decimal {
        self.category_sums.get(key).copied().unwrap_or(Decimal::ZERO)
    }

    /// Adds a closed regular account to the sums.
    pub fn record(&mut self, account: &Account, balance: Decimal, class: Classification) {
        self.final_balances.insert(account.id.clone(), balance);
        if let Some(group) = account.group_key() {
            *self.group_sums.entry(group.to_string()).or_default() += balance;
        }
        if let Some(category) = account.category.as_deref().filter(|c| !c.is_empty()) {
            *self.category_sums.entry(category.to_string()).or_default() += balance;
        }
        self.profit_loss += class.profit_loss_delta(balance);
    }
}

pub type TotalRule = fn(&TotalInputs) -> Decimal;

/// Checked before the group-sum fallback.
pub const PRIMARY_RULES: &[(&str, TotalRule)] = &[
    ("kas_dan_setara_kas_akhir_periode_cf", ending_cash),
    ("kas_dan_setara_kas_akhir_periode_cf_komponen", ending_cash),
    ("kas_dan_setara_kas_awal_periode_cf", beginning_cash),
    ("kenaikan_penurunan_neto_kas_dan_setara_kas", net_cash_change),
    ("total_aset", total_assets),
    ("total_liabilitas", total_liabilities),
    ("total_ekuitas", total_equity),
    ("laba_periode_berjalan", profit_loss),
    ("laba_bersih", profit_loss),
];

/// Checked when the account's group has no sum.
pub const DERIVED_RULES: &[(&str, TotalRule)] = &[
    ("laba_bruto", gross_profit),
    ("laba_usaha", operating_profit),
    ("laba_sebelum_pajak_penghasilan", profit_before_tax),
    ("kas_neto_dari_aktivitas_operasi", operating_cash),
    ("kas_neto_dari_aktivitas_investasi", investing_cash),
    ("kas_neto_dari_aktivitas_pendanaan", financing_cash),
];

fn lookup(rules: &[(&str, TotalRule)], id: &str) -> Option<TotalRule> {
    rules.iter().find(|(rule_id, _)| *rule_id == id).map(|(_, rule)| *rule)
}

/// Closing value of a total account. Unmatched accounts close at zero.
pub fn evaluate_total(account: &Account, inputs: &TotalInputs) -> Decimal {
    if let Some(rule) = lookup(PRIMARY_RULES, &account.id) {
        return rule(inputs);
    }
    if let Some(group) = account.group_key()
        && let Some(sum) = inputs.group_sums.get(group)
    {
        return *sum;
    }
    lookup(DERIVED_RULES, &account.id)
        .map(|rule| rule(inputs))
        .unwrap_or(Decimal::ZERO)
}

fn ending_cash(i: &TotalInputs) -> Decimal {
    match i.final_balances.get(CASH_ACCOUNT) {
        Some(balance) if !balance.is_zero() => *balance,
        _ => i.group(CASH_ACCOUNT),
    }
}

fn beginning_cash(i: &TotalInputs) -> Decimal {
    i.prior_cash
}

fn net_cash_change(i: &TotalInputs) -> Decimal {
    ending_cash(i) - beginning_cash(i)
}

fn total_assets(i: &TotalInputs) -> Decimal {
    i.category("asset")
}

fn total_liabilities(i: &TotalInputs) -> Decimal {
    i.category("liability")
}

fn total_equity(i: &TotalInputs) -> Decimal {
    i.category("equity") + i.profit_loss
}

fn profit_loss(i: &TotalInputs) -> Decimal {
    i.profit_loss
}

fn gross_profit(i: &TotalInputs) -> Decimal {
    i.group("pendapatan") - i.group("beban_pokok_pendapatan")
}

fn operating_profit(i: &TotalInputs) -> Decimal {
    gross_profit(i) - i.group("beban_usaha")
}

fn profit_before_tax(i: &TotalInputs) -> Decimal {
    operating_profit(i) + i.group("pendapatan_lain") - i.group("beban_lain")
}

fn activity_cash(i: &TotalInputs, total_group: &str, activity_group: &str) -> Decimal {
    let total = i.group(total_group);
    if total.is_zero() { i.group(activity_group) } else { total }
}

fn operating_cash(i: &TotalInputs) -> Decimal {
    activity_cash(i, "kas_neto_dari_aktivitas_operasi", "aktivitas_operasi")
}

fn investing_cash(i: &TotalInputs) -> Decimal {
    activity_cash(i, "kas_neto_dari_aktivitas_investasi", "aktivitas_investasi")
}

fn financing_cash(i: &TotalInputs) -> Decimal {
    activity_cash(i, "kas_neto_dari_aktivitas_pendanaan", "aktivitas_pendanaan")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn total(id: &str, group: Option<&str>) -> Account {
        Account {
            id: id.to_string(),
            group: group.map(str::to_string),
            is_total: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_classification_synonyms() {
        let harta = Classification::of("Harta Lancar");
        assert!(harta.balance_sheet && harta.debit_normal);

        let modal = Classification::of("modal");
        assert!(modal.balance_sheet && !modal.debit_normal);

        let beban = Classification::of("beban");
        assert!(!beban.balance_sheet && beban.debit_normal && beban.expense);

        let pendapatan = Classification::of("Pendapatan");
        assert!(!pendapatan.balance_sheet && !pendapatan.debit_normal && pendapatan.revenue);
    }

    #[test]
    fn test_flow_account_restarts() {
        let expense = Classification::of("expense");
        let net = expense.net_mutation(d(0), d(50));
        assert_eq!(expense.new_balance(d(1000), net), d(-50));

        let asset = Classification::of("asset");
        let net = asset.net_mutation(d(200), d(0));
        assert_eq!(asset.new_balance(d(500), net), d(700));
    }

    #[test]
    fn test_prior_balance_lookup_order() {
        let balances: BTreeMap<String, Decimal> = [
            ("2025-06-30".to_string(), d(100)),
            ("2025-07-31".to_string(), d(200)),
            ("2025-09-30".to_string(), d(999)),
            ("custom".to_string(), d(42)),
        ]
        .into_iter()
        .collect();

        assert_eq!(prior_balance(&balances, "2025-07-31", None, "2025-08-01"), d(200));
        assert_eq!(prior_balance(&balances, "2025-08-31", Some("custom"), "2025-09-01"), d(42));
        // Falls back to the latest key before the start date, ignoring later ones.
        assert_eq!(prior_balance(&balances, "2025-08-31", Some("2025-08"), "2025-09-01"), d(200));
        assert_eq!(prior_balance(&balances, "2025-05-31", None, "2025-06-01"), d(0));
        assert_eq!(prior_balance(&BTreeMap::new(), "2025-08-31", None, "2025-09-01"), d(0));
    }

    #[test]
    fn test_primary_rules_win_over_group_sum() {
        let mut inputs = TotalInputs::default();
        inputs.category_sums.insert("asset".to_string(), d(1000));
        inputs.group_sums.insert("ringkasan".to_string(), d(5));
        assert_eq!(evaluate_total(&total("total_aset", Some("ringkasan")), &inputs), d(1000));
    }

    #[test]
    fn test_group_sum_wins_over_derived_rules() {
        let mut inputs = TotalInputs::default();
        inputs.group_sums.insert("pendapatan".to_string(), d(300));
        inputs.group_sums.insert("laba_kotor".to_string(), d(7));
        assert_eq!(evaluate_total(&total("laba_bruto", Some("laba_kotor")), &inputs), d(7));
        assert_eq!(evaluate_total(&total("laba_bruto", None), &inputs), d(300));
    }

    #[test]
    fn test_profit_chain() {
        let mut inputs = TotalInputs::default();
        for (group, v) in [
            ("pendapatan", 1000),
            ("beban_pokok_pendapatan", 400),
            ("beban_usaha", 100),
            ("pendapatan_lain", 30),
            ("beban_lain", 10),
        ] {
            inputs.group_sums.insert(group.to_string(), d(v));
        }
        assert_eq!(evaluate_total(&total("laba_bruto", None), &inputs), d(600));
        assert_eq!(evaluate_total(&total("laba_usaha", None), &inputs), d(500));
        assert_eq!(evaluate_total(&total("laba_sebelum_pajak_penghasilan", None), &inputs), d(520));
    }

    #[test]
    fn test_cash_rules() {
        let mut inputs = TotalInputs {
            prior_cash: d(500),
            ..Default::default()
        };
        inputs.group_sums.insert(CASH_ACCOUNT.to_string(), d(650));

        // A zero cash balance falls back to the group sum.
        inputs.final_balances.insert(CASH_ACCOUNT.to_string(), d(0));
        assert_eq!(evaluate_total(&total("kas_dan_setara_kas_akhir_periode_cf", None), &inputs), d(650));

        inputs.final_balances.insert(CASH_ACCOUNT.to_string(), d(700));
        assert_eq!(evaluate_total(&total("kas_dan_setara_kas_akhir_periode_cf_komponen", None), &inputs), d(700));
        assert_eq!(evaluate_total(&total("kas_dan_setara_kas_awal_periode_cf", None), &inputs), d(500));
        assert_eq!(evaluate_total(&total("kenaikan_penurunan_neto_kas_dan_setara_kas", None), &inputs), d(200));
    }

    #[test]
    fn test_activity_cash_fallback() {
        let mut inputs = TotalInputs::default();
        inputs.group_sums.insert("aktivitas_investasi".to_string(), d(-80));
        assert_eq!(evaluate_total(&total("kas_neto_dari_aktivitas_investasi", None), &inputs), d(-80));

        inputs.group_sums.insert("kas_neto_dari_aktivitas_investasi".to_string(), d(-20));
        assert_eq!(evaluate_total(&total("kas_neto_dari_aktivitas_investasi", None), &inputs), d(-20));
    }

    #[test]
    fn test_unmatched_total_is_zero() {
        let inputs = TotalInputs::default();
        assert_eq!(evaluate_total(&total("jumlah_lainnya", Some("tidak_ada")), &inputs), d(0));
    }

    #[test]
    fn test_record_uses_raw_category_text() {
        let mut inputs = TotalInputs::default();
        let account = Account {
            id: "kas".to_string(),
            category: Some("Asset".to_string()),
            group: Some("kas_dan_setara_kas".to_string()),
            ..Default::default()
        };
        inputs.record(&account, d(700), Classification::of("Asset"));
        assert_eq!(inputs.category("Asset"), d(700));
        assert_eq!(inputs.category("asset"), d(0));
        assert_eq!(inputs.group("kas_dan_setara_kas"), d(700));
    }
}
