//! # Report Aggregation
//!
//! Pure aggregation passes for the reconciliation reports. The persistence
//! layer fetches the raw rows; everything in this module is deterministic
//! arithmetic over slices, testable without a database.
//!
//! ## The Fan-Out Problem
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │            One Sale, Three Lines, Three Joined Rows                     │
//! │                                                                         │
//! │  sales          sale_lines         joined result                       │
//! │  ─────          ──────────         ─────────────────────────────       │
//! │  S1 $550  ──┬── corte    $350      S1 $550 | corte    $350             │
//! │             ├── cera     $150      S1 $550 | cera     $150             │
//! │             └── peinado  $50       S1 $550 | peinado  $50              │
//! │                                                                         │
//! │  Header-keyed aggregates (daily revenue, register breakdown) must      │
//! │  count S1's $550 ONCE -> walk the rows through a seen-set that keeps   │
//! │  only the first row per sale id.                                       │
//! │                                                                         │
//! │  Line-keyed aggregates (top-N rankings) must count every row -> walk   │
//! │  the rows directly.                                                    │
//! │                                                                         │
//! │  The two kinds of pass NEVER share a loop. Mixing them is how a        │
//! │  report triples a day's revenue without anyone noticing.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::{Currency, Money};
use crate::types::{ItemKind, Loan, PaymentMethod, Stylist};
use crate::MIN_CHART_CEILING_CENTS;

// =============================================================================
// Input Rows
// =============================================================================

/// One row of the sale-header x sale-line x catalog join.
///
/// Header columns (totals, tender, stylist) repeat on every line of the same
/// sale - that is the fan-out the seen-set passes undo.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLineRow {
    pub sale_id: String,
    pub sold_at: DateTime<Utc>,
    pub stylist_id: String,
    pub total_mxn_cents: i64,
    pub total_usd_cents: i64,
    pub payment_method: PaymentMethod,
    pub tender_currency: Currency,
    /// Current catalog name of the line's item (for rankings).
    pub item_name: String,
    pub kind: ItemKind,
    pub quantity: i64,
    pub subtotal_cents: i64,
}

/// One internal-usage row with the item's unit cost joined in.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UsageCostRow {
    /// None means a general shop expense, deducted from nobody's payroll.
    pub stylist_id: Option<String>,
    pub quantity: i64,
    /// The item's purchase cost in MXN cents.
    pub unit_cost_cents: i64,
}

// =============================================================================
// Output Views
// =============================================================================

/// Revenue of one local calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub total: Money,
}

/// Summed tender for one (currency, payment method) drawer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTotal {
    pub currency: Currency,
    pub method: PaymentMethod,
    /// In the tender currency: MXN sales sum their MXN total, USD sales
    /// their USD total.
    pub amount: Money,
}

impl RegisterTotal {
    /// The drawer label the register UI shows, e.g. `"MXN - cash"`.
    pub fn label(&self) -> String {
        format!("{} - {}", self.currency, self.method)
    }
}

/// One stylist's settlement row.
///
/// Deductions are reported separately from net so the UI can show
/// "earned vs. owed" without re-deriving either side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollLine {
    pub stylist_id: String,
    pub stylist_name: String,
    /// Commission over service lines of this stylist's sales.
    pub commission: Money,
    /// Cost of product consumed at this stylist's chair.
    pub usage_cost: Money,
    /// Outstanding balance over the stylist's open loans.
    pub loan_balance: Money,
    /// usage_cost + loan_balance.
    pub deductions: Money,
    /// commission - deductions. Can be negative.
    pub net: Money,
}

/// One entry of a top-N ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedItem {
    pub name: String,
    pub total: Money,
    pub quantity: i64,
}

/// A product at or below its reorder threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LowStockAlert {
    pub item_id: String,
    pub name: String,
    pub current_stock: i64,
    pub minimum_stock: i64,
    /// Most recent restock, None when no purchase was ever recorded.
    pub last_restocked: Option<DateTime<Utc>>,
}

/// The five report views for one date range, each independently renderable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBundle {
    pub daily_revenue: Vec<DailyRevenue>,
    /// Scale denominator for the revenue bars.
    pub chart_ceiling: Money,
    pub register: Vec<RegisterTotal>,
    pub payroll: Vec<PayrollLine>,
    pub top_services: Vec<RankedItem>,
    pub top_products: Vec<RankedItem>,
    pub low_stock: Vec<LowStockAlert>,
}

// =============================================================================
// Deduplication
// =============================================================================

/// First-occurrence-wins reducer over the fan-out: yields exactly one row
/// per sale id, in input order.
///
/// Every header-keyed pass goes through here; no pass carries its own ad-hoc
/// seen-set.
fn dedup_by_sale<'a>(rows: &'a [SaleLineRow]) -> impl Iterator<Item = &'a SaleLineRow> + 'a {
    let mut seen: HashSet<&str> = HashSet::new();
    rows.iter().filter(move |row| seen.insert(row.sale_id.as_str()))
}

// =============================================================================
// Passes
// =============================================================================

/// Daily revenue series: deduplicated sales grouped by local calendar date,
/// MXN totals summed, ascending by date.
///
/// The business date is the stored UTC timestamp shifted into `offset` - a
/// late-evening sale belongs to the day the stylist worked it, not to the
/// UTC date it happened to land on.
pub fn daily_revenue(rows: &[SaleLineRow], offset: FixedOffset) -> Vec<DailyRevenue> {
    let mut by_date: BTreeMap<NaiveDate, i64> = BTreeMap::new();

    for row in dedup_by_sale(rows) {
        let date = row.sold_at.with_timezone(&offset).date_naive();
        *by_date.entry(date).or_insert(0) += row.total_mxn_cents;
    }

    by_date
        .into_iter()
        .map(|(date, cents)| DailyRevenue {
            date,
            total: Money::from_cents(cents),
        })
        .collect()
}

/// Scale denominator for the revenue bar display: the best day, floored at
/// 500.00 MXN so a single tiny day cannot produce a full-height bar.
pub fn chart_ceiling(series: &[DailyRevenue]) -> Money {
    series
        .iter()
        .map(|d| d.total)
        .fold(Money::from_cents(MIN_CHART_CEILING_CENTS), Money::max)
}

/// Cash-register breakdown: deduplicated sales grouped by
/// (tender currency, payment method), summed in the tender currency.
pub fn register_breakdown(rows: &[SaleLineRow]) -> Vec<RegisterTotal> {
    let mut by_drawer: BTreeMap<(Currency, PaymentMethod), i64> = BTreeMap::new();

    for row in dedup_by_sale(rows) {
        let amount = match row.tender_currency {
            Currency::Mxn => row.total_mxn_cents,
            Currency::Usd => row.total_usd_cents,
        };
        *by_drawer
            .entry((row.tender_currency, row.payment_method))
            .or_insert(0) += amount;
    }

    by_drawer
        .into_iter()
        .map(|((currency, method), cents)| RegisterTotal {
            currency,
            method,
            amount: Money::from_cents(cents),
        })
        .collect()
}

/// Payroll table: one line per active stylist.
///
/// ```text
/// commission   = commission rate x (summed service subtotals of own sales)
/// usage_cost   = sum of quantity x unit cost over own usage rows
/// loan_balance = sum of balances over own open loans
/// net          = commission - usage_cost - loan_balance
/// ```
///
/// Line-keyed on purpose: a sale's product lines earn no commission, so the
/// pass filters on line kind rather than deduplicating headers. The rate is
/// applied once to the summed subtotal, so at most one cent of rounding
/// enters each row.
pub fn payroll(
    stylists: &[Stylist],
    rows: &[SaleLineRow],
    usage: &[UsageCostRow],
    loans: &[Loan],
) -> Vec<PayrollLine> {
    stylists
        .iter()
        .filter(|s| s.is_active)
        .map(|stylist| {
            let service_subtotal: i64 = rows
                .iter()
                .filter(|r| r.stylist_id == stylist.id && r.kind == ItemKind::Service)
                .map(|r| r.subtotal_cents)
                .sum();
            let commission = stylist
                .commission_rate()
                .apply(Money::from_cents(service_subtotal));

            let usage_cost: i64 = usage
                .iter()
                .filter(|u| u.stylist_id.as_deref() == Some(stylist.id.as_str()))
                .map(|u| u.quantity * u.unit_cost_cents)
                .sum();
            let usage_cost = Money::from_cents(usage_cost);

            let loan_balance: i64 = loans
                .iter()
                .filter(|l| l.stylist_id == stylist.id && l.is_open())
                .map(|l| l.balance_cents)
                .sum();
            let loan_balance = Money::from_cents(loan_balance);

            let deductions = usage_cost + loan_balance;

            PayrollLine {
                stylist_id: stylist.id.clone(),
                stylist_name: stylist.name.clone(),
                commission,
                usage_cost,
                loan_balance,
                deductions,
                net: commission - deductions,
            }
        })
        .collect()
}

/// Top-N ranking for one item kind.
///
/// Uses EVERY joined row (no deduplication - this pass is keyed on the
/// line), grouped by item name, sorted descending by summed subtotal.
/// `sort_by` is stable, so ties keep first-appearance order.
pub fn top_items(rows: &[SaleLineRow], kind: ItemKind, n: usize) -> Vec<RankedItem> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut ranked: Vec<RankedItem> = Vec::new();

    for row in rows.iter().filter(|r| r.kind == kind) {
        match index.get(row.item_name.as_str()) {
            Some(&i) => {
                ranked[i].total += Money::from_cents(row.subtotal_cents);
                ranked[i].quantity += row.quantity;
            }
            None => {
                index.insert(row.item_name.as_str(), ranked.len());
                ranked.push(RankedItem {
                    name: row.item_name.clone(),
                    total: Money::from_cents(row.subtotal_cents),
                    quantity: row.quantity,
                });
            }
        }
    }

    ranked.sort_by(|a, b| b.total.cmp(&a.total));
    ranked.truncate(n);
    ranked
}

// =============================================================================
// Unit Tests
// =============================================================================
