//! # Report Service
//!
//! The fetch layer of the Reconciliation Aggregator. Pulls the raw rows for
//! a date range, hands them to the pure passes in `estela_core::reports`,
//! and degrades gracefully when a source is unavailable.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      reconcile(start, end)                              │
//! │                                                                         │
//! │  sale_lines ⋈ sales ⋈ catalog  ──► SaleLineRow (fan-out: one row       │
//! │                                     per LINE, header cols repeated)    │
//! │  internal_usage ⋈ catalog      ──► UsageCostRow                        │
//! │  loans (status <> 'paid')      ──► Loan                                │
//! │  stylists (active)             ──► Stylist                             │
//! │  catalog ⟕ purchases           ──► LowStockAlert                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  pure passes (estela-core)     ──► ReportBundle                        │
//! │                                                                         │
//! │  A failed fetch logs a warning and empties the views built from that   │
//! │  source; the other views still render.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use sqlx::SqlitePool;
use tracing::warn;

use crate::error::DbResult;
use estela_core::reports::{
    chart_ceiling, daily_revenue, payroll, register_breakdown, top_items, DailyRevenue,
    LowStockAlert, PayrollLine, RankedItem, RegisterTotal, ReportBundle, SaleLineRow, UsageCostRow,
};
use estela_core::types::{ItemKind, Loan, Stylist};
use estela_core::TOP_RANKING_SIZE;

/// Report retrieval over a closed date range [start, end], evaluated against
/// the sale's business date.
#[derive(Debug, Clone)]
pub struct ReportService {
    pool: SqlitePool,
    /// Offset used to turn stored UTC timestamps into business dates.
    offset: FixedOffset,
}

impl ReportService {
    /// Creates a report service grouping business dates in UTC.
    pub fn new(pool: SqlitePool) -> Self {
        ReportService {
            pool,
            offset: Utc.fix(),
        }
    }

    /// Sets the offset the salon's clock runs on, e.g. UTC-6 for CDMX.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    // =========================================================================
    // The five report views
    // =========================================================================

    /// Daily revenue series, ascending by business date.
    pub async fn daily_revenue(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<DailyRevenue>> {
        let rows = self.fetch_line_rows(start, end).await?;
        Ok(daily_revenue(&rows, self.offset))
    }

    /// Cash-register breakdown by (tender currency, payment method).
    pub async fn register_breakdown(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<RegisterTotal>> {
        let rows = self.fetch_line_rows(start, end).await?;
        Ok(register_breakdown(&rows))
    }

    /// Payroll table for the active roster.
    pub async fn payroll(&self, start: NaiveDate, end: NaiveDate) -> DbResult<Vec<PayrollLine>> {
        let rows = self.fetch_line_rows(start, end).await?;
        let stylists = self.fetch_active_stylists().await?;
        let usage = self.fetch_usage_rows(start, end).await?;
        let loans = self.fetch_open_loans().await?;
        Ok(payroll(&stylists, &rows, &usage, &loans))
    }

    /// Top-5 rankings as (services, products).
    pub async fn top_rankings(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<(Vec<RankedItem>, Vec<RankedItem>)> {
        let rows = self.fetch_line_rows(start, end).await?;
        Ok((
            top_items(&rows, ItemKind::Service, TOP_RANKING_SIZE),
            top_items(&rows, ItemKind::Product, TOP_RANKING_SIZE),
        ))
    }

    /// Products at or below their reorder threshold, with the date of the
    /// most recent restock attached.
    pub async fn low_stock(&self) -> DbResult<Vec<LowStockAlert>> {
        self.fetch_low_stock().await
    }

    /// Builds all five views in one pass over the sources.
    ///
    /// Never fails: a view whose source data cannot be fetched comes back
    /// empty, with a warning in the log, and the rest still render.
    pub async fn reconcile(&self, start: NaiveDate, end: NaiveDate) -> ReportBundle {
        let rows = self.fetch_line_rows(start, end).await;
        let stylists = self.fetch_active_stylists().await;
        let usage = self.fetch_usage_rows(start, end).await;
        let loans = self.fetch_open_loans().await;
        let low_stock = self.fetch_low_stock().await;

        // Payroll nets commission against deductions, so showing it with a
        // missing source would misstate what a stylist is owed. All four
        // sources or nothing.
        let payroll_table = match (&rows, &stylists, &usage, &loans) {
            (Ok(r), Ok(s), Ok(u), Ok(l)) => payroll(s, r, u, l),
            _ => {
                warn!("payroll sources unavailable, view degraded to empty");
                Vec::new()
            }
        };

        let rows = degraded(rows, "sale rows");
        let low_stock = degraded(low_stock, "low stock");

        let daily = daily_revenue(&rows, self.offset);

        ReportBundle {
            chart_ceiling: chart_ceiling(&daily),
            daily_revenue: daily,
            register: register_breakdown(&rows),
            payroll: payroll_table,
            top_services: top_items(&rows, ItemKind::Service, TOP_RANKING_SIZE),
            top_products: top_items(&rows, ItemKind::Product, TOP_RANKING_SIZE),
            low_stock,
        }
    }

    // =========================================================================
    // Source fetches
    // =========================================================================

    /// UTC instants covering the closed local-date range [start, end].
    fn bounds(&self, start: NaiveDate, end: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let shift = Duration::seconds(i64::from(self.offset.local_minus_utc()));
        let lo = start.and_time(NaiveTime::MIN) - shift;
        let hi = (end + Duration::days(1)).and_time(NaiveTime::MIN) - shift;
        (
            DateTime::from_naive_utc_and_offset(lo, Utc),
            DateTime::from_naive_utc_and_offset(hi, Utc),
        )
    }

    /// The fan-out join: one row per sale LINE with the header columns
    /// repeated. Ordered by sale time then line insertion, which is what
    /// keeps ranking ties stable.
    async fn fetch_line_rows(&self, start: NaiveDate, end: NaiveDate) -> DbResult<Vec<SaleLineRow>> {
        let (lo, hi) = self.bounds(start, end);

        let rows = sqlx::query_as::<_, SaleLineRow>(
            r#"
            SELECT
                s.id              AS sale_id,
                s.created_at      AS sold_at,
                s.stylist_id      AS stylist_id,
                s.total_mxn_cents AS total_mxn_cents,
                s.total_usd_cents AS total_usd_cents,
                s.payment_method  AS payment_method,
                s.tender_currency AS tender_currency,
                i.name            AS item_name,
                l.kind            AS kind,
                l.quantity        AS quantity,
                l.subtotal_cents  AS subtotal_cents
            FROM sale_lines l
            INNER JOIN sales s ON s.id = l.sale_id
            INNER JOIN catalog_items i ON i.id = l.item_id
            WHERE s.created_at >= ?1 AND s.created_at < ?2
            ORDER BY s.created_at, l.rowid
            "#,
        )
        .bind(lo)
        .bind(hi)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn fetch_usage_rows(&self, start: NaiveDate, end: NaiveDate) -> DbResult<Vec<UsageCostRow>> {
        let (lo, hi) = self.bounds(start, end);

        let rows = sqlx::query_as::<_, UsageCostRow>(
            r#"
            SELECT
                u.stylist_id          AS stylist_id,
                u.quantity            AS quantity,
                i.purchase_cost_cents AS unit_cost_cents
            FROM internal_usage u
            INNER JOIN catalog_items i ON i.id = u.item_id
            WHERE u.used_at >= ?1 AND u.used_at < ?2
            "#,
        )
        .bind(lo)
        .bind(hi)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn fetch_active_stylists(&self) -> DbResult<Vec<Stylist>> {
        let stylists = sqlx::query_as::<_, Stylist>(
            r#"
            SELECT id, name, commission_bps, is_active, created_at
            FROM stylists
            WHERE is_active = 1
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(stylists)
    }

    async fn fetch_open_loans(&self) -> DbResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT id, stylist_id, amount_cents, balance_cents,
                   due_date, status, notes, created_at
            FROM loans
            WHERE status <> 'paid'
            ORDER BY due_date
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    async fn fetch_low_stock(&self) -> DbResult<Vec<LowStockAlert>> {
        let alerts = sqlx::query_as::<_, LowStockAlert>(
            r#"
            SELECT
                i.id                          AS item_id,
                i.name                        AS name,
                COALESCE(i.current_stock, 0)  AS current_stock,
                COALESCE(i.minimum_stock, 0)  AS minimum_stock,
                MAX(p.purchased_at)           AS last_restocked
            FROM catalog_items i
            LEFT JOIN purchases p ON p.item_id = i.id
            WHERE i.kind = 'product'
              AND i.is_active = 1
              AND COALESCE(i.current_stock, 0) <= COALESCE(i.minimum_stock, 0)
            GROUP BY i.id
            ORDER BY i.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(alerts)
    }
}

/// Empties a failed fetch, keeping the error in the log.
fn degraded<T>(result: DbResult<Vec<T>>, source: &str) -> Vec<T> {
    match result {
        Ok(rows) => rows,
        Err(e) => {
            warn!(source = source, error = %e, "report source unavailable, degrading to empty");
            Vec::new()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use estela_core::money::{Currency, ExchangeRate, Money};
    use estela_core::types::{Appointment, AppointmentStatus, CatalogItem, PaymentMethod};
    use estela_core::{Checkout, PaymentDetails};

    fn rate() -> ExchangeRate {
        ExchangeRate::from_milli(18500).unwrap()
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn item(id: &str, name: &str, kind: ItemKind, price: i64, cost: i64, stock: Option<i64>) -> CatalogItem {
        let now = Utc::now();
        CatalogItem {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            sale_price_cents: price,
            purchase_cost_cents: cost,
            current_stock: stock,
            minimum_stock: stock.map(|_| 3),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Seeds a roster, catalog and one scheduled appointment.
    async fn seed(db: &Database) -> Appointment {
        let now = Utc::now();
        db.stylists()
            .insert(&Stylist {
                id: "sty1".to_string(),
                name: "Marisol".to_string(),
                commission_bps: 1000, // 10%
                is_active: true,
                created_at: now,
            })
            .await
            .unwrap();

        db.catalog()
            .insert(&item("svc1", "Tinte Completo", ItemKind::Service, 100_000, 0, None))
            .await
            .unwrap();
        db.catalog()
            .insert(&item("prod1", "Cera Mate", ItemKind::Product, 15000, 5000, Some(10)))
            .await
            .unwrap();

        let appointment = Appointment {
            id: "appt1".to_string(),
            stylist_id: "sty1".to_string(),
            client_id: "cli1".to_string(),
            service_id: "svc1".to_string(),
            booked_price_cents: None,
            status: AppointmentStatus::Scheduled,
            starts_at: now,
            created_at: now,
        };
        db.appointments().insert(&appointment).await.unwrap();
        appointment
    }

    fn cash_mxn(tendered_cents: i64) -> PaymentDetails {
        PaymentDetails {
            method: PaymentMethod::Cash,
            tendered: Money::from_cents(tendered_cents),
            tender_currency: Currency::Mxn,
            change_currency: Currency::Mxn,
        }
    }

    #[tokio::test]
    async fn test_round_trip_record_then_reconcile() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let appointment = seed(&db).await;
        let service = db.catalog().get_by_id("svc1").await.unwrap().unwrap();
        let product = db.catalog().get_by_id("prod1").await.unwrap().unwrap();

        // One sale: 1000.00 service + 2 x 150.00 product = 1300.00 MXN
        let mut checkout = Checkout::for_appointment(&appointment, &service);
        checkout.add_line(&product, 2, None).unwrap();
        let finalized = checkout.finalize(rate(), cash_mxn(130_000)).unwrap();
        db.sales().record(&finalized).await.unwrap();

        // One usage attributed to the stylist: 1 x cost 50.00
        db.inventory().record_usage("prod1", Some("sty1"), 1).await.unwrap();

        // One open loan: balance 100.00
        db.loans()
            .create("sty1", Money::from_cents(10000), NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(), None)
            .await
            .unwrap();

        let bundle = db.reports().reconcile(today(), today()).await;

        // Register breakdown reproduces the sale total exactly, once,
        // even though the sale fanned out into two joined rows.
        assert_eq!(bundle.register.len(), 1);
        assert_eq!(bundle.register[0].label(), "MXN - cash");
        assert_eq!(bundle.register[0].amount.cents(), 130_000);

        // Daily revenue counts the sale once too.
        assert_eq!(bundle.daily_revenue.len(), 1);
        assert_eq!(bundle.daily_revenue[0].total.cents(), 130_000);
        assert_eq!(bundle.chart_ceiling.cents(), 130_000);

        // Payroll: 10% of 1000.00 = 100.00 commission; deductions are the
        // 50.00 usage plus the 100.00 loan balance; net is -50.00.
        assert_eq!(bundle.payroll.len(), 1);
        let row = &bundle.payroll[0];
        assert_eq!(row.commission.cents(), 10000);
        assert_eq!(row.usage_cost.cents(), 5000);
        assert_eq!(row.loan_balance.cents(), 10000);
        assert_eq!(row.deductions.cents(), 15000);
        assert_eq!(row.net.cents(), -5000);

        // Rankings are line-keyed.
        assert_eq!(bundle.top_services.len(), 1);
        assert_eq!(bundle.top_services[0].name, "Tinte Completo");
        assert_eq!(bundle.top_services[0].total.cents(), 100_000);
        assert_eq!(bundle.top_products.len(), 1);
        assert_eq!(bundle.top_products[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_range_is_inclusive_and_filters_by_date() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let appointment = seed(&db).await;
        let service = db.catalog().get_by_id("svc1").await.unwrap().unwrap();

        let finalized = Checkout::for_appointment(&appointment, &service)
            .finalize(rate(), cash_mxn(100_000))
            .unwrap();
        db.sales().record(&finalized).await.unwrap();

        // Today's sale is inside [today, today] ...
        let series = db.reports().daily_revenue(today(), today()).await.unwrap();
        assert_eq!(series.len(), 1);

        // ... and outside a window that ended yesterday.
        let yesterday = today() - Duration::days(1);
        let series = db
            .reports()
            .daily_revenue(yesterday - Duration::days(6), yesterday)
            .await
            .unwrap();
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn test_low_stock_attaches_last_restock_date() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();

        // At the threshold (flagged, restocked), below it (flagged, never
        // restocked), and comfortably above it (not flagged).
        db.catalog()
            .insert(&item("p1", "Ampolleta", ItemKind::Product, 9000, 4000, Some(3)))
            .await
            .unwrap();
        db.catalog()
            .insert(&item("p2", "Peroxido", ItemKind::Product, 7000, 2500, Some(1)))
            .await
            .unwrap();
        db.catalog()
            .insert(&item("p3", "Shampoo", ItemKind::Product, 28000, 11000, Some(20)))
            .await
            .unwrap();

        db.inventory()
            .record_purchase("p1", 3, Money::from_cents(4000))
            .await
            .unwrap();
        // p1 now sits at 6; pull it back to the threshold via usage
        db.inventory().record_usage("p1", None, 3).await.unwrap();

        let alerts = db.reports().low_stock().await.unwrap();
        assert_eq!(alerts.len(), 2);

        let p1 = alerts.iter().find(|a| a.item_id == "p1").unwrap();
        assert_eq!(p1.current_stock, 3);
        assert!(p1.last_restocked.is_some());
        assert!(p1.last_restocked.unwrap() >= now - Duration::seconds(60));

        let p2 = alerts.iter().find(|a| a.item_id == "p2").unwrap();
        assert!(p2.last_restocked.is_none());
    }

    #[tokio::test]
    async fn test_reconcile_degrades_views_independently() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let appointment = seed(&db).await;
        let service = db.catalog().get_by_id("svc1").await.unwrap().unwrap();

        let finalized = Checkout::for_appointment(&appointment, &service)
            .finalize(rate(), cash_mxn(100_000))
            .unwrap();
        db.sales().record(&finalized).await.unwrap();

        // Take the loans source away entirely.
        sqlx::query("DROP TABLE loans").execute(db.pool()).await.unwrap();

        let bundle = db.reports().reconcile(today(), today()).await;

        // Payroll lost a source and degrades to empty ...
        assert!(bundle.payroll.is_empty());
        // ... while the revenue views still render.
        assert_eq!(bundle.daily_revenue.len(), 1);
        assert_eq!(bundle.register.len(), 1);
        assert_eq!(bundle.top_services.len(), 1);
    }
}
