//! # Sale Repository - the Transaction Recorder
//!
//! Persists a finalized checkout as ONE logical unit.
//!
//! ## The All-or-Nothing Unit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              record(FinalizedSale) - one transaction                    │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   1. INSERT sale header                                                │
//! │   2. INSERT every sale line                                            │
//! │   3. for each product line:                                            │
//! │        UPDATE catalog_items                                            │
//! │        SET current_stock = current_stock - quantity   (SQL-side delta) │
//! │   4. UPDATE appointments SET status = 'settled'                        │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any step failing rolls ALL of it back and surfaces RecordingFailed.   │
//! │  This is the one place in the system where multiple entities must      │
//! │  change together: a sale without its stock decrement, or a settled     │
//! │  appointment without its sale, silently corrupts every report          │
//! │  downstream.                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use estela_core::{FinalizedSale, ItemKind, Sale, SaleLine};

/// Repository for sale persistence and lookups.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Records a finalized checkout: sale header, lines, stock decrements
    /// and the appointment settle, atomically.
    ///
    /// ## Errors
    /// `RecordingFailed` when any step fails - nothing is written in that
    /// case, so the whole recording is safely retryable.
    ///
    /// ## Returns
    /// The persisted [`Sale`] header.
    pub async fn record(&self, finalized: &FinalizedSale) -> DbResult<Sale> {
        let sale_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(sale_id = %sale_id, appointment_id = %finalized.appointment_id, "Recording sale");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::RecordingFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, appointment_id, stylist_id,
                total_mxn_cents, total_usd_cents,
                payment_method, tender_currency, change_currency,
                tendered_cents, change_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&sale_id)
        .bind(&finalized.appointment_id)
        .bind(&finalized.stylist_id)
        .bind(finalized.total_mxn.cents())
        .bind(finalized.total_usd.cents())
        .bind(finalized.payment_method)
        .bind(finalized.tender_currency)
        .bind(finalized.change_currency)
        .bind(finalized.tendered.cents())
        .bind(finalized.change.cents())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::RecordingFailed(e.to_string()))?;

        for line in &finalized.lines {
            sqlx::query(
                r#"
                INSERT INTO sale_lines (
                    id, sale_id, item_id, quantity,
                    unit_price_cents, subtotal_cents, kind
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&sale_id)
            .bind(&line.item_id)
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .bind(line.subtotal_cents())
            .bind(line.kind)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::RecordingFailed(e.to_string()))?;

            // Products leave the shelf with the sale. The delta is evaluated
            // server-side and may drive the count negative - the goods are
            // already gone, a miscounted shelf is an inventory problem, not
            // a reason to lose the financial record.
            if line.kind == ItemKind::Product {
                let updated = sqlx::query(
                    r#"
                    UPDATE catalog_items
                    SET current_stock = COALESCE(current_stock, 0) - ?2,
                        updated_at = ?3
                    WHERE id = ?1
                    "#,
                )
                .bind(&line.item_id)
                .bind(line.quantity)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(|e| DbError::RecordingFailed(e.to_string()))?;

                if updated.rows_affected() == 0 {
                    return Err(DbError::RecordingFailed(format!(
                        "catalog item {} no longer exists",
                        line.item_id
                    )));
                }
            }
        }

        // Settle the appointment. Guarding on the current status makes a
        // double submission of the same checkout fail instead of writing a
        // second sale against an already-settled appointment.
        let settled = sqlx::query(
            r#"
            UPDATE appointments
            SET status = 'settled'
            WHERE id = ?1 AND status = 'scheduled'
            "#,
        )
        .bind(&finalized.appointment_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::RecordingFailed(e.to_string()))?;

        if settled.rows_affected() == 0 {
            return Err(DbError::RecordingFailed(format!(
                "appointment {} is missing or already settled",
                finalized.appointment_id
            )));
        }

        tx.commit()
            .await
            .map_err(|e| DbError::RecordingFailed(e.to_string()))?;

        info!(
            sale_id = %sale_id,
            total = %finalized.total_mxn,
            lines = finalized.lines.len(),
            "Sale recorded"
        );

        Ok(Sale {
            id: sale_id,
            appointment_id: Some(finalized.appointment_id.clone()),
            stylist_id: finalized.stylist_id.clone(),
            total_mxn_cents: finalized.total_mxn.cents(),
            total_usd_cents: finalized.total_usd.cents(),
            payment_method: finalized.payment_method,
            tender_currency: finalized.tender_currency,
            change_currency: finalized.change_currency,
            tendered_cents: finalized.tendered.cents(),
            change_cents: finalized.change.cents(),
            created_at: now,
        })
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, appointment_id, stylist_id,
                   total_mxn_cents, total_usd_cents,
                   payment_method, tender_currency, change_currency,
                   tendered_cents, change_cents, created_at
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets all lines of a sale, in insertion order.
    pub async fn lines_for(&self, sale_id: &str) -> DbResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<_, SaleLine>(
            r#"
            SELECT id, sale_id, item_id, quantity,
                   unit_price_cents, subtotal_cents, kind
            FROM sale_lines
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
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
    use estela_core::types::{Appointment, AppointmentStatus, CatalogItem, PaymentMethod, Stylist};
    use estela_core::{Checkout, PaymentDetails};

    fn rate() -> ExchangeRate {
        ExchangeRate::from_milli(18500).unwrap()
    }

    async fn seed(db: &Database) -> (Appointment, CatalogItem, CatalogItem) {
        let now = Utc::now();

        db.stylists()
            .insert(&Stylist {
                id: "sty1".to_string(),
                name: "Marisol".to_string(),
                commission_bps: 3500,
                is_active: true,
                created_at: now,
            })
            .await
            .unwrap();

        let service = CatalogItem {
            id: "svc1".to_string(),
            name: "Corte Dama".to_string(),
            kind: ItemKind::Service,
            sale_price_cents: 35000,
            purchase_cost_cents: 0,
            current_stock: None,
            minimum_stock: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.catalog().insert(&service).await.unwrap();

        let product = CatalogItem {
            id: "prod1".to_string(),
            name: "Cera Mate".to_string(),
            kind: ItemKind::Product,
            sale_price_cents: 15000,
            purchase_cost_cents: 7000,
            current_stock: Some(10),
            minimum_stock: Some(3),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.catalog().insert(&product).await.unwrap();

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

        (appointment, service, product)
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
    async fn test_record_writes_header_lines_stock_and_settle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (appointment, service, product) = seed(&db).await;

        let mut checkout = Checkout::for_appointment(&appointment, &service);
        checkout.add_line(&product, 2, None).unwrap();
        let finalized = checkout.finalize(rate(), cash_mxn(70000)).unwrap();

        let sale = db.sales().record(&finalized).await.unwrap();

        // Header round-trips
        let stored = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(stored.total_mxn_cents, 35000 + 30000);
        assert_eq!(stored.change_cents, 70000 - 65000);

        // Lines sum to the header total
        let lines = db.sales().lines_for(&sale.id).await.unwrap();
        assert_eq!(lines.len(), 2);
        let sum: i64 = lines.iter().map(|l| l.subtotal_cents).sum();
        assert_eq!(sum, stored.total_mxn_cents);

        // Product stock decremented by quantity, service untouched
        let restocked = db.catalog().get_by_id("prod1").await.unwrap().unwrap();
        assert_eq!(restocked.current_stock, Some(8));

        // Appointment settled
        let settled = db.appointments().get_by_id("appt1").await.unwrap().unwrap();
        assert_eq!(settled.status, AppointmentStatus::Settled);
    }

    #[tokio::test]
    async fn test_record_failure_leaves_nothing_behind() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (appointment, service, _product) = seed(&db).await;

        let mut checkout = Checkout::for_appointment(&appointment, &service);
        checkout.add_line(&service, 1, None).unwrap();
        let mut finalized = checkout.finalize(rate(), cash_mxn(70000)).unwrap();

        // Poison one line with a dangling item reference
        finalized.lines[1].item_id = "ghost".to_string();

        let err = db.sales().record(&finalized).await.unwrap_err();
        assert!(matches!(err, DbError::RecordingFailed(_)));

        // No sale header survived the rollback
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);

        // Appointment still awaits checkout
        let appt = db.appointments().get_by_id("appt1").await.unwrap().unwrap();
        assert_eq!(appt.status, AppointmentStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_recording_the_same_appointment_twice_fails() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (appointment, service, _product) = seed(&db).await;

        let finalized = Checkout::for_appointment(&appointment, &service)
            .finalize(rate(), cash_mxn(35000))
            .unwrap();

        db.sales().record(&finalized).await.unwrap();
        let err = db.sales().record(&finalized).await.unwrap_err();
        assert!(matches!(err, DbError::RecordingFailed(_)));

        // Exactly one sale exists
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
