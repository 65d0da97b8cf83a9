//! # Loan Repository
//!
//! Staff loans ("vales") and their repayments.
//!
//! ## Payment Application
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A payment is ONE guarded UPDATE, evaluated server-side:                │
//! │                                                                         │
//! │    balance = MAX(balance - payment, 0)      -- clamped at zero          │
//! │    status  = CASE                                                       │
//! │                WHEN balance - payment <= 0      THEN 'paid'             │
//! │                WHEN balance - payment <  amount THEN 'partial'          │
//! │                ELSE 'pending'                                           │
//! │              END                                                        │
//! │                                                                         │
//! │  No read-modify-write: two clerks recording payments on the same vale  │
//! │  concurrently both land, and the balance can only ever move down.      │
//! │  Status stays a pure function of (balance, amount) because both are    │
//! │  recomputed in the same statement.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use estela_core::money::Money;
use estela_core::types::{Loan, LoanStatus};
use estela_core::CoreError;

/// Repository for loan persistence and payment application.
#[derive(Debug, Clone)]
pub struct LoanRepository {
    pool: SqlitePool,
}

impl LoanRepository {
    /// Creates a new LoanRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LoanRepository { pool }
    }

    /// Creates a loan: balance starts equal to the amount, status Pending.
    ///
    /// ## Errors
    /// `InvalidAmount` when the amount is zero or negative.
    pub async fn create(
        &self,
        stylist_id: &str,
        amount: Money,
        due_date: NaiveDate,
        notes: Option<String>,
    ) -> DbResult<Loan> {
        if !amount.is_positive() {
            return Err(CoreError::InvalidAmount {
                cents: amount.cents(),
            }
            .into());
        }

        let loan = Loan {
            id: Uuid::new_v4().to_string(),
            stylist_id: stylist_id.to_string(),
            amount_cents: amount.cents(),
            balance_cents: amount.cents(),
            due_date,
            status: LoanStatus::Pending,
            notes,
            created_at: Utc::now(),
        };

        debug!(id = %loan.id, stylist_id = %stylist_id, amount = %amount, "Creating loan");

        sqlx::query(
            r#"
            INSERT INTO loans (
                id, stylist_id, amount_cents, balance_cents,
                due_date, status, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&loan.id)
        .bind(&loan.stylist_id)
        .bind(loan.amount_cents)
        .bind(loan.balance_cents)
        .bind(loan.due_date)
        .bind(loan.status)
        .bind(&loan.notes)
        .bind(loan.created_at)
        .execute(&self.pool)
        .await?;

        Ok(loan)
    }

    /// Applies a payment and returns the updated loan.
    ///
    /// The balance is clamped at zero (over-payment settles the vale, it
    /// does not create credit) and the status is recomputed in the same
    /// statement.
    ///
    /// ## Errors
    /// - `InvalidAmount` when the payment is zero or negative
    /// - `NotFound` when the loan does not exist
    pub async fn record_payment(&self, loan_id: &str, amount: Money) -> DbResult<Loan> {
        if !amount.is_positive() {
            return Err(CoreError::InvalidAmount {
                cents: amount.cents(),
            }
            .into());
        }

        debug!(loan_id = %loan_id, amount = %amount, "Recording loan payment");

        let cents = amount.cents();
        let result = sqlx::query(
            r#"
            UPDATE loans SET
                balance_cents = MAX(balance_cents - ?2, 0),
                status = CASE
                    WHEN balance_cents - ?2 <= 0 THEN 'paid'
                    WHEN balance_cents - ?2 < amount_cents THEN 'partial'
                    ELSE 'pending'
                END
            WHERE id = ?1
            "#,
        )
        .bind(loan_id)
        .bind(cents)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Loan", loan_id));
        }

        let loan = self
            .get_by_id(loan_id)
            .await?
            .ok_or_else(|| DbError::not_found("Loan", loan_id))?;

        info!(
            loan_id = %loan_id,
            balance = %loan.balance(),
            status = ?loan.status,
            "Loan payment applied"
        );

        Ok(loan)
    }

    /// Gets a loan by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            SELECT id, stylist_id, amount_cents, balance_cents,
                   due_date, status, notes, created_at
            FROM loans
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(loan)
    }

    /// Lists loans with an outstanding balance, earliest due date first.
    pub async fn list_open(&self) -> DbResult<Vec<Loan>> {
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

    /// Lists every loan of one stylist, earliest due date first.
    pub async fn list_for_stylist(&self, stylist_id: &str) -> DbResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT id, stylist_id, amount_cents, balance_cents,
                   due_date, status, notes, created_at
            FROM loans
            WHERE stylist_id = ?1
            ORDER BY due_date
            "#,
        )
        .bind(stylist_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use estela_core::types::Stylist;

    async fn db_with_stylist() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.stylists()
            .insert(&Stylist {
                id: "sty1".to_string(),
                name: "Marisol".to_string(),
                commission_bps: 3500,
                is_active: true,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        db
    }

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()
    }

    #[tokio::test]
    async fn test_create_starts_pending_with_full_balance() {
        let db = db_with_stylist().await;
        let loan = db
            .loans()
            .create("sty1", Money::from_cents(20000), due(), None)
            .await
            .unwrap();

        assert_eq!(loan.balance_cents, 20000);
        assert_eq!(loan.status, LoanStatus::Pending);

        let err = db
            .loans()
            .create("sty1", Money::zero(), due(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InvalidAmount { cents: 0 })
        ));
    }

    #[tokio::test]
    async fn test_partial_payment_moves_to_partial() {
        let db = db_with_stylist().await;
        let loan = db
            .loans()
            .create("sty1", Money::from_cents(20000), due(), None)
            .await
            .unwrap();

        // 200.00 owed, 50.00 paid -> 150.00 partial
        let updated = db
            .loans()
            .record_payment(&loan.id, Money::from_cents(5000))
            .await
            .unwrap();
        assert_eq!(updated.balance_cents, 15000);
        assert_eq!(updated.status, LoanStatus::Partial);
    }

    #[tokio::test]
    async fn test_full_payment_moves_to_paid() {
        let db = db_with_stylist().await;
        let loan = db
            .loans()
            .create("sty1", Money::from_cents(20000), due(), None)
            .await
            .unwrap();

        let updated = db
            .loans()
            .record_payment(&loan.id, Money::from_cents(20000))
            .await
            .unwrap();
        assert_eq!(updated.balance_cents, 0);
        assert_eq!(updated.status, LoanStatus::Paid);
    }

    #[tokio::test]
    async fn test_over_payment_clamps_at_zero() {
        let db = db_with_stylist().await;
        let loan = db
            .loans()
            .create("sty1", Money::from_cents(20000), due(), None)
            .await
            .unwrap();

        let updated = db
            .loans()
            .record_payment(&loan.id, Money::from_cents(50000))
            .await
            .unwrap();
        assert_eq!(updated.balance_cents, 0);
        assert_eq!(updated.status, LoanStatus::Paid);
    }

    #[tokio::test]
    async fn test_balance_never_increases_across_payments() {
        let db = db_with_stylist().await;
        let loan = db
            .loans()
            .create("sty1", Money::from_cents(20000), due(), None)
            .await
            .unwrap();

        let mut last = loan.balance_cents;
        for payment in [3000, 3000, 9000, 9000] {
            let updated = db
                .loans()
                .record_payment(&loan.id, Money::from_cents(payment))
                .await
                .unwrap();
            assert!(updated.balance_cents <= last);
            assert!(updated.balance_cents >= 0);
            assert_eq!(
                updated.status,
                LoanStatus::from_balance(updated.balance_cents, updated.amount_cents)
            );
            last = updated.balance_cents;
        }
        assert_eq!(last, 0);
    }

    #[tokio::test]
    async fn test_payment_rejections() {
        let db = db_with_stylist().await;
        let loan = db
            .loans()
            .create("sty1", Money::from_cents(20000), due(), None)
            .await
            .unwrap();

        assert!(matches!(
            db.loans().record_payment(&loan.id, Money::from_cents(-100)).await,
            Err(DbError::Domain(CoreError::InvalidAmount { .. }))
        ));
        assert!(matches!(
            db.loans().record_payment("ghost", Money::from_cents(100)).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_open_excludes_paid() {
        let db = db_with_stylist().await;
        let a = db
            .loans()
            .create("sty1", Money::from_cents(10000), due(), None)
            .await
            .unwrap();
        db.loans()
            .create("sty1", Money::from_cents(5000), due(), Some("tinte".to_string()))
            .await
            .unwrap();

        db.loans()
            .record_payment(&a.id, Money::from_cents(10000))
            .await
            .unwrap();

        let open = db.loans().list_open().await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].amount_cents, 5000);

        let all = db.loans().list_for_stylist("sty1").await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
