//! # Inventory Movements Repository
//!
//! The two stock movements that happen outside a sale:
//!
//! - **Internal usage**: product consumed at a chair or by the shop.
//!   Decrements stock and must BLOCK when the shelf doesn't hold enough -
//!   consumption is requested before it happens, so there is no excuse for
//!   a negative count here.
//! - **Purchases**: restock deliveries. Append-only history, increments
//!   stock.
//!
//! Both run as one transaction (movement row + stock delta), and both move
//! the counter with SQL-side arithmetic, never a client-computed value.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use estela_core::money::Money;
use estela_core::types::{InternalUsage, Purchase};
use estela_core::validation::validate_quantity;
use estela_core::CoreError;

/// Repository for stock movements outside the sale flow.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Records internal consumption of a product.
    ///
    /// ## Arguments
    /// * `item_id` - the product consumed
    /// * `stylist_id` - whose payroll carries the cost; None for a general
    ///   shop expense
    /// * `quantity` - units consumed
    ///
    /// ## Errors
    /// - `Validation` on a non-positive quantity
    /// - `InsufficientStock` when the shelf holds less than requested -
    ///   the operation is blocked and NOTHING is written
    /// - `NotFound` when the item does not exist
    pub async fn record_usage(
        &self,
        item_id: &str,
        stylist_id: Option<&str>,
        quantity: i64,
    ) -> DbResult<InternalUsage> {
        validate_quantity(quantity).map_err(CoreError::from)?;

        let usage = InternalUsage {
            id: Uuid::new_v4().to_string(),
            item_id: item_id.to_string(),
            stylist_id: stylist_id.map(str::to_string),
            quantity,
            used_at: Utc::now(),
        };

        debug!(item_id = %item_id, quantity = %quantity, "Recording internal usage");

        let mut tx = self.pool.begin().await?;

        // Guarded decrement: only fires when enough stock is on the shelf,
        // so the check and the write are one atomic statement.
        let updated = sqlx::query(
            r#"
            UPDATE catalog_items
            SET current_stock = current_stock - ?2,
                updated_at = ?3
            WHERE id = ?1
              AND kind = 'product'
              AND COALESCE(current_stock, 0) >= ?2
            "#,
        )
        .bind(item_id)
        .bind(quantity)
        .bind(usage.used_at)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let shelf = sqlx::query_as::<_, (String, i64)>(
                r#"
                SELECT name, COALESCE(current_stock, 0)
                FROM catalog_items
                WHERE id = ?1
                "#,
            )
            .bind(item_id)
            .fetch_optional(&mut *tx)
            .await?;

            return match shelf {
                None => Err(DbError::not_found("Catalog item", item_id)),
                Some((name, available)) => Err(CoreError::InsufficientStock {
                    item: name,
                    available,
                    requested: quantity,
                }
                .into()),
            };
        }

        sqlx::query(
            r#"
            INSERT INTO internal_usage (id, item_id, stylist_id, quantity, used_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&usage.id)
        .bind(&usage.item_id)
        .bind(&usage.stylist_id)
        .bind(usage.quantity)
        .bind(usage.used_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(item_id = %item_id, quantity = %quantity, "Internal usage recorded");
        Ok(usage)
    }

    /// Records a restock purchase and increments the shelf count.
    ///
    /// ## Errors
    /// - `Validation` on a non-positive quantity
    /// - `InvalidAmount` on a negative unit cost
    /// - `NotFound` when the item does not exist or is not a product
    pub async fn record_purchase(
        &self,
        item_id: &str,
        quantity: i64,
        unit_cost: Money,
    ) -> DbResult<Purchase> {
        validate_quantity(quantity).map_err(CoreError::from)?;
        if unit_cost.is_negative() {
            return Err(CoreError::InvalidAmount {
                cents: unit_cost.cents(),
            }
            .into());
        }

        let purchase = Purchase {
            id: Uuid::new_v4().to_string(),
            item_id: item_id.to_string(),
            quantity,
            unit_cost_cents: unit_cost.cents(),
            purchased_at: Utc::now(),
        };

        debug!(item_id = %item_id, quantity = %quantity, "Recording purchase");

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE catalog_items
            SET current_stock = COALESCE(current_stock, 0) + ?2,
                updated_at = ?3
            WHERE id = ?1 AND kind = 'product'
            "#,
        )
        .bind(item_id)
        .bind(quantity)
        .bind(purchase.purchased_at)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::not_found("Product", item_id));
        }

        sqlx::query(
            r#"
            INSERT INTO purchases (id, item_id, quantity, unit_cost_cents, purchased_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.item_id)
        .bind(purchase.quantity)
        .bind(purchase.unit_cost_cents)
        .bind(purchase.purchased_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(item_id = %item_id, quantity = %quantity, "Purchase recorded");
        Ok(purchase)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
