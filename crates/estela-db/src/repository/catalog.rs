//! # Catalog Repository
//!
//! Lookups over the service/product catalog, plus the one mutation this
//! engine owns: stock deltas.
//!
//! ## Stock Update Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ❌ WRONG: client-computed read-modify-write (lost updates)            │
//! │     let stock = SELECT current_stock ...;                              │
//! │     UPDATE catalog_items SET current_stock = {stock - 3}               │
//! │                                                                         │
//! │  ✅ CORRECT: SQL-side delta                                            │
//! │     UPDATE catalog_items SET current_stock = current_stock - 3         │
//! │                                                                         │
//! │  Two registers selling the same product concurrently both land their   │
//! │  decrement; with read-modify-write one of them silently vanishes.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use estela_core::validation::{validate_name, validate_price_cents};
use estela_core::{CatalogItem, CoreError, ItemKind};

/// Repository for catalog lookups and stock corrections.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Gets a catalog item by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CatalogItem>> {
        let item = sqlx::query_as::<_, CatalogItem>(
            r#"
            SELECT id, name, kind, sale_price_cents, purchase_cost_cents,
                   current_stock, minimum_stock, is_active, created_at, updated_at
            FROM catalog_items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists active items, ordered by name.
    pub async fn list_active(&self) -> DbResult<Vec<CatalogItem>> {
        let items = sqlx::query_as::<_, CatalogItem>(
            r#"
            SELECT id, name, kind, sale_price_cents, purchase_cost_cents,
                   current_stock, minimum_stock, is_active, created_at, updated_at
            FROM catalog_items
            WHERE is_active = 1
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists active items of one kind, ordered by name.
    ///
    /// The register shows services and products on separate tabs.
    pub async fn list_by_kind(&self, kind: ItemKind) -> DbResult<Vec<CatalogItem>> {
        let items = sqlx::query_as::<_, CatalogItem>(
            r#"
            SELECT id, name, kind, sale_price_cents, purchase_cost_cents,
                   current_stock, minimum_stock, is_active, created_at, updated_at
            FROM catalog_items
            WHERE is_active = 1 AND kind = ?1
            ORDER BY name
            "#,
        )
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Inserts a catalog item.
    ///
    /// The catalog is owned by the directory collaborator; this is the feed
    /// surface it (and the seed tooling) writes through. Validation runs
    /// before the write.
    pub async fn insert(&self, item: &CatalogItem) -> DbResult<()> {
        validate_name(&item.name).map_err(CoreError::from)?;
        validate_price_cents(item.sale_price_cents).map_err(CoreError::from)?;
        validate_price_cents(item.purchase_cost_cents).map_err(CoreError::from)?;

        debug!(id = %item.id, name = %item.name, "Inserting catalog item");

        sqlx::query(
            r#"
            INSERT INTO catalog_items (
                id, name, kind, sale_price_cents, purchase_cost_cents,
                current_stock, minimum_stock, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(item.kind)
        .bind(item.sale_price_cents)
        .bind(item.purchase_cost_cents)
        .bind(item.current_stock)
        .bind(item.minimum_stock)
        .bind(item.is_active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Applies a stock delta (negative for consumption, positive for
    /// corrections), evaluated server-side.
    ///
    /// The guarded flows live elsewhere: sale recording decrements inside
    /// its transaction, internal usage blocks on insufficient stock. This
    /// is the unguarded correction surface for stock counts.
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<()> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE catalog_items
            SET current_stock = COALESCE(current_stock, 0) + ?2,
                updated_at = ?3
            WHERE id = ?1 AND kind = 'product'
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}

/// Helper to generate a new catalog item ID.
pub fn generate_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn item(id: &str, name: &str, kind: ItemKind) -> CatalogItem {
        let now = Utc::now();
        CatalogItem {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            sale_price_cents: 35000,
            purchase_cost_cents: 12000,
            current_stock: matches!(kind, ItemKind::Product).then_some(10),
            minimum_stock: matches!(kind, ItemKind::Product).then_some(3),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();

        repo.insert(&item("i1", "Corte Dama", ItemKind::Service)).await.unwrap();
        repo.insert(&item("i2", "Cera Mate", ItemKind::Product)).await.unwrap();

        let found = repo.get_by_id("i1").await.unwrap().unwrap();
        assert_eq!(found.name, "Corte Dama");
        assert_eq!(found.kind, ItemKind::Service);
        assert!(found.current_stock.is_none());

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_listings_are_ordered_by_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();

        repo.insert(&item("i1", "Tinte", ItemKind::Service)).await.unwrap();
        repo.insert(&item("i2", "Corte", ItemKind::Service)).await.unwrap();
        repo.insert(&item("i3", "Cera", ItemKind::Product)).await.unwrap();

        let all = repo.list_active().await.unwrap();
        let names: Vec<&str> = all.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Cera", "Corte", "Tinte"]);

        let services = repo.list_by_kind(ItemKind::Service).await.unwrap();
        assert_eq!(services.len(), 2);
    }

    #[tokio::test]
    async fn test_insert_validates_before_writing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();

        let mut bad = item("i1", "", ItemKind::Service);
        assert!(repo.insert(&bad).await.is_err());

        bad.name = "Corte".to_string();
        bad.sale_price_cents = -100;
        assert!(repo.insert(&bad).await.is_err());

        assert!(repo.get_by_id("i1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_adjust_stock_is_a_delta() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();

        repo.insert(&item("i1", "Cera", ItemKind::Product)).await.unwrap();

        repo.adjust_stock("i1", -3).await.unwrap();
        repo.adjust_stock("i1", 5).await.unwrap();

        let found = repo.get_by_id("i1").await.unwrap().unwrap();
        assert_eq!(found.current_stock, Some(12));

        assert!(matches!(
            repo.adjust_stock("missing", 1).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
