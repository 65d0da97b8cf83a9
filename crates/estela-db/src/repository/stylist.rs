//! # Stylist Repository
//!
//! Read surface over the staff roster. The directory collaborator owns the
//! records; the engine reads them for commission rates and the active flag.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use estela_core::validation::{validate_commission_bps, validate_name};
use estela_core::{CoreError, Stylist};

/// Repository for stylist roster lookups.
#[derive(Debug, Clone)]
pub struct StylistRepository {
    pool: SqlitePool,
}

impl StylistRepository {
    /// Creates a new StylistRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StylistRepository { pool }
    }

    /// Gets a stylist by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Stylist>> {
        let stylist = sqlx::query_as::<_, Stylist>(
            r#"
            SELECT id, name, commission_bps, is_active, created_at
            FROM stylists
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stylist)
    }

    /// Lists active stylists, ordered by name.
    pub async fn list_active(&self) -> DbResult<Vec<Stylist>> {
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

    /// Inserts a stylist (the directory's feed surface).
    ///
    /// Validation runs before the write: commission must sit in 0-100%.
    pub async fn insert(&self, stylist: &Stylist) -> DbResult<()> {
        validate_name(&stylist.name).map_err(CoreError::from)?;
        validate_commission_bps(stylist.commission_bps).map_err(CoreError::from)?;

        debug!(id = %stylist.id, name = %stylist.name, "Inserting stylist");

        sqlx::query(
            r#"
            INSERT INTO stylists (id, name, commission_bps, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&stylist.id)
        .bind(&stylist.name)
        .bind(stylist.commission_bps)
        .bind(stylist.is_active)
        .bind(stylist.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;

    fn stylist(id: &str, name: &str, active: bool) -> Stylist {
        Stylist {
            id: id.to_string(),
            name: name.to_string(),
            commission_bps: 3500,
            is_active: active,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_list_active_filters_and_orders() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.stylists();

        repo.insert(&stylist("s1", "Marisol", true)).await.unwrap();
        repo.insert(&stylist("s2", "Alicia", true)).await.unwrap();
        repo.insert(&stylist("s3", "Retired", false)).await.unwrap();

        let active = repo.list_active().await.unwrap();
        let names: Vec<&str> = active.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Alicia", "Marisol"]);

        let found = repo.get_by_id("s1").await.unwrap().unwrap();
        assert_eq!(found.commission_bps, 3500);
    }

    #[tokio::test]
    async fn test_insert_rejects_impossible_commission() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut bad = stylist("s1", "Marisol", true);
        bad.commission_bps = 10001; // over 100%
        assert!(db.stylists().insert(&bad).await.is_err());
        assert!(db.stylists().get_by_id("s1").await.unwrap().is_none());
    }
}
