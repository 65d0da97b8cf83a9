//! # Settings Repository
//!
//! Key/value configuration. The one value the engine cares about is the
//! exchange rate: it is read into an explicit [`ExchangeRate`] and passed
//! into computations as an argument - there is no ambient global rate
//! anywhere in the codebase, which is what lets tests vary it freely.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use estela_core::money::ExchangeRate;

/// The settings key holding the exchange rate in milli-units.
pub const EXCHANGE_RATE_KEY: &str = "exchange_rate_milli";

/// Repository for configuration values.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Reads the configured exchange rate.
    ///
    /// ## Errors
    /// - `NotFound` when the setting row is missing
    /// - `Internal` when the stored value is not an integer
    /// - `InvalidRate` when a non-positive rate was stored
    pub async fn exchange_rate(&self) -> DbResult<ExchangeRate> {
        let value = self
            .get(EXCHANGE_RATE_KEY)
            .await?
            .ok_or_else(|| DbError::not_found("Setting", EXCHANGE_RATE_KEY))?;

        let milli: i64 = value.parse().map_err(|_| {
            DbError::Internal(format!("exchange rate setting is not an integer: {value}"))
        })?;

        let rate = ExchangeRate::from_milli(milli)?;
        debug!(rate = %rate.as_decimal(), "Loaded exchange rate");
        Ok(rate)
    }

    /// Stores the exchange rate.
    pub async fn set_exchange_rate(&self, rate: ExchangeRate) -> DbResult<()> {
        self.set(EXCHANGE_RATE_KEY, &rate.milli().to_string()).await?;
        info!(rate = %rate.as_decimal(), "Exchange rate updated");
        Ok(())
    }

    /// Reads a raw configuration value.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value)
    }

    /// Upserts a raw configuration value.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
