//! # Appointment Repository
//!
//! Read surface over the appointments the scheduler feeds in. The engine
//! never creates or cancels appointments; the only status transition it
//! owns - Scheduled -> Settled - happens inside the sale-recording
//! transaction in the sale repository, never here.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use estela_core::Appointment;

/// Repository for appointment lookups.
#[derive(Debug, Clone)]
pub struct AppointmentRepository {
    pool: SqlitePool,
}

impl AppointmentRepository {
    /// Creates a new AppointmentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AppointmentRepository { pool }
    }

    /// Gets an appointment by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Appointment>> {
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, stylist_id, client_id, service_id, booked_price_cents,
                   status, starts_at, created_at
            FROM appointments
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(appointment)
    }

    /// Lists appointments awaiting checkout, earliest first.
    ///
    /// This is what the register shows as "citas por cobrar".
    pub async fn list_unsettled(&self) -> DbResult<Vec<Appointment>> {
        let appointments = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, stylist_id, client_id, service_id, booked_price_cents,
                   status, starts_at, created_at
            FROM appointments
            WHERE status = 'scheduled'
            ORDER BY starts_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(appointments)
    }

    /// Inserts an appointment (the scheduler's feed surface).
    pub async fn insert(&self, appointment: &Appointment) -> DbResult<()> {
        debug!(id = %appointment.id, "Inserting appointment");

        sqlx::query(
            r#"
            INSERT INTO appointments (
                id, stylist_id, client_id, service_id, booked_price_cents,
                status, starts_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&appointment.id)
        .bind(&appointment.stylist_id)
        .bind(&appointment.client_id)
        .bind(&appointment.service_id)
        .bind(appointment.booked_price_cents)
        .bind(appointment.status)
        .bind(appointment.starts_at)
        .bind(appointment.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
