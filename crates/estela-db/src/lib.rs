//! # estela-db: Database Layer for Estela
//!
//! This crate provides database access for the reconciliation engine.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Estela Data Flow                                 │
//! │                                                                         │
//! │  Checkout (estela-core) ──► FinalizedSale                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     estela-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ sale  loan    │    │  (embedded)  │  │   │
//! │  │   │               │◄───│ catalog ...   │    │ 001_init.sql │  │   │
//! │  │   │ SqlitePool    │    │ ReportService │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (or :memory: under test)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (sale, loan, inventory, ...)
//! - [`reports`] - The reconciliation fetch layer
//!
//! ## Usage
//!
//! ```rust,ignore
//! use estela_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/estela.db")).await?;
//!
//! let rate = db.settings().exchange_rate().await?;
//! let sale = db.sales().record(&finalized).await?;
//! let bundle = db.reports().reconcile(start, end).await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod reports;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use reports::ReportService;

// Repository re-exports for convenience
pub use repository::appointment::AppointmentRepository;
pub use repository::catalog::CatalogRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::loan::LoanRepository;
pub use repository::sale::SaleRepository;
pub use repository::settings::SettingsRepository;
pub use repository::stylist::StylistRepository;
