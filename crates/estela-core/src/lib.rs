//! # estela-core: Pure Business Logic for the Estela Reconciliation Engine
//!
//! This crate is the **heart** of the salon's financial reconciliation
//! engine. It contains all business logic as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Estela Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Front Desk / Scheduler / Directories               │   │
//! │  │          (external collaborators, not in this repo)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ estela-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │ checkout  │  │  reports  │  │   types   │  │   │
//! │  │   │   Money   │  │   Cart    │  │  dedup +  │  │  domain   │  │   │
//! │  │   │ Exchange  │  │  Change   │  │ 5 passes  │  │ entities  │  │   │
//! │  │   │   Rate    │  │  Finalize │  │           │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    estela-db (Database Layer)                   │   │
//! │  │        SQLite repositories, the Transaction Recorder,           │   │
//! │  │        and the report fetch layer                               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money in integer cents, the two currencies, the exchange rate
//! - [`types`] - Domain entities (CatalogItem, Sale, Loan, ...)
//! - [`checkout`] - The cart/checkout calculator state machine
//! - [`reports`] - The reconciliation aggregation passes
//! - [`error`] - Domain error taxonomy
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output - reports are reproducible
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are cents (i64); conversion
//!    rounds once, at the boundary
//! 4. **Explicit Rate**: the exchange rate is an argument, never a global
//!
//! ## Example Usage
//!
//! ```rust
//! use estela_core::money::{ExchangeRate, Money};
//!
//! let rate = ExchangeRate::from_milli(18500).unwrap(); // 18.500 MXN per USD
//!
//! // 100.00 MXN of change handed back in dollars
//! let change = rate.to_usd(Money::from_cents(10000));
//! assert_eq!(change.cents(), 541); // $5.41 USD
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod money;
pub mod reports;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use estela_core::Money` instead of
// `use estela_core::money::Money`

pub use checkout::{AppointmentRef, CartLine, Checkout, CheckoutTotals, FinalizedSale, PaymentDetails};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{CommissionRate, Currency, ExchangeRate, Money};
pub use reports::ReportBundle;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single checkout
///
/// ## Business Reason
/// A salon ticket never legitimately reaches this; the cap catches a
/// runaway caller before the cart becomes unmanageable at the register.
pub const MAX_CART_LINES: usize = 50;

/// Maximum quantity of a single line
///
/// ## Business Reason
/// Prevents accidental over-entry (typing 100 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// How many entries a top ranking shows.
pub const TOP_RANKING_SIZE: usize = 5;

/// Floor for the revenue chart's scale denominator, in MXN cents (500.00).
///
/// A single slow day should render as a short bar, not stretch to fill the
/// whole chart.
pub const MIN_CHART_CEILING_CENTS: i64 = 50_000;
