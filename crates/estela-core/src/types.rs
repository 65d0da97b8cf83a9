//! # Domain Types
//!
//! Core domain types for the reconciliation engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CatalogItem    │   │      Sale       │   │     Loan        │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  kind           │   │  total_mxn/usd  │   │  amount/balance │       │
//! │  │  sale_price     │   │  tender + change│   │  status         │       │
//! │  │  current_stock  │   │  currencies     │   │  due_date       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Stylist      │   │    SaleLine     │   │ InternalUsage / │       │
//! │  │  commission_bps │   │  price snapshot │   │ Purchase        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All money fields are i64 cents with `Money` accessor methods, so the
//! structs stay plain data that maps 1:1 onto database rows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::{CommissionRate, Currency, Money};

// =============================================================================
// Item Kind
// =============================================================================

/// What a catalog entry is: a service performed at a chair, or a retail
/// product taken off a shelf. Only products carry stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Service,
    Product,
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the client paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on the external terminal.
    Card,
    /// Bank transfer.
    Transfer,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::Transfer => write!(f, "transfer"),
        }
    }
}

// =============================================================================
// Catalog Item
// =============================================================================

/// A service or product available for sale.
///
/// Owned by the catalog collaborator; the engine reads it for pricing and
/// mutates only the stock counter, always via SQL-side deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CatalogItem {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown at the register and in reports.
    pub name: String,

    /// Service or product.
    pub kind: ItemKind,

    /// Sale price in MXN cents.
    pub sale_price_cents: i64,

    /// Purchase cost in MXN cents (what restocking one unit costs).
    pub purchase_cost_cents: i64,

    /// Current stock level. None for services.
    pub current_stock: Option<i64>,

    /// Reorder threshold. None for services.
    pub minimum_stock: Option<i64>,

    /// Whether the item is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Returns the sale price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    /// Returns the purchase cost as Money.
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.purchase_cost_cents)
    }

    /// Whether this item should appear in the low-stock alert view.
    ///
    /// The boundary is inclusive: stock exactly at the minimum is already
    /// an alert, because the next sale takes it below.
    pub fn is_low_stock(&self) -> bool {
        match (self.kind, self.current_stock, self.minimum_stock) {
            (ItemKind::Product, Some(current), Some(minimum)) => current <= minimum,
            _ => false,
        }
    }
}

// =============================================================================
// Stylist
// =============================================================================

/// A member of the staff roster.
///
/// Referenced, never mutated, by this engine; the directory collaborator
/// owns the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Stylist {
    pub id: String,
    pub name: String,
    /// Commission on service revenue, in basis points (3500 = 35%).
    pub commission_bps: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Stylist {
    /// Returns the commission rate.
    #[inline]
    pub fn commission_rate(&self) -> CommissionRate {
        CommissionRate::from_bps(self.commission_bps)
    }
}

// =============================================================================
// Appointment
// =============================================================================

/// Lifecycle of an appointment as far as this engine is concerned.
///
/// The scheduler owns everything else; the only transition the engine makes
/// is Scheduled -> Settled, inside the sale-recording transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Settled,
}

/// An appointment handed over by the scheduler for checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Appointment {
    pub id: String,
    pub stylist_id: String,
    pub client_id: String,
    /// The booked service.
    pub service_id: String,
    /// Price agreed at booking time, if it differs from the catalog price.
    pub booked_price_cents: Option<i64>,
    pub status: AppointmentStatus,
    pub starts_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// Returns the booked price as Money, when one was recorded.
    #[inline]
    pub fn booked_price(&self) -> Option<Money> {
        self.booked_price_cents.map(Money::from_cents)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A finalized sale header. Created exactly once per checkout; immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub appointment_id: Option<String>,
    pub stylist_id: String,
    /// Total in home currency.
    pub total_mxn_cents: i64,
    /// Total converted to USD at the rate in force when the sale closed.
    pub total_usd_cents: i64,
    pub payment_method: PaymentMethod,
    /// Currency the client paid in.
    pub tender_currency: Currency,
    /// Currency the change was handed back in.
    pub change_currency: Currency,
    /// Amount the client handed over, in the tender currency.
    pub tendered_cents: i64,
    /// Change given back, in the change currency.
    pub change_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total_mxn(&self) -> Money {
        Money::from_cents(self.total_mxn_cents)
    }

    #[inline]
    pub fn total_usd(&self) -> Money {
        Money::from_cents(self.total_usd_cents)
    }
}

// =============================================================================
// Sale Line
// =============================================================================

/// A line item in a sale.
/// Uses the snapshot pattern: price and kind are frozen at sale time, so a
/// later catalog edit can never rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    pub item_id: String,
    pub quantity: i64,
    /// Unit price in MXN cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// unit_price * quantity, in MXN cents.
    pub subtotal_cents: i64,
    /// Kind at time of sale (frozen).
    pub kind: ItemKind,
}

impl SaleLine {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Loan ("vale")
// =============================================================================

/// Repayment state of a staff loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// Nothing repaid yet (balance == amount).
    Pending,
    /// Some payments recorded (0 < balance < amount).
    Partial,
    /// Fully repaid (balance <= 0).
    Paid,
}

impl LoanStatus {
    /// Status is a pure function of (balance, amount).
    ///
    /// ## Example
    /// ```rust
    /// use estela_core::types::LoanStatus;
    ///
    /// assert_eq!(LoanStatus::from_balance(20000, 20000), LoanStatus::Pending);
    /// assert_eq!(LoanStatus::from_balance(15000, 20000), LoanStatus::Partial);
    /// assert_eq!(LoanStatus::from_balance(0, 20000), LoanStatus::Paid);
    /// ```
    pub fn from_balance(balance_cents: i64, amount_cents: i64) -> Self {
        if balance_cents <= 0 {
            LoanStatus::Paid
        } else if balance_cents < amount_cents {
            LoanStatus::Partial
        } else {
            LoanStatus::Pending
        }
    }
}

/// An advance owed by a stylist to the business, repaid in tracked parts.
///
/// ## Invariants
/// - `0 <= balance <= amount`
/// - `status == LoanStatus::from_balance(balance, amount)` at all times
/// - the balance only ever moves down (payments), never up
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Loan {
    pub id: String,
    pub stylist_id: String,
    pub amount_cents: i64,
    pub balance_cents: i64,
    pub due_date: NaiveDate,
    pub status: LoanStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Loan {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }

    /// Whether any balance remains.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status != LoanStatus::Paid
    }
}

// =============================================================================
// Internal Usage
// =============================================================================

/// Product consumed by the shop rather than sold.
///
/// Decrements stock at creation time. When attributed to a stylist, its cost
/// becomes a payroll deduction; with no stylist it is a general shop expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InternalUsage {
    pub id: String,
    pub item_id: String,
    pub stylist_id: Option<String>,
    pub quantity: i64,
    pub used_at: DateTime<Utc>,
}

// =============================================================================
// Purchase
// =============================================================================

/// A restock record. Append-only; increments stock at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Purchase {
    pub id: String,
    pub item_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub purchased_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
