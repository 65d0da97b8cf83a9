//! # Money Module
//!
//! Monetary values, the two accepted currencies, and the exchange rate.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Across a 50-line cart those errors become visible cents.               │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every amount is an i64 count of centavos. Sums are exact.            │
//! │    Conversion between currencies rounds ONCE, at the boundary,          │
//! │    never between intermediate sums.                                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use estela_core::money::{ExchangeRate, Money};
//!
//! // Create from cents (the only way in)
//! let price = Money::from_cents(35000); // $350.00 MXN
//!
//! // Convert through an explicit rate - never ambient state
//! let rate = ExchangeRate::from_milli(18500).unwrap(); // 18.500 MXN per USD
//! assert_eq!(rate.to_usd(Money::from_cents(18500)).cents(), 1000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (centavos / cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: payroll nets can legitimately go negative when a
///   stylist owes more than they earned
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Currency-agnostic**: the same type carries MXN and USD amounts; the
///   surrounding field or a [`Currency`] tag says which one it is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use estela_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use estela_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major_part(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the larger of two values.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// Multiplies by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use estela_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(4500); // $45.00
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 13500);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// Display implementation shows money in a human-readable format.
///
/// For diagnostics and logs; the front desk formats amounts itself.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.major_part().abs(), self.minor_part())
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by integer (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Currency
// =============================================================================

/// The two currencies the register accepts.
///
/// MXN is the home currency: every catalog price and every stored subtotal
/// is MXN. USD appears only at the tender boundary, converted through the
/// configured [`ExchangeRate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    /// Mexican peso - home currency for all pricing.
    Mxn,
    /// US dollar - accepted at checkout via the exchange rate.
    Usd,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Mxn => write!(f, "MXN"),
            Currency::Usd => write!(f, "USD"),
        }
    }
}

// =============================================================================
// Exchange Rate
// =============================================================================

/// MXN per one USD, in milli-units (three decimals).
///
/// ## Why Milli-Units?
/// Retail FX quotes carry at most three decimals (18.500), so an integer
/// count of thousandths represents every quotable rate exactly and keeps the
/// conversions in pure integer arithmetic.
///
/// ## Invariant
/// The wrapped value is strictly positive - the fallible constructors are
/// the only way in, so the division in [`to_usd`](Self::to_usd) can never
/// divide by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate(i64);

impl ExchangeRate {
    /// Creates a rate from milli-units (18500 = 18.500 MXN per USD).
    ///
    /// ## Errors
    /// `InvalidRate` when the value is zero or negative.
    ///
    /// ## Example
    /// ```rust
    /// use estela_core::money::ExchangeRate;
    ///
    /// assert!(ExchangeRate::from_milli(18500).is_ok());
    /// assert!(ExchangeRate::from_milli(0).is_err());
    /// assert!(ExchangeRate::from_milli(-5).is_err());
    /// ```
    pub fn from_milli(milli: i64) -> CoreResult<Self> {
        if milli <= 0 {
            return Err(CoreError::InvalidRate { milli });
        }
        Ok(ExchangeRate(milli))
    }

    /// Creates a rate from a decimal quote (for configuration input).
    ///
    /// ## Example
    /// ```rust
    /// use estela_core::money::ExchangeRate;
    ///
    /// let rate = ExchangeRate::from_decimal(18.5).unwrap();
    /// assert_eq!(rate.milli(), 18500);
    /// ```
    pub fn from_decimal(value: f64) -> CoreResult<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(CoreError::InvalidRate { milli: 0 });
        }
        Self::from_milli((value * 1000.0).round() as i64)
    }

    /// Returns the rate in milli-units.
    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    /// Returns the rate as a decimal (for display only).
    #[inline]
    pub fn as_decimal(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Converts an MXN amount to USD: `usd = mxn / rate`.
    ///
    /// Rounds half-up to the cent at this boundary; i128 intermediates keep
    /// the multiplication from overflowing.
    ///
    /// ## Example
    /// ```rust
    /// use estela_core::money::{ExchangeRate, Money};
    ///
    /// let rate = ExchangeRate::from_milli(18500).unwrap();
    /// // $50.00 MXN of change handed back in dollars: 50 / 18.5 = $2.70 USD
    /// assert_eq!(rate.to_usd(Money::from_cents(5000)).cents(), 270);
    /// ```
    pub fn to_usd(&self, amount: Money) -> Money {
        let cents = (amount.cents() as i128 * 1000 + self.0 as i128 / 2) / self.0 as i128;
        Money::from_cents(cents as i64)
    }

    /// Converts a USD amount to MXN: `mxn = usd * rate`.
    ///
    /// ## Example
    /// ```rust
    /// use estela_core::money::{ExchangeRate, Money};
    ///
    /// let rate = ExchangeRate::from_milli(18500).unwrap();
    /// assert_eq!(rate.to_mxn(Money::from_cents(1000)).cents(), 18500);
    /// ```
    pub fn to_mxn(&self, amount: Money) -> Money {
        let cents = (amount.cents() as i128 * self.0 as i128 + 500) / 1000;
        Money::from_cents(cents as i64)
    }

    /// Converts between any currency pair; same-currency is identity.
    pub fn convert(&self, amount: Money, from: Currency, to: Currency) -> Money {
        match (from, to) {
            (Currency::Mxn, Currency::Usd) => self.to_usd(amount),
            (Currency::Usd, Currency::Mxn) => self.to_mxn(amount),
            _ => amount,
        }
    }
}

// =============================================================================
// Commission Rate
// =============================================================================

/// A stylist's commission rate in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 3500 bps = 35% - a typical service commission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRate(u32);

impl CommissionRate {
    /// Creates a commission rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        CommissionRate(bps)
    }

    /// Creates a commission rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        CommissionRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Applies the rate to an amount, rounding half-up to the cent.
    ///
    /// ## Example
    /// ```rust
    /// use estela_core::money::{CommissionRate, Money};
    ///
    /// let rate = CommissionRate::from_bps(1000); // 10%
    /// let earned = rate.apply(Money::from_cents(100_000)); // on $1000.00
    /// assert_eq!(earned.cents(), 10_000); // $100.00
    /// ```
    pub fn apply(&self, amount: Money) -> Money {
        let cents = (amount.cents() as i128 * self.0 as i128 + 5000) / 10000;
        Money::from_cents(cents as i64)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
