//! # Error Types
//!
//! Domain-specific error types for estela-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  estela-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  estela-db errors (separate crate)                                     │
//! │  └── DbError          - Persistence failures (incl. RecordingFailed)   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (item name, cents, line id)
//! 3. Errors are enum variants, never String
//! 4. Every validation error is raised before any write happens

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations. The persistence layer wraps
/// them unchanged so callers can match on the same taxonomy at every level.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A money input was negative where only non-negative amounts make sense.
    ///
    /// ## When This Occurs
    /// - Overriding a cart line price with a negative value
    /// - Tendering a negative payment
    /// - Creating a loan or recording a loan payment with amount <= 0
    #[error("invalid amount: {cents} cents")]
    InvalidAmount { cents: i64 },

    /// The exchange rate is zero or negative.
    ///
    /// Conversions divide by the rate, so a non-positive rate is rejected at
    /// construction time and can never reach the arithmetic.
    #[error("exchange rate must be positive, got {milli} milli-units")]
    InvalidRate { milli: i64 },

    /// `finalize` was called on a checkout with no lines.
    #[error("cannot finalize an empty cart")]
    EmptyCart,

    /// `finalize` was called on a checkout with no bound appointment.
    ///
    /// Checkout in this domain always settles an appointment, which is what
    /// carries the stylist and client references a sale needs.
    #[error("checkout is not bound to an appointment")]
    NoStylistOrClient,

    /// A cart line id does not exist in the checkout.
    #[error("cart line not found: {0}")]
    LineNotFound(u64),

    /// Internal consumption would exceed the current stock.
    ///
    /// ## When This Occurs
    /// - Recording internal usage of more units than are on the shelf
    ///
    /// The operation is blocked entirely; stock is never clamped to zero.
    #[error("insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: i64,
        requested: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when input doesn't meet structural requirements. Used for
/// early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            item: "Shampoo Reparador".to_string(),
            available: 2,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for Shampoo Reparador: available 2, requested 5"
        );

        let err = CoreError::InvalidRate { milli: 0 };
        assert_eq!(
            err.to_string(),
            "exchange rate must be positive, got 0 milli-units"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
