//! # Error Types
//!
//! Domain-specific error types for shopbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shopbook-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  shopbook-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller → user message   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product name, amounts, quantities)
//! 3. Errors are enum variants, never String
//! 4. Every core error is terminal for the current operation - there is no
//!    transient failure mode in arithmetic or parsing, so nothing retries

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They must prevent the enclosing transaction from committing and carry
/// enough context to render a user-facing message.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A carton/line quantity string could not be parsed.
    ///
    /// ## When This Occurs
    /// - Letters out of order ("3L2C")
    /// - Negative or missing numbers
    /// - Empty input or trailing garbage
    #[error("Cannot parse quantity '{input}': {reason}")]
    Parse { input: String, reason: String },

    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Insufficient stock to complete a sale.
    ///
    /// ## When This Occurs
    /// - Requested quantity exceeds available stock, where available is
    ///   sum(received + adjusted) - sum(sold) - sum(sale item quantities)
    ///
    /// ## User Workflow
    /// ```text
    /// Sell 15 lines of "Milo Sachet"
    ///      │
    ///      ▼
    /// Availability check: available=9
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Milo Sachet", available: 9, requested: 15 }
    ///      │
    ///      ▼
    /// UI shows: "Only 1C3L of Milo Sachet in stock"
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Receipt history does not cover the requested quantity.
    ///
    /// ## When This Occurs
    /// The FIFO allocator walked every `received` batch and still had
    /// `shortfall` lines left uncosted. The legacy system silently priced
    /// the whole line at zero here, which corrupts profit figures; we
    /// surface it and let the caller reject the transaction.
    #[error("Receipt history for {product} is short by {shortfall} lines, cannot derive cost")]
    InsufficientCostHistory { product: String, shortfall: i64 },

    /// Payment amount violates the payment-type rule.
    ///
    /// ## Rules
    /// - cash: amount_paid must equal total
    /// - credit: amount_paid must equal 0
    /// - partial: 0 < amount_paid < total, strictly
    #[error("Payment rejected ({rule}): total {total:.2}, paid {amount_paid:.2}")]
    PaymentValidation {
        rule: String,
        total: f64,
        amount_paid: f64,
    },

    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
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

    /// Invalid format (e.g., invalid UUID, non-finite price).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Field is frozen and may no longer change.
    ///
    /// ## When This Occurs
    /// Changing `lines_per_carton` after stock movements exist would
    /// retroactively change the meaning of every historical quantity
    /// string, so the divisor is locked by the first movement.
    #[error("{field} cannot change once {reason}")]
    Immutable { field: String, reason: String },
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
            product: "Milo Sachet".to_string(),
            available: 9,
            requested: 15,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Milo Sachet: available 9, requested 15"
        );

        let err = CoreError::InsufficientCostHistory {
            product: "Milo Sachet".to_string(),
            shortfall: 3,
        };
        assert!(err.to_string().contains("short by 3 lines"));
    }

    #[test]
    fn test_payment_error_message() {
        let err = CoreError::PaymentValidation {
            rule: "cash requires full payment".to_string(),
            total: 100.0,
            amount_paid: 99.0,
        };
        assert_eq!(
            err.to_string(),
            "Payment rejected (cash requires full payment): total 100.00, paid 99.00"
        );
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
