//! # Payment-Type Validation
//!
//! The sale acceptance gate: a sale's payment type constrains `amount_paid`
//! relative to `total`, and a violation rejects the entire transaction.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  cash     amount_paid == total      (paid in full at the counter)      │
//! │  credit   amount_paid == 0          (whole amount owed)                │
//! │  partial  0 < amount_paid < total   (strict on both ends)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts are cedi values compared with a half-pesewa tolerance
//! ([`AMOUNT_EPSILON`]) to absorb floating-point noise from the per-carton
//! to per-line conversions upstream.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Comparison tolerance for monetary equality: half of the smallest coin.
pub const AMOUNT_EPSILON: f64 = 0.005;

// =============================================================================
// Payment Type
// =============================================================================

/// How a sale is settled.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// Paid in full at the time of sale.
    Cash,
    /// Nothing paid; full amount recorded as owed.
    Credit,
    /// Part paid now, remainder owed.
    Partial,
}

impl PaymentType {
    /// Stable lowercase name, used in error messages and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Cash => "cash",
            PaymentType::Credit => "credit",
            PaymentType::Partial => "partial",
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Validates `amount_paid` against `total` for the given payment type.
///
/// ## Errors
/// `CoreError::PaymentValidation` naming the violated rule. The caller must
/// reject the whole transaction - no partial commit.
///
/// ## Example
/// ```rust
/// use shopbook_core::payment::{validate_payment, PaymentType};
///
/// assert!(validate_payment(PaymentType::Cash, 100.0, 100.0).is_ok());
/// assert!(validate_payment(PaymentType::Cash, 100.0, 99.0).is_err());
/// ```
pub fn validate_payment(payment_type: PaymentType, total: f64, amount_paid: f64) -> CoreResult<()> {
    let reject = |rule: &str| {
        Err(CoreError::PaymentValidation {
            rule: rule.to_string(),
            total,
            amount_paid,
        })
    };

    match payment_type {
        PaymentType::Cash => {
            if (amount_paid - total).abs() > AMOUNT_EPSILON {
                return reject("cash requires amount paid to equal the total");
            }
        }
        PaymentType::Credit => {
            if amount_paid.abs() > AMOUNT_EPSILON {
                return reject("credit requires amount paid to be zero");
            }
        }
        PaymentType::Partial => {
            if amount_paid <= AMOUNT_EPSILON {
                return reject("partial payment must be greater than zero");
            }
            if amount_paid >= total - AMOUNT_EPSILON {
                return reject("partial payment must be strictly less than the total");
            }
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cash_requires_exact_total() {
        assert!(validate_payment(PaymentType::Cash, 100.0, 100.0).is_ok());
        assert!(validate_payment(PaymentType::Cash, 100.0, 99.0).is_err());
        assert!(validate_payment(PaymentType::Cash, 100.0, 100.01).is_err());
        // Floating-point noise within half a pesewa is tolerated.
        assert!(validate_payment(PaymentType::Cash, 100.0, 100.0 + 1e-9).is_ok());
    }

    #[test]
    fn test_credit_requires_zero_paid() {
        assert!(validate_payment(PaymentType::Credit, 100.0, 0.0).is_ok());
        assert!(validate_payment(PaymentType::Credit, 100.0, 1.0).is_err());
        assert!(validate_payment(PaymentType::Credit, 100.0, 100.0).is_err());
    }

    #[test]
    fn test_partial_is_strict_on_both_ends() {
        assert!(validate_payment(PaymentType::Partial, 100.0, 50.0).is_ok());
        assert!(validate_payment(PaymentType::Partial, 100.0, 0.0).is_err());
        assert!(validate_payment(PaymentType::Partial, 100.0, 100.0).is_err());
        assert!(validate_payment(PaymentType::Partial, 100.0, 0.001).is_err());
        assert!(validate_payment(PaymentType::Partial, 100.0, 99.999).is_err());
    }

    #[test]
    fn test_wire_format_is_snake_case() {
        assert_eq!(serde_json::to_string(&PaymentType::Cash).unwrap(), "\"cash\"");
        assert_eq!(
            serde_json::to_string(&PaymentType::Partial).unwrap(),
            "\"partial\""
        );
        let parsed: PaymentType = serde_json::from_str("\"credit\"").unwrap();
        assert_eq!(parsed, PaymentType::Credit);
    }

    #[test]
    fn test_violation_names_the_rule() {
        let err = validate_payment(PaymentType::Cash, 100.0, 99.0).unwrap_err();
        assert!(err.to_string().contains("cash requires amount paid"));
        assert!(err.to_string().contains("100.00"));
        assert!(err.to_string().contains("99.00"));
    }
}
