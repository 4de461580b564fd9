//! # Validation Module
//!
//! Input validation utilities for Shopbook.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend form                                                 │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business rule validation                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── NOT NULL / UNIQUE constraints                                      │
//! │  └── Foreign key constraints                                            │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_LINES_PER_CARTON, MAX_SALE_QUANTITY_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Catalog Validators
// =============================================================================

/// Validates a product's `lines_per_carton` divisor.
///
/// ## Rules
/// - Must be at least 1 (a zero or negative divisor would make the codec's
///   price conversions degrade to zero)
/// - Must be at most 8 (the largest carton the business packs)
///
/// ## Example
/// ```rust
/// use shopbook_core::validation::validate_lines_per_carton;
///
/// assert!(validate_lines_per_carton(6).is_ok());
/// assert!(validate_lines_per_carton(0).is_err());
/// assert!(validate_lines_per_carton(9).is_err());
/// ```
pub fn validate_lines_per_carton(lines_per_carton: i64) -> ValidationResult<()> {
    if !(1..=MAX_LINES_PER_CARTON).contains(&lines_per_carton) {
        return Err(ValidationError::OutOfRange {
            field: "lines_per_carton".to_string(),
            min: 1,
            max: MAX_LINES_PER_CARTON,
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a sale/movement quantity in lines.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_SALE_QUANTITY_LINES
pub fn validate_quantity(quantity_lines: i64) -> ValidationResult<()> {
    if quantity_lines <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity_lines > MAX_SALE_QUANTITY_LINES {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_SALE_QUANTITY_LINES,
        });
    }

    Ok(())
}

/// Validates a price or cost value.
///
/// ## Rules
/// - Must be finite (NaN/infinity never enter the ledger)
/// - Must be non-negative; zero is allowed (free items, zero-cost receipts)
pub fn validate_price(price: f64) -> ValidationResult<()> {
    if !price.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: "price".to_string(),
            reason: "must be a finite number".to_string(),
        });
    }

    if price < 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_lines_per_carton() {
        for d in 1..=8 {
            assert!(validate_lines_per_carton(d).is_ok());
        }
        assert!(validate_lines_per_carton(0).is_err());
        assert!(validate_lines_per_carton(-2).is_err());
        assert!(validate_lines_per_carton(9).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Milo Sachet").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name("   ").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(100).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-5).is_err());
        assert!(validate_quantity(MAX_SALE_QUANTITY_LINES + 1).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(0.0).is_ok());
        assert!(validate_price(10.99).is_ok());
        assert!(validate_price(-0.01).is_err());
        assert!(validate_price(f64::NAN).is_err());
        assert!(validate_price(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
