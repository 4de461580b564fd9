//! # Domain Types
//!
//! Core domain types used throughout Shopbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────┐   ┌─────────────────────┐                     │
//! │  │      Product        │   │    StockMovement    │                     │
//! │  │  ─────────────────  │   │  ─────────────────  │                     │
//! │  │  id (UUID)          │   │  id (UUID)          │                     │
//! │  │  lines_per_carton   │   │  kind (recv/sold/   │                     │
//! │  │  unit_selling_price │   │        adjusted)    │                     │
//! │  │  (per line)         │   │  quantity (lines)   │                     │
//! │  └─────────────────────┘   │  unit_cost (/line)  │                     │
//! │                            │  created_at (FIFO   │                     │
//! │  ┌─────────────────────┐   │     ordering key)   │                     │
//! │  │       Sale          │   └─────────────────────┘                     │
//! │  │  ─────────────────  │   ┌─────────────────────┐                     │
//! │  │  receipt_number     │   │      SaleItem       │                     │
//! │  │  payment_type       │   │  ─────────────────  │                     │
//! │  │  total, amount_paid │   │  quantity (lines)   │                     │
//! │  └─────────────────────┘   │  unit prices frozen │                     │
//! │                            │  at creation time   │                     │
//! │                            └─────────────────────┘                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Units Convention
//! Quantities are ALWAYS stored as line counts; prices and costs are ALWAYS
//! stored per line. Carton figures exist only at the input/display boundary
//! and go through the [`Packing`](crate::quantity::Packing) codec.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::payment::PaymentType;
use crate::quantity::Packing;

// =============================================================================
// Product
// =============================================================================

/// A sellable item in the catalog.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown on forms and reports.
    pub name: String,

    /// Optional business identifier.
    pub sku: Option<String>,

    /// Lines per carton - the codec divisor. Validated to 1..=8 at
    /// creation; logically immutable once movements reference the product.
    pub lines_per_carton: i64,

    /// Current selling price per LINE. The per-carton price shown to the
    /// user is derived through the codec.
    pub unit_selling_price: f64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    /// When the product was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the product's carton packing.
    #[inline]
    pub fn packing(&self) -> Packing {
        Packing::of(self.lines_per_carton)
    }

    /// Selling price per carton, for display.
    #[inline]
    pub fn selling_price_per_carton(&self) -> f64 {
        self.packing().price_per_carton(self.unit_selling_price)
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// The kind of a stock ledger entry.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// A stock receipt: the supply batches the FIFO allocator consumes.
    Received,
    /// Stock leaving through a sale (direct or derived from a SaleItem).
    Sold,
    /// Manual correction. Signed quantity; corrections never mutate
    /// earlier rows, they compensate.
    Adjusted,
}

/// An immutable, append-only ledger entry for a product's stock.
///
/// Rows are never mutated after creation; edits append compensating
/// `adjusted` rows instead. `created_at` is the FIFO ordering key.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub kind: MovementKind,
    /// Quantity in lines. Positive for receipts and sales (the kind carries
    /// the direction); signed for adjustments.
    pub quantity: i64,
    /// Cost per line. Meaningful for receipts; zero for adjustments.
    pub unit_cost: f64,
    /// Free-text note (correction reason, source document, ...).
    pub note: Option<String>,
    /// On compensating adjustments, the id of the movement being corrected.
    /// Lets later corrections of the same row account for earlier ones.
    pub corrects_movement_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// A committed sale transaction.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub receipt_number: String,
    pub payment_type: PaymentType,
    /// Sum of item totals.
    pub total: f64,
    /// Amount settled at the counter; constrained by the payment type.
    pub amount_paid: f64,
    pub customer_name: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Outstanding balance on this sale.
    #[inline]
    pub fn balance(&self) -> f64 {
        self.total - self.amount_paid
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// One line of a sale.
///
/// Uses the snapshot pattern: name and both unit prices are frozen at
/// creation time. The FIFO-derived `unit_cost_price` is never recomputed
/// retroactively, even if receipt history later changes.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Quantity sold, in lines.
    pub quantity: i64,
    /// Selling price per line at time of sale (frozen).
    pub unit_selling_price: f64,
    /// FIFO-derived cost per line at time of sale (frozen).
    pub unit_cost_price: f64,
    /// quantity × unit_selling_price.
    pub total: f64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Profit contributed by this line: (selling − cost) × quantity.
    #[inline]
    pub fn line_profit(&self) -> f64 {
        (self.unit_selling_price - self.unit_cost_price) * self.quantity as f64
    }

    /// Cost of goods for this line.
    #[inline]
    pub fn line_cost(&self) -> f64 {
        self.unit_cost_price * self.quantity as f64
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        Product {
            id: "p-1".to_string(),
            name: "Milo Sachet".to_string(),
            sku: None,
            lines_per_carton: 6,
            unit_selling_price: 2.0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_product_packing_and_carton_price() {
        let product = sample_product();
        assert_eq!(product.packing().lines_per_carton(), 6);
        assert!((product.selling_price_per_carton() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_sale_balance() {
        let sale = Sale {
            id: "s-1".to_string(),
            receipt_number: "20260823-0001".to_string(),
            payment_type: PaymentType::Partial,
            total: 100.0,
            amount_paid: 40.0,
            customer_name: Some("Ama".to_string()),
            created_at: Utc::now(),
        };
        assert!((sale.balance() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_sale_item_profit() {
        let item = SaleItem {
            id: "i-1".to_string(),
            sale_id: "s-1".to_string(),
            product_id: "p-1".to_string(),
            name_snapshot: "Milo Sachet".to_string(),
            quantity: 15,
            unit_selling_price: 2.0,
            unit_cost_price: 1.1,
            total: 30.0,
            created_at: Utc::now(),
        };
        assert!((item.line_profit() - 13.5).abs() < 1e-9);
        assert!((item.line_cost() - 16.5).abs() < 1e-9);
    }
}
