//! # shopbook-core: Pure Business Logic for Shopbook
//!
//! This crate is the **heart** of Shopbook, a small-business back-office
//! system (inventory, sales, credit). It contains all business logic as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shopbook Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Frontend SPA / routing / auth (external)           │   │
//! │  │      sale form ──► stock control ──► reports                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ already-validated primitives           │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ shopbook-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │ quantity │ │   fifo   │ │ payment  │ │ types/validation │  │   │
//! │  │   │  codec   │ │allocator │ │   gate   │ │     /report      │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 shopbook-db (Database Layer)                     │   │
//! │  │        SQLite repositories, the atomic sale transaction          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`quantity`] - Carton/line codec and formatted-quantity aggregation
//! - [`fifo`] - FIFO cost allocation over receipt batches
//! - [`payment`] - Payment-type validation (the sale acceptance gate)
//! - [`types`] - Domain types (Product, StockMovement, Sale, SaleItem)
//! - [`validation`] - Input validation
//! - [`report`] - Report row shaping
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic - same input, same output
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Lines everywhere**: quantities are stored as line counts and prices
//!    per line; cartons exist only at the input/display boundary
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use shopbook_core::fifo::{allocate_cost, Allocation, DepletionMode, ReceiptBatch};
//! use shopbook_core::quantity::Packing;
//!
//! // A product packed 6 lines to the carton.
//! let packing = Packing::of(6);
//! assert_eq!(packing.format_lines(15), "2C3L");
//!
//! // Sell 15 lines against two receipt batches.
//! let batches = [ReceiptBatch::new(12, 1.00), ReceiptBatch::new(6, 1.50)];
//! let result = allocate_cost(&batches, 15, 0, DepletionMode::Cumulative);
//! assert_eq!(result, Allocation::Allocated { unit_cost: 1.10 });
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod fifo;
pub mod payment;
pub mod quantity;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use shopbook_core::Packing` instead of
// `use shopbook_core::quantity::Packing`

pub use error::{CoreError, CoreResult, ValidationError};
pub use fifo::{allocate_cost, Allocation, DepletionMode, ReceiptBatch};
pub use payment::{validate_payment, PaymentType};
pub use quantity::Packing;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest carton the business packs.
///
/// ## Business Reason
/// Catalog validation caps `lines_per_carton` at 8; anything larger is a
/// data-entry mistake.
pub const MAX_LINES_PER_CARTON: i64 = 8;

/// Maximum quantity of a single sale line, in lines.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_SALE_QUANTITY_LINES: i64 = 9_999;
