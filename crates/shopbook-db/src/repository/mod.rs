//! # Repository Module
//!
//! Repository pattern implementations for database access.
//!
//! ## Repositories
//! - [`product`] - Product catalog (frozen-divisor rule lives here)
//! - [`movement`] - Append-only stock ledger and availability sums
//! - [`sale`] - The atomic sale transaction and report queries

pub mod movement;
pub mod product;
pub mod sale;

pub use movement::MovementRepository;
pub use product::ProductRepository;
pub use sale::{NewSale, NewSaleLine, SaleRepository};
