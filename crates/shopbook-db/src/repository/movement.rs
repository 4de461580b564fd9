//! # Stock Movement Repository
//!
//! The append-only stock ledger: receipts, direct stock-control sales, and
//! adjustments.
//!
//! ## Ledger Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Rows are NEVER mutated after creation.                                 │
//! │                                                                         │
//! │  "Edit" a movement   ──►  append a compensating `adjusted` row          │
//! │  Available stock     ──►  sum(received + adjusted) − sum(sold)          │
//! │                           − sum(sale item quantities)                   │
//! │  FIFO batch walk     ──►  received rows, created_at ascending,          │
//! │                           ties broken by insertion (rowid) order        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sales recorded through the sales module write `sale_items`, not `sold`
//! movements; `sold` rows come only from the stock-control direct-sale
//! path. The availability and consumption sums count both sources, so
//! nothing is double-counted.

use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use shopbook_core::fifo::{allocate_cost, Allocation, DepletionMode, ReceiptBatch};
use shopbook_core::validation::{validate_price, validate_quantity};
use shopbook_core::{CoreError, MovementKind, Product, StockMovement};

/// Repository for stock movement operations.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

const MOVEMENT_COLUMNS: &str =
    "id, product_id, kind, quantity, unit_cost, note, corrects_movement_id, created_at";

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Records a stock receipt: `quantity_lines` at `unit_cost` per line.
    ///
    /// This is the supply batch the FIFO allocator will later consume.
    pub async fn record_received(
        &self,
        product_id: &str,
        quantity_lines: i64,
        unit_cost: f64,
    ) -> DbResult<StockMovement> {
        validate_quantity(quantity_lines).map_err(|e| DbError::Core(e.into()))?;
        validate_price(unit_cost).map_err(|e| DbError::Core(e.into()))?;

        let movement = StockMovement {
            id: generate_movement_id(),
            product_id: product_id.to_string(),
            kind: MovementKind::Received,
            quantity: quantity_lines,
            unit_cost,
            note: None,
            corrects_movement_id: None,
            created_at: Utc::now(),
        };

        debug!(product_id = %product_id, quantity = quantity_lines, "Recording receipt");
        insert_movement(&self.pool, &movement).await?;

        Ok(movement)
    }

    /// Records a receipt from the stock-control input form.
    ///
    /// The quantity arrives as a carton/line string ("2C3L") and the cost
    /// per CARTON; both are converted through the product's codec before
    /// storage.
    pub async fn record_received_formatted(
        &self,
        product_id: &str,
        formatted_quantity: &str,
        unit_cost_per_carton: f64,
    ) -> DbResult<StockMovement> {
        let product = self.require_product(product_id).await?;
        let packing = product.packing();

        let quantity_lines = packing.parse_lines(formatted_quantity)?;
        let unit_cost = packing.price_per_line(unit_cost_per_carton);

        self.record_received(product_id, quantity_lines, unit_cost)
            .await
    }

    /// Records a direct stock-control sale of `quantity_lines`.
    ///
    /// Runs the same availability check and FIFO cost allocation as the
    /// sales module, atomically: the check, the allocation, and the insert
    /// share one write transaction, so a concurrent sale cannot pass the
    /// check against the same stock snapshot.
    pub async fn record_stock_sale(
        &self,
        product_id: &str,
        quantity_lines: i64,
    ) -> DbResult<StockMovement> {
        validate_quantity(quantity_lines).map_err(|e| DbError::Core(e.into()))?;

        let mut tx = self.pool.begin().await?;

        // Take the write lock before reading stock sums (see sale.rs).
        touch_product(&mut *tx, product_id).await?;

        let product = fetch_product(&mut *tx, product_id)
            .await?
            .ok_or_else(|| DbError::Core(CoreError::ProductNotFound(product_id.to_string())))?;

        let available = available_stock_q(&mut *tx, product_id).await?;
        if available < quantity_lines {
            return Err(DbError::Core(CoreError::InsufficientStock {
                product: product.name,
                available,
                requested: quantity_lines,
            }));
        }

        let batches = receipt_batches_q(&mut *tx, product_id).await?;
        let consumed = consumed_lines_q(&mut *tx, product_id).await?;

        let unit_cost =
            match allocate_cost(&batches, quantity_lines, consumed, DepletionMode::default()) {
                Allocation::Allocated { unit_cost } => unit_cost,
                Allocation::Insufficient { shortfall } => {
                    return Err(DbError::Core(CoreError::InsufficientCostHistory {
                        product: product.name,
                        shortfall,
                    }));
                }
            };

        let movement = StockMovement {
            id: generate_movement_id(),
            product_id: product_id.to_string(),
            kind: MovementKind::Sold,
            quantity: quantity_lines,
            unit_cost,
            note: None,
            corrects_movement_id: None,
            created_at: Utc::now(),
        };

        insert_movement(&mut *tx, &movement).await?;
        tx.commit().await?;

        info!(product_id = %product_id, quantity = quantity_lines, unit_cost, "Stock sale recorded");
        Ok(movement)
    }

    /// Records a manual adjustment. `delta_lines` is signed: positive adds
    /// stock, negative removes it.
    pub async fn record_adjustment(
        &self,
        product_id: &str,
        delta_lines: i64,
        note: Option<&str>,
    ) -> DbResult<StockMovement> {
        let movement = StockMovement {
            id: generate_movement_id(),
            product_id: product_id.to_string(),
            kind: MovementKind::Adjusted,
            quantity: delta_lines,
            unit_cost: 0.0,
            note: note.map(str::to_string),
            corrects_movement_id: None,
            created_at: Utc::now(),
        };

        debug!(product_id = %product_id, delta = delta_lines, "Recording adjustment");
        insert_movement(&self.pool, &movement).await?;

        Ok(movement)
    }

    /// Corrects a historical movement by appending a compensating
    /// adjustment - the original row is never touched.
    ///
    /// The delta is computed against the movement's EFFECTIVE quantity:
    /// the original plus the net of compensations already appended for it
    /// (found via `corrects_movement_id`). Re-applying the same correction
    /// is therefore a no-op, and a later re-correction only compensates
    /// the difference.
    ///
    /// Returns `None` when the effective quantity already matches
    /// (nothing to compensate).
    pub async fn correct_movement(
        &self,
        movement_id: &str,
        new_quantity_lines: i64,
        note: &str,
    ) -> DbResult<Option<StockMovement>> {
        let original = self
            .get_by_id(movement_id)
            .await?
            .ok_or_else(|| DbError::not_found("StockMovement", movement_id))?;

        let prior: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM stock_movements
             WHERE corrects_movement_id = ?1",
        )
        .bind(movement_id)
        .fetch_one(&self.pool)
        .await?;

        // For receipts/adjustments a larger quantity means more stock; for
        // sales it means less, so a positive prior compensation REDUCED the
        // effective sold quantity. The delta flips accordingly.
        let delta = match original.kind {
            MovementKind::Received | MovementKind::Adjusted => {
                new_quantity_lines - (original.quantity + prior)
            }
            MovementKind::Sold => (original.quantity - prior) - new_quantity_lines,
        };

        if delta == 0 {
            return Ok(None);
        }

        let movement = StockMovement {
            id: generate_movement_id(),
            product_id: original.product_id.clone(),
            kind: MovementKind::Adjusted,
            quantity: delta,
            unit_cost: 0.0,
            note: Some(note.to_string()),
            corrects_movement_id: Some(original.id),
            created_at: Utc::now(),
        };

        debug!(movement_id = %movement_id, delta, "Recording correction");
        insert_movement(&self.pool, &movement).await?;

        Ok(Some(movement))
    }

    /// Gets a movement by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<StockMovement>> {
        let movement = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(movement)
    }

    /// Lists a product's movements, newest first.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE product_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// A product's receipt batches, oldest first (the FIFO walk order).
    pub async fn receipt_batches(&self, product_id: &str) -> DbResult<Vec<ReceiptBatch>> {
        receipt_batches_q(&self.pool, product_id).await
    }

    /// Available stock in lines:
    /// sum(received + adjusted) − sum(sold) − sum(sale item quantities).
    pub async fn available_stock(&self, product_id: &str) -> DbResult<i64> {
        available_stock_q(&self.pool, product_id).await
    }

    /// Total lines consumed by all historical sales (both paths).
    pub async fn consumed_lines(&self, product_id: &str) -> DbResult<i64> {
        consumed_lines_q(&self.pool, product_id).await
    }

    /// Raw line sums for the stock activity report.
    pub async fn activity(
        &self,
        product_id: &str,
    ) -> DbResult<shopbook_core::report::StockActivityRow> {
        let product = self.require_product(product_id).await?;

        let (received, sold, adjusted): (i64, i64, i64) = sqlx::query_as(
            "SELECT
                (SELECT COALESCE(SUM(quantity), 0) FROM stock_movements
                  WHERE product_id = ?1 AND kind = 'received'),
                (SELECT COALESCE(SUM(quantity), 0) FROM stock_movements
                  WHERE product_id = ?1 AND kind = 'sold')
              + (SELECT COALESCE(SUM(quantity), 0) FROM sale_items
                  WHERE product_id = ?1),
                (SELECT COALESCE(SUM(quantity), 0) FROM stock_movements
                  WHERE product_id = ?1 AND kind = 'adjusted')",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(shopbook_core::report::StockActivityRow {
            product_id: product.id,
            product_name: product.name,
            lines_per_carton: product.lines_per_carton,
            received_lines: received,
            sold_lines: sold,
            adjusted_lines: adjusted,
        })
    }

    async fn require_product(&self, product_id: &str) -> DbResult<Product> {
        fetch_product(&self.pool, product_id)
            .await?
            .ok_or_else(|| DbError::Core(CoreError::ProductNotFound(product_id.to_string())))
    }
}

/// Generates a new movement ID.
pub fn generate_movement_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Shared Queries
// =============================================================================
// Free functions over a generic executor so the sale transaction can run
// the same availability/batch queries inside its own transaction.

pub(crate) async fn insert_movement<'e, E>(executor: E, movement: &StockMovement) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO stock_movements (id, product_id, kind, quantity, unit_cost, note,
                                      corrects_movement_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(movement.kind)
    .bind(movement.quantity)
    .bind(movement.unit_cost)
    .bind(&movement.note)
    .bind(&movement.corrects_movement_id)
    .bind(movement.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn fetch_product<'e, E>(executor: E, product_id: &str) -> DbResult<Option<Product>>
where
    E: SqliteExecutor<'e>,
{
    let product = sqlx::query_as::<_, Product>(
        "SELECT id, name, sku, lines_per_carton, unit_selling_price,
                is_active, created_at, updated_at
         FROM products WHERE id = ?1",
    )
    .bind(product_id)
    .fetch_optional(executor)
    .await?;

    Ok(product)
}

/// No-op UPDATE on the product row. SQLite escalates the transaction to a
/// write lock on the first write statement, so running this BEFORE the
/// availability SELECT serializes concurrent check-and-commit sequences -
/// two sales of the same product cannot both read the same pre-commit
/// stock snapshot.
pub(crate) async fn touch_product<'e, E>(executor: E, product_id: &str) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("UPDATE products SET updated_at = updated_at WHERE id = ?1")
        .bind(product_id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::Core(CoreError::ProductNotFound(
            product_id.to_string(),
        )));
    }

    Ok(())
}

pub(crate) async fn available_stock_q<'e, E>(executor: E, product_id: &str) -> DbResult<i64>
where
    E: SqliteExecutor<'e>,
{
    let available: i64 = sqlx::query_scalar(
        "SELECT (SELECT COALESCE(SUM(CASE kind
                    WHEN 'received' THEN quantity
                    WHEN 'adjusted' THEN quantity
                    ELSE -quantity END), 0)
                 FROM stock_movements WHERE product_id = ?1)
              - (SELECT COALESCE(SUM(quantity), 0)
                 FROM sale_items WHERE product_id = ?1)",
    )
    .bind(product_id)
    .fetch_one(executor)
    .await?;

    Ok(available)
}

pub(crate) async fn consumed_lines_q<'e, E>(executor: E, product_id: &str) -> DbResult<i64>
where
    E: SqliteExecutor<'e>,
{
    let consumed: i64 = sqlx::query_scalar(
        "SELECT (SELECT COALESCE(SUM(quantity), 0)
                 FROM stock_movements WHERE product_id = ?1 AND kind = 'sold')
              + (SELECT COALESCE(SUM(quantity), 0)
                 FROM sale_items WHERE product_id = ?1)",
    )
    .bind(product_id)
    .fetch_one(executor)
    .await?;

    Ok(consumed)
}

/// Received batches with positive quantity, strictly oldest first.
pub(crate) async fn receipt_batches_q<'e, E>(
    executor: E,
    product_id: &str,
) -> DbResult<Vec<ReceiptBatch>>
where
    E: SqliteExecutor<'e>,
{
    let batches = sqlx::query_as::<_, ReceiptBatch>(
        "SELECT quantity, unit_cost FROM stock_movements
         WHERE product_id = ?1 AND kind = 'received' AND quantity > 0
         ORDER BY created_at ASC, rowid ASC",
    )
    .bind(product_id)
    .fetch_all(executor)
    .await?;

    Ok(batches)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::generate_product_id;
    use shopbook_core::Product;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(db: &Database, lines_per_carton: i64) -> String {
        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            name: "Milo Sachet".to_string(),
            sku: None,
            lines_per_carton,
            unit_selling_price: 2.0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap();
        product.id
    }

    #[tokio::test]
    async fn test_record_received_formatted_converts_both_units() {
        let db = test_db().await;
        let product_id = seed_product(&db, 6).await;

        // "2C3L" at 6/carton = 15 lines; GH₵6.00/carton = GH₵1.00/line.
        let movement = db
            .movements()
            .record_received_formatted(&product_id, "2C3L", 6.0)
            .await
            .unwrap();

        assert_eq!(movement.kind, MovementKind::Received);
        assert_eq!(movement.quantity, 15);
        assert!((movement.unit_cost - 1.0).abs() < 1e-9);
        assert_eq!(db.movements().available_stock(&product_id).await.unwrap(), 15);

        // Malformed input never reaches the ledger.
        assert!(db
            .movements()
            .record_received_formatted(&product_id, "3L2C", 6.0)
            .await
            .is_err());
        assert_eq!(db.movements().available_stock(&product_id).await.unwrap(), 15);
    }

    #[tokio::test]
    async fn test_stock_sale_allocates_fifo_cost() {
        let db = test_db().await;
        let product_id = seed_product(&db, 6).await;
        db.movements().record_received(&product_id, 12, 1.00).await.unwrap();
        db.movements().record_received(&product_id, 6, 1.50).await.unwrap();

        let movement = db.movements().record_stock_sale(&product_id, 15).await.unwrap();
        assert_eq!(movement.kind, MovementKind::Sold);
        assert_eq!(movement.quantity, 15);
        // (12×1.00 + 3×1.50) / 15 = 1.10
        assert!((movement.unit_cost - 1.10).abs() < 1e-9);

        assert_eq!(db.movements().available_stock(&product_id).await.unwrap(), 3);
        assert_eq!(db.movements().consumed_lines(&product_id).await.unwrap(), 15);
    }

    #[tokio::test]
    async fn test_stock_sale_rejects_oversell() {
        let db = test_db().await;
        let product_id = seed_product(&db, 6).await;
        db.movements().record_received(&product_id, 6, 1.00).await.unwrap();

        let err = db.movements().record_stock_sale(&product_id, 7).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock {
                available: 6,
                requested: 7,
                ..
            })
        ));

        // Nothing was written.
        assert_eq!(db.movements().available_stock(&product_id).await.unwrap(), 6);
        assert_eq!(db.movements().consumed_lines(&product_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_correct_movement_appends_compensation() {
        let db = test_db().await;
        let product_id = seed_product(&db, 6).await;
        let receipt = db.movements().record_received(&product_id, 12, 1.00).await.unwrap();

        // Receipt was really 10 lines: compensating −2 adjustment.
        let adjustment = db
            .movements()
            .correct_movement(&receipt.id, 10, "typo on receipt form")
            .await
            .unwrap()
            .expect("delta expected");
        assert_eq!(adjustment.kind, MovementKind::Adjusted);
        assert_eq!(adjustment.quantity, -2);
        assert_eq!(db.movements().available_stock(&product_id).await.unwrap(), 10);

        // The original row is untouched.
        let original = db.movements().get_by_id(&receipt.id).await.unwrap().unwrap();
        assert_eq!(original.quantity, 12);

        // A sold correction flips the delta: selling less returns stock.
        let sold = db.movements().record_stock_sale(&product_id, 6).await.unwrap();
        let adjustment = db
            .movements()
            .correct_movement(&sold.id, 4, "customer returned 2")
            .await
            .unwrap()
            .expect("delta expected");
        assert_eq!(adjustment.quantity, 2);
        assert_eq!(db.movements().available_stock(&product_id).await.unwrap(), 6);

        // No-op correction appends nothing.
        assert!(db
            .movements()
            .correct_movement(&sold.id, 4, "same quantity")
            .await
            .unwrap()
            .is_none());
    }

    /// Corrections must compensate against the movement's effective
    /// quantity, not the untouched original row. Re-applying a correction
    /// is a no-op; re-correcting compensates only the difference.
    #[tokio::test]
    async fn test_repeated_corrections_do_not_compound() {
        let db = test_db().await;
        let product_id = seed_product(&db, 6).await;
        let receipt = db.movements().record_received(&product_id, 12, 1.00).await.unwrap();

        db.movements()
            .correct_movement(&receipt.id, 10, "typo")
            .await
            .unwrap()
            .expect("delta expected");
        assert_eq!(db.movements().available_stock(&product_id).await.unwrap(), 10);

        // Same correction again: effective quantity is already 10.
        assert!(db
            .movements()
            .correct_movement(&receipt.id, 10, "typo again")
            .await
            .unwrap()
            .is_none());
        assert_eq!(db.movements().available_stock(&product_id).await.unwrap(), 10);

        // Re-correcting to 11 compensates only the +1 difference.
        let adjustment = db
            .movements()
            .correct_movement(&receipt.id, 11, "recount")
            .await
            .unwrap()
            .expect("delta expected");
        assert_eq!(adjustment.quantity, 1);
        assert_eq!(adjustment.corrects_movement_id.as_deref(), Some(receipt.id.as_str()));
        assert_eq!(db.movements().available_stock(&product_id).await.unwrap(), 11);

        // Same discipline on the sold side: correcting a 6-line sale down
        // to 4 twice must return the 2 lines exactly once.
        let sold = db.movements().record_stock_sale(&product_id, 6).await.unwrap();
        assert_eq!(db.movements().available_stock(&product_id).await.unwrap(), 5);

        db.movements()
            .correct_movement(&sold.id, 4, "customer returned 2")
            .await
            .unwrap()
            .expect("delta expected");
        assert_eq!(db.movements().available_stock(&product_id).await.unwrap(), 7);

        assert!(db
            .movements()
            .correct_movement(&sold.id, 4, "duplicate submission")
            .await
            .unwrap()
            .is_none());
        assert_eq!(db.movements().available_stock(&product_id).await.unwrap(), 7);

        // Further re-correction works from the effective 4, not the
        // original 6.
        let adjustment = db
            .movements()
            .correct_movement(&sold.id, 5, "one came back damaged")
            .await
            .unwrap()
            .expect("delta expected");
        assert_eq!(adjustment.quantity, -1);
        assert_eq!(db.movements().available_stock(&product_id).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_activity_row_formats_through_codec() {
        let db = test_db().await;
        let product_id = seed_product(&db, 6).await;
        db.movements().record_received(&product_id, 18, 1.00).await.unwrap();
        db.movements().record_stock_sale(&product_id, 15).await.unwrap();

        let row = db.movements().activity(&product_id).await.unwrap();
        assert_eq!(row.received_lines, 18);
        assert_eq!(row.sold_lines, 15);
        assert_eq!(row.available_lines(), 3);
        assert_eq!(row.format_received(), "3C");
        assert_eq!(row.format_sold(), "2C3L");
        assert_eq!(row.format_available(), "3L");
    }

    #[tokio::test]
    async fn test_adjustments_are_signed() {
        let db = test_db().await;
        let product_id = seed_product(&db, 6).await;
        db.movements()
            .record_adjustment(&product_id, 10, Some("opening balance"))
            .await
            .unwrap();
        db.movements()
            .record_adjustment(&product_id, -4, Some("damaged"))
            .await
            .unwrap();

        assert_eq!(db.movements().available_stock(&product_id).await.unwrap(), 6);
    }
}
