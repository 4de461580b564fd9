//! # Sale Repository
//!
//! Recording and reading sales, plus the report aggregates built on them.
//!
//! ## The Sale Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_sale() - ONE write transaction, all or nothing                  │
//! │                                                                         │
//! │  1. INSERT sale shell (totals pending)                                  │
//! │  2. per line:                                                           │
//! │     a. touch product row        ← takes the write lock, serializing     │
//! │                                   concurrent availability checks        │
//! │     b. codec: cartons → lines, carton price → line price                │
//! │     c. availability check       ← sees this sale's earlier items too    │
//! │     d. FIFO cost allocation     ← Insufficient → roll back, no zeros    │
//! │     e. INSERT sale item (prices frozen)                                 │
//! │  3. payment-type gate on the summed total                               │
//! │  4. UPDATE sale totals, COMMIT                                          │
//! │                                                                         │
//! │  Any error on the way drops the transaction: no partial fulfillment,    │
//! │  no orphan rows, no stock ever driven negative by a sale.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::movement::{
    available_stock_q, consumed_lines_q, fetch_product, receipt_batches_q, touch_product,
};
use shopbook_core::error::ValidationError;
use shopbook_core::fifo::{allocate_cost, Allocation, DepletionMode};
use shopbook_core::report::{DailySalesSummary, ProfitRow};
use shopbook_core::validation::{validate_price, validate_quantity};
use shopbook_core::{
    validate_payment, CoreError, Packing, PaymentType, Sale, SaleItem,
};

// =============================================================================
// Input Types
// =============================================================================

/// One line of a sale request, in display units.
///
/// The sale form takes quantities the way the shop counts them: whole
/// cartons plus loose lines ("2 cartons and 3 lines"). Prices arrive per
/// carton; the codec converts both before anything is stored.
#[derive(Debug, Clone)]
pub struct NewSaleLine {
    pub product_id: String,
    pub quantity_cartons: i64,
    /// Loose lines on top of the whole cartons.
    pub quantity_lines: i64,
    pub unit_selling_price_per_carton: f64,
}

/// A sale request from the (out-of-scope) sale creation flow.
#[derive(Debug, Clone)]
pub struct NewSale {
    pub lines: Vec<NewSaleLine>,
    pub payment_type: PaymentType,
    pub amount_paid: f64,
    pub customer_name: Option<String>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

const SALE_COLUMNS: &str =
    "id, receipt_number, payment_type, total, amount_paid, customer_name, created_at";

const SALE_ITEM_COLUMNS: &str = "id, sale_id, product_id, name_snapshot, quantity, \
     unit_selling_price, unit_cost_price, total, created_at";

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Records a sale with the default (cumulative) FIFO depletion mode.
    pub async fn record_sale(&self, new_sale: NewSale) -> DbResult<Sale> {
        self.record_sale_with_mode(new_sale, DepletionMode::default())
            .await
    }

    /// Records a sale, atomically.
    ///
    /// See the module docs for the transaction walk-through. `mode` selects
    /// between true per-batch depletion (default) and the
    /// legacy-compatible full-history re-walk.
    pub async fn record_sale_with_mode(
        &self,
        new_sale: NewSale,
        mode: DepletionMode,
    ) -> DbResult<Sale> {
        if new_sale.lines.is_empty() {
            return Err(DbError::Core(CoreError::Validation(
                ValidationError::Required {
                    field: "sale lines".to_string(),
                },
            )));
        }

        let sale_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let receipt_number = generate_receipt_number(&sale_id, now);

        debug!(sale_id = %sale_id, lines = new_sale.lines.len(), "Recording sale");

        let mut tx = self.pool.begin().await?;

        // Sale shell first so item FKs resolve; totals follow once every
        // line has passed its checks.
        let mut sale = Sale {
            id: sale_id.clone(),
            receipt_number,
            payment_type: new_sale.payment_type,
            total: 0.0,
            amount_paid: new_sale.amount_paid,
            customer_name: new_sale.customer_name.clone(),
            created_at: now,
        };
        insert_sale(&mut *tx, &sale).await?;

        let mut total = 0.0f64;

        for line in &new_sale.lines {
            // Write lock before the availability read (oversell race).
            touch_product(&mut *tx, &line.product_id).await?;

            let product = fetch_product(&mut *tx, &line.product_id)
                .await?
                .ok_or_else(|| {
                    DbError::Core(CoreError::ProductNotFound(line.product_id.clone()))
                })?;

            let packing = product.packing();

            validate_price(line.unit_selling_price_per_carton)
                .map_err(|e| DbError::Core(e.into()))?;

            let quantity_lines = packing.to_lines(line.quantity_cartons) + line.quantity_lines;
            validate_quantity(quantity_lines).map_err(|e| DbError::Core(e.into()))?;

            let unit_selling_price = packing.price_per_line(line.unit_selling_price_per_carton);

            // Pre-check: no sale may drive available stock negative. The
            // sum already counts this sale's earlier items, so repeated
            // lines of one product cannot sneak past it.
            let available = available_stock_q(&mut *tx, &line.product_id).await?;
            if available < quantity_lines {
                return Err(DbError::Core(CoreError::InsufficientStock {
                    product: product.name,
                    available,
                    requested: quantity_lines,
                }));
            }

            let batches = receipt_batches_q(&mut *tx, &line.product_id).await?;
            let consumed = consumed_lines_q(&mut *tx, &line.product_id).await?;

            let unit_cost_price = match allocate_cost(&batches, quantity_lines, consumed, mode) {
                Allocation::Allocated { unit_cost } => unit_cost,
                Allocation::Insufficient { shortfall } => {
                    // The legacy system silently costed this at zero.
                    return Err(DbError::Core(CoreError::InsufficientCostHistory {
                        product: product.name,
                        shortfall,
                    }));
                }
            };

            let line_total = unit_selling_price * quantity_lines as f64;
            total += line_total;

            let item = SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.clone(),
                product_id: line.product_id.clone(),
                name_snapshot: product.name,
                quantity: quantity_lines,
                unit_selling_price,
                unit_cost_price,
                total: line_total,
                created_at: now,
            };
            insert_sale_item(&mut *tx, &item).await?;
        }

        // The acceptance gate: a violation rolls the whole sale back.
        validate_payment(new_sale.payment_type, total, new_sale.amount_paid)
            .map_err(DbError::Core)?;

        sqlx::query("UPDATE sales SET total = ?2 WHERE id = ?1")
            .bind(&sale_id)
            .bind(total)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        sale.total = total;
        info!(
            sale_id = %sale.id,
            receipt_number = %sale.receipt_number,
            total = sale.total,
            payment_type = sale.payment_type.as_str(),
            "Sale recorded"
        );

        Ok(sale)
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets all items for a sale.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(&format!(
            "SELECT {SALE_ITEM_COLUMNS} FROM sale_items \
             WHERE sale_id = ?1 ORDER BY created_at, rowid"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Deletes a sale and (via cascade) its items.
    ///
    /// The consumed stock flows back automatically: availability is a sum
    /// over live rows, and the rows are gone. Costs on OTHER historical
    /// sales are never recomputed.
    pub async fn delete_sale(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Core(CoreError::SaleNotFound(id.to_string())));
        }

        info!(sale_id = %id, "Sale deleted");
        Ok(())
    }

    /// Builds the daily sales summary for one calendar day.
    pub async fn daily_sales(&self, day: NaiveDate) -> DbResult<DailySalesSummary> {
        let day_str = day.format("%Y-%m-%d").to_string();

        let sales: Vec<(PaymentType, f64, f64)> = sqlx::query_as(
            "SELECT payment_type, total, amount_paid FROM sales
             WHERE date(created_at) = ?1",
        )
        .bind(&day_str)
        .fetch_all(&self.pool)
        .await?;

        // Per-product sold lines for the day, formatted with each
        // product's own packing and joined for display.
        let per_product: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT p.lines_per_carton, COALESCE(SUM(si.quantity), 0)
             FROM sale_items si
             JOIN sales s ON s.id = si.sale_id
             JOIN products p ON p.id = si.product_id
             WHERE date(s.created_at) = ?1
             GROUP BY p.id
             ORDER BY p.name",
        )
        .bind(&day_str)
        .fetch_all(&self.pool)
        .await?;

        let formatted: Vec<String> = per_product
            .into_iter()
            .map(|(lines_per_carton, sold)| Packing::of(lines_per_carton).format_lines(sold))
            .collect();

        Ok(DailySalesSummary::build(&sales, &formatted))
    }

    /// Profit analysis rows for sales in `[from, to)`.
    ///
    /// Works from the frozen snapshot prices on each item, so the figures
    /// never shift when later receipts arrive.
    pub async fn profit_rows(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<ProfitRow>> {
        let items = sqlx::query_as::<_, SaleItem>(&format!(
            "SELECT si.{} FROM sale_items si
             JOIN sales s ON s.id = si.sale_id
             WHERE s.created_at >= ?1 AND s.created_at < ?2
             ORDER BY s.created_at, si.rowid",
            SALE_ITEM_COLUMNS.replace(", ", ", si."),
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(items.iter().map(ProfitRow::from_item).collect())
    }
}

// =============================================================================
// Insert Helpers
// =============================================================================

async fn insert_sale<'e, E>(executor: E, sale: &Sale) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO sales (id, receipt_number, payment_type, total, amount_paid,
                            customer_name, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(&sale.id)
    .bind(&sale.receipt_number)
    .bind(sale.payment_type)
    .bind(sale.total)
    .bind(sale.amount_paid)
    .bind(&sale.customer_name)
    .bind(sale.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

async fn insert_sale_item<'e, E>(executor: E, item: &SaleItem) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO sale_items (id, sale_id, product_id, name_snapshot, quantity,
                                 unit_selling_price, unit_cost_price, total, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(&item.name_snapshot)
    .bind(item.quantity)
    .bind(item.unit_selling_price)
    .bind(item.unit_cost_price)
    .bind(item.total)
    .bind(item.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Generates a receipt number: `YYYYMMDD-XXXXXXXX`.
///
/// The suffix comes from the sale's own UUID, so uniqueness needs no
/// daily counter.
fn generate_receipt_number(sale_id: &str, at: DateTime<Utc>) -> String {
    let date_part = at.format("%Y%m%d");
    let suffix: String = sale_id.chars().take(8).collect();
    format!("{date_part}-{suffix}")
}

// =============================================================================
// Tests
// =============================================================================
