//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! ## The Frozen Divisor Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lines_per_carton IS LOGICALLY IMMUTABLE                                │
//! │                                                                         │
//! │  Historical quantities are stored as raw line counts and reformatted    │
//! │  through the product's CURRENT divisor. Changing the divisor after      │
//! │  movements exist would silently change the meaning of every             │
//! │  historical "2C3L" on every report.                                     │
//! │                                                                         │
//! │  update() therefore rejects a divisor change once any stock movement    │
//! │  or sale item references the product.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use shopbook_core::error::ValidationError;
use shopbook_core::validation::{
    validate_lines_per_carton, validate_price, validate_product_name,
};
use shopbook_core::{CoreError, Product};

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

const PRODUCT_COLUMNS: &str = "id, name, sku, lines_per_carton, unit_selling_price, \
     is_active, created_at, updated_at";

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists active products ordered by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 ORDER BY name LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// Validates the name, the selling price, and the packing divisor
    /// (1..=8) before touching the database - an invalid divisor fails
    /// loudly here rather than degrading the codec downstream.
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(name = %product.name, "Inserting product");

        validate_product_name(&product.name).map_err(|e| DbError::Core(e.into()))?;
        validate_lines_per_carton(product.lines_per_carton)
            .map_err(|e| DbError::Core(e.into()))?;
        validate_price(product.unit_selling_price).map_err(|e| DbError::Core(e.into()))?;

        sqlx::query(
            "INSERT INTO products (
                id, name, sku, lines_per_carton, unit_selling_price,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.lines_per_carton)
        .bind(product.unit_selling_price)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Updates an existing product.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - Product doesn't exist
    /// * `DbError::Core(Validation)` - attempt to change `lines_per_carton`
    ///   while stock movements or sale items reference the product
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        validate_product_name(&product.name).map_err(|e| DbError::Core(e.into()))?;
        validate_lines_per_carton(product.lines_per_carton)
            .map_err(|e| DbError::Core(e.into()))?;
        validate_price(product.unit_selling_price).map_err(|e| DbError::Core(e.into()))?;

        let existing = self
            .get_by_id(&product.id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &product.id))?;

        if existing.lines_per_carton != product.lines_per_carton
            && self.has_history(&product.id).await?
        {
            return Err(DbError::Core(CoreError::Validation(
                ValidationError::Immutable {
                    field: "lines_per_carton".to_string(),
                    reason: "stock movements reference this product".to_string(),
                },
            )));
        }

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET
                name = ?2,
                sku = ?3,
                lines_per_carton = ?4,
                unit_selling_price = ?5,
                is_active = ?6,
                updated_at = ?7
            WHERE id = ?1",
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.lines_per_carton)
        .bind(product.unit_selling_price)
        .bind(product.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// ## Why Soft Delete?
    /// Historical movements and sale items still reference this product.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Whether any ledger row (movement or sale item) references the product.
    async fn has_history(&self, product_id: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT (SELECT COUNT(*) FROM stock_movements WHERE product_id = ?1)
                  + (SELECT COUNT(*) FROM sale_items WHERE product_id = ?1)",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Tests
// =============================================================================
