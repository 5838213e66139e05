//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! ## Key Operations
//! - Search by code or description
//! - CRUD with soft delete
//! - Low-stock listing
//! - Manual stock corrections, logged like any other movement
//!
//! ## Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  User types: "arroz"                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  code LIKE '%arroz%' OR description LIKE '%arroz%'  (active only)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  exact code match first, then by description                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::like_pattern;
use crate::repository::stock::apply_adjustments;
use mostrador_core::{MovementReason, Product, StockAdjustment, StockDirection, StockMovement};

const PRODUCT_COLUMNS: &str = r#"
    id, code, description, category, unit,
    purchase_price_cents, sale_price_cents, stock,
    is_active, created_at, updated_at
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let results = repo.search("arroz", 20).await?;
/// let product = repo.get_by_code("ARZ-1KG").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Searches active products by code or description.
    ///
    /// An empty query lists active products by description.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list_active(limit).await;
        }

        let sql = format!(
            r#"
            SELECT {}
            FROM products
            WHERE is_active = 1
              AND (code LIKE ?1 ESCAPE '\' OR description LIKE ?1 ESCAPE '\')
            ORDER BY (code = ?2 COLLATE NOCASE) DESC, description
            LIMIT ?3
            "#,
            PRODUCT_COLUMNS
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(like_pattern(query))
            .bind(query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Lists active products ordered by description.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE is_active = 1 ORDER BY description LIMIT ?1",
            PRODUCT_COLUMNS
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Gets a product by ID, including soft-deleted ones.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its business code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE code = ?1", PRODUCT_COLUMNS);

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - code already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(code = %product.code, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, code, description, category, unit,
                purchase_price_cents, sale_price_cents, stock,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.description)
        .bind(&product.category)
        .bind(&product.unit)
        .bind(product.purchase_price_cents)
        .bind(product.sale_price_cents)
        .bind(product.stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("code", &product.code),
            other => other,
        })?;

        info!(id = %product.id, code = %product.code, "Product created");
        Ok(product.clone())
    }

    /// Updates catalog fields of a product.
    ///
    /// Stock is not touched here: it only changes through sales, purchases
    /// and [`adjust_stock`](Self::adjust_stock), so every change is logged.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                code = ?2,
                description = ?3,
                category = ?4,
                unit = ?5,
                purchase_price_cents = ?6,
                sale_price_cents = ?7,
                is_active = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.description)
        .bind(&product.category)
        .bind(&product.unit)
        .bind(product.purchase_price_cents)
        .bind(product.sale_price_cents)
        .bind(product.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("code", &product.code),
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Soft-deletes a product. Past sales and purchases keep referencing it.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Active products with stock at or below `threshold`, lowest first.
    pub async fn low_stock(&self, threshold: i64) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE is_active = 1 AND stock <= ?1 ORDER BY stock, description",
            PRODUCT_COLUMNS
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(threshold)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Manual inventory correction by `delta` units.
    ///
    /// Negative deltas clamp at zero like any decrement. The change is
    /// recorded as a [`MovementReason::Manual`] movement.
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<StockMovement> {
        debug!(id = %id, delta = %delta, "Manual stock adjustment");

        let adjustment = StockAdjustment {
            product_id: id.to_string(),
            quantity: delta.abs(),
            direction: if delta < 0 {
                StockDirection::Decrement
            } else {
                StockDirection::Increment
            },
        };

        let mut tx = self.pool.begin().await?;
        let mut movements =
            apply_adjustments(&mut *tx, &[adjustment], MovementReason::Manual, None).await?;
        tx.commit().await?;

        let movement = movements
            .pop()
            .ok_or_else(|| DbError::Internal("no movement recorded".to_string()))?;

        info!(
            id = %id,
            before = movement.stock_before,
            after = movement.stock_after,
            "Stock corrected manually"
        );
        Ok(movement)
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{db, product};

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = db().await;
        let p = product("ARZ-1KG", "Arroz 1kg", 10);
        db.products().insert(&p).await.unwrap();

        let by_id = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(by_id.code, "ARZ-1KG");
        assert_eq!(by_id.stock, 10);

        let by_code = db.products().get_by_code("ARZ-1KG").await.unwrap().unwrap();
        assert_eq!(by_code.id, p.id);
        assert!(db.products().get_by_code("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = db().await;
        db.products().insert(&product("ARZ-1KG", "Arroz 1kg", 1)).await.unwrap();

        let err = db
            .products()
            .insert(&product("ARZ-1KG", "Otro arroz", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "code"));
    }

    #[tokio::test]
    async fn test_search_by_code_and_description() {
        let db = db().await;
        let repo = db.products();
        repo.insert(&product("ARZ-1KG", "Arroz 1kg", 5)).await.unwrap();
        repo.insert(&product("FRJ-1KG", "Frijol negro 1kg", 5)).await.unwrap();
        repo.insert(&product("ACE-1L", "Aceite 1L", 5)).await.unwrap();

        assert_eq!(repo.search("arroz", 10).await.unwrap().len(), 1);
        assert_eq!(repo.search("1kg", 10).await.unwrap().len(), 2);
        assert_eq!(repo.search("", 10).await.unwrap().len(), 3);

        let exact = repo.search("ace-1l", 10).await.unwrap();
        assert_eq!(exact[0].code, "ACE-1L");
    }

    #[tokio::test]
    async fn test_soft_delete_hides_from_search() {
        let db = db().await;
        let p = product("ARZ-1KG", "Arroz 1kg", 5);
        db.products().insert(&p).await.unwrap();

        db.products().soft_delete(&p.id).await.unwrap();

        assert!(db.products().search("arroz", 10).await.unwrap().is_empty());
        assert_eq!(db.products().count().await.unwrap(), 0);
        assert!(!db.products().get_by_id(&p.id).await.unwrap().unwrap().is_active);
        assert!(matches!(
            db.products().soft_delete("missing").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_stock() {
        let db = db().await;
        let mut p = product("ARZ-1KG", "Arroz 1kg", 7);
        db.products().insert(&p).await.unwrap();

        p.sale_price_cents = 2_700;
        p.stock = 999;
        db.products().update(&p).await.unwrap();

        let stored = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(stored.sale_price_cents, 2_700);
        assert_eq!(stored.stock, 7);
    }

    #[tokio::test]
    async fn test_low_stock() {
        let db = db().await;
        let repo = db.products();
        repo.insert(&product("A", "Agotado", 0)).await.unwrap();
        repo.insert(&product("B", "Bajo", 3)).await.unwrap();
        repo.insert(&product("C", "Completo", 50)).await.unwrap();

        let low = repo.low_stock(5).await.unwrap();
        let codes: Vec<_> = low.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, ["A", "B"]);
    }

    #[tokio::test]
    async fn test_adjust_stock_logs_and_clamps() {
        let db = db().await;
        let p = product("ARZ-1KG", "Arroz 1kg", 4);
        db.products().insert(&p).await.unwrap();

        let up = db.products().adjust_stock(&p.id, 6).await.unwrap();
        assert_eq!((up.stock_before, up.stock_after), (4, 10));

        let down = db.products().adjust_stock(&p.id, -15).await.unwrap();
        assert_eq!(down.stock_after, 0);
        assert!(down.clamped);
        assert_eq!(down.reason, MovementReason::Manual);

        let history = db.stock().list_for_product(&p.id, 10).await.unwrap();
        assert_eq!(history.len(), 2);

        assert!(matches!(
            db.products().adjust_stock("missing", 1).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
