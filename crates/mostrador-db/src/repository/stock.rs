//! # Stock Repository
//!
//! The read-compute-write protocol for stock, plus the movement log.
//!
//! ## Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_adjustments(&mut tx, adjustments, reason, reference)            │
//! │                                                                         │
//! │  for each adjustment (one per product):                                │
//! │    1. touch the product row        → takes the write lock, 404 check   │
//! │    2. read stock                                                        │
//! │    3. core::stock::apply_stock     → before / after / clamped          │
//! │    4. write stock                                                       │
//! │    5. append stock_movements row                                       │
//! │                                                                         │
//! │  Runs on the caller's transaction: the whole sale or purchase commits  │
//! │  or rolls back together with its stock changes.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use mostrador_core::stock::apply_stock;
use mostrador_core::{MovementReason, StockAdjustment, StockMovement};

const MOVEMENT_COLUMNS: &str = r#"
    id, product_id, direction, quantity, stock_before, stock_after,
    clamped, reason, reference_id, created_at
"#;

/// Applies stock adjustments on an open connection, normally `&mut *tx`.
///
/// ## Returns
/// The movements written, in adjustment order.
///
/// ## Errors
/// `DbError::NotFound` if a product does not exist. The caller's
/// transaction should then be dropped, which rolls everything back.
pub async fn apply_adjustments(
    conn: &mut SqliteConnection,
    adjustments: &[StockAdjustment],
    reason: MovementReason,
    reference_id: Option<&str>,
) -> DbResult<Vec<StockMovement>> {
    let mut movements = Vec::with_capacity(adjustments.len());

    for adjustment in adjustments {
        let now = Utc::now();

        let touched = sqlx::query("UPDATE products SET updated_at = ?1 WHERE id = ?2")
            .bind(now)
            .bind(&adjustment.product_id)
            .execute(&mut *conn)
            .await?;

        if touched.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &adjustment.product_id));
        }

        let current: i64 = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(&adjustment.product_id)
            .fetch_one(&mut *conn)
            .await?;

        let change = apply_stock(current, adjustment.quantity, adjustment.direction);

        if change.clamped {
            warn!(
                product_id = %adjustment.product_id,
                stock = current,
                requested = adjustment.quantity,
                ?reason,
                "Stock decrement clamped at zero"
            );
        }

        sqlx::query("UPDATE products SET stock = ?1 WHERE id = ?2")
            .bind(change.after)
            .bind(&adjustment.product_id)
            .execute(&mut *conn)
            .await?;

        let movement = StockMovement {
            id: new_id(),
            product_id: adjustment.product_id.clone(),
            direction: adjustment.direction,
            quantity: adjustment.quantity,
            stock_before: change.before,
            stock_after: change.after,
            clamped: change.clamped,
            reason,
            reference_id: reference_id.map(str::to_string),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, product_id, direction, quantity, stock_before, stock_after,
                clamped, reason, reference_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.product_id)
        .bind(movement.direction)
        .bind(movement.quantity)
        .bind(movement.stock_before)
        .bind(movement.stock_after)
        .bind(movement.clamped)
        .bind(movement.reason)
        .bind(&movement.reference_id)
        .bind(movement.created_at)
        .execute(&mut *conn)
        .await?;

        debug!(
            product_id = %movement.product_id,
            before = movement.stock_before,
            after = movement.stock_after,
            "Stock adjusted"
        );

        movements.push(movement);
    }

    Ok(movements)
}

/// Read access to the movement log.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Most recent movements of a product, newest first.
    pub async fn list_for_product(&self, product_id: &str, limit: u32) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {} FROM stock_movements WHERE product_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            MOVEMENT_COLUMNS
        );

        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(product_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Movements caused by one sale or purchase, in the order applied.
    pub async fn list_for_reference(&self, reference_id: &str) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {} FROM stock_movements WHERE reference_id = ?1 ORDER BY rowid",
            MOVEMENT_COLUMNS
        );

        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(reference_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }
}
