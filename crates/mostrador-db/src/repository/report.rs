//! # Report Repository
//!
//! Aggregates over a `[from, to)` range of `created_at`. Only completed
//! sales count as revenue; pending and cancelled ones are counted apart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use mostrador_core::PaymentMethod;

/// Revenue of completed sales in a period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub sale_count: i64,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub cancelled_count: i64,
    pub pending_count: i64,
    pub by_payment_method: Vec<PaymentBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBreakdown {
    pub method: PaymentMethod,
    pub count: i64,
    pub total_cents: i64,
}

/// Spend on active purchases in a period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseSummary {
    pub purchase_count: i64,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub cancelled_count: i64,
}

/// A best seller. `revenue_cents` is the sum of line subtotals, before
/// header discount and tax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: String,
    pub code: String,
    pub description: String,
    pub quantity: i64,
    pub revenue_cents: i64,
}

/// Stock on hand valued at cost and at retail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InventoryValuation {
    pub product_count: i64,
    pub units: i64,
    pub cost_value_cents: i64,
    pub retail_value_cents: i64,
}

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    pub async fn sales_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<SalesSummary> {
        debug!(%from, %to, "Building sales summary");

        let (sale_count, subtotal_cents, discount_cents, tax_cents, total_cents, cancelled_count, pending_count) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64, i64, i64)>(
                r#"
                SELECT
                    COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'completed' THEN subtotal_cents ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'completed' THEN discount_cents ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'completed' THEN tax_cents ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'completed' THEN total_cents ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'cancelled' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0)
                FROM sales
                WHERE created_at >= ?1 AND created_at < ?2
                "#,
            )
            .bind(from)
            .bind(to)
            .fetch_one(&self.pool)
            .await?;

        let by_payment_method = sqlx::query_as::<_, PaymentBreakdown>(
            r#"
            SELECT payment_method AS method, COUNT(*) AS count, COALESCE(SUM(total_cents), 0) AS total_cents
            FROM sales
            WHERE status = 'completed'
              AND payment_method IS NOT NULL
              AND created_at >= ?1 AND created_at < ?2
            GROUP BY payment_method
            ORDER BY total_cents DESC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(SalesSummary {
            sale_count,
            subtotal_cents,
            discount_cents,
            tax_cents,
            total_cents,
            cancelled_count,
            pending_count,
            by_payment_method,
        })
    }

    pub async fn purchase_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<PurchaseSummary> {
        debug!(%from, %to, "Building purchase summary");

        let summary = sqlx::query_as::<_, PurchaseSummary>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'active' THEN 1 ELSE 0 END), 0) AS purchase_count,
                COALESCE(SUM(CASE WHEN status = 'active' THEN subtotal_cents ELSE 0 END), 0) AS subtotal_cents,
                COALESCE(SUM(CASE WHEN status = 'active' THEN discount_cents ELSE 0 END), 0) AS discount_cents,
                COALESCE(SUM(CASE WHEN status = 'active' THEN tax_cents ELSE 0 END), 0) AS tax_cents,
                COALESCE(SUM(CASE WHEN status = 'active' THEN total_cents ELSE 0 END), 0) AS total_cents,
                COALESCE(SUM(CASE WHEN status = 'cancelled' THEN 1 ELSE 0 END), 0) AS cancelled_count
            FROM purchases
            WHERE created_at >= ?1 AND created_at < ?2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Products with the most units sold in completed sales.
    pub async fn top_products(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: u32,
    ) -> DbResult<Vec<TopProduct>> {
        let top = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT
                si.product_id AS product_id,
                p.code AS code,
                p.description AS description,
                SUM(si.quantity) AS quantity,
                SUM(si.subtotal_cents) AS revenue_cents
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            JOIN products p ON p.id = si.product_id
            WHERE s.status = 'completed'
              AND s.created_at >= ?1 AND s.created_at < ?2
            GROUP BY si.product_id, p.code, p.description
            ORDER BY quantity DESC, revenue_cents DESC
            LIMIT ?3
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(top)
    }

    /// Valuation of active products' current stock.
    pub async fn inventory_valuation(&self) -> DbResult<InventoryValuation> {
        let valuation = sqlx::query_as::<_, InventoryValuation>(
            r#"
            SELECT
                COUNT(*) AS product_count,
                COALESCE(SUM(stock), 0) AS units,
                COALESCE(SUM(stock * purchase_price_cents), 0) AS cost_value_cents,
                COALESCE(SUM(stock * sale_price_cents), 0) AS retail_value_cents
            FROM products
            WHERE is_active = 1
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(valuation)
    }
}
