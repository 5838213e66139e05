//! # Sale Repository
//!
//! Sale lifecycle with its stock effects, each step in one transaction.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── create(NewSale) → folio allocated, header + lines inserted     │
//! │         status Pending   → no stock effect                             │
//! │         status Completed → payment settled, stock decremented          │
//! │                                                                         │
//! │  2. COMPLETE (pending sales only)                                      │
//! │     └── complete(id, payment) → payment settled, stock decremented     │
//! │                                                                         │
//! │  3. CANCEL                                                             │
//! │     └── cancel(id) → Completed: stock restored                         │
//! │                      Pending:   status only                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write Serialisation
//! The first statement of every transaction here is a write: the header
//! INSERT (which also allocates the folio) or a status UPDATE guarded by the
//! expected current status. SQLite grants one writer at a time, so two
//! sessions completing or cancelling the same sale cannot both pass the
//! guard, and stock is read only after the write lock is held.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::stock::apply_adjustments;
use crate::repository::{insert_items, new_id, ItemRow, ItemTable};
use mostrador_core::pricing::compute_totals;
use mostrador_core::stock::{plan_adjustments, sale_effect};
use mostrador_core::{
    CoreError, DraftLine, Money, MovementReason, PaymentRequest, Percentage, Sale, SaleItem,
    SaleStatus, TransactionDraft,
};

const SALE_COLUMNS: &str = r#"
    id, folio, client_id, status, header_discount_bps, tax_bps,
    subtotal_cents, discount_cents, subtotal_after_discount_cents, tax_cents, total_cents,
    payment_method, tendered_cents, change_cents, notes,
    created_at, updated_at, completed_at, cancelled_at
"#;

/// Everything needed to save a sale.
#[derive(Debug, Clone)]
pub struct NewSale {
    pub client_id: Option<String>,
    /// `Pending` or `Completed`.
    pub status: SaleStatus,
    pub header_discount: Percentage,
    pub tax: Percentage,
    pub lines: Vec<DraftLine>,
    /// Required when `status` is `Completed`; ignored otherwise.
    pub payment: Option<PaymentRequest>,
    pub notes: Option<String>,
}

impl NewSale {
    /// Takes lines, discount, tax, client and notes from a sale draft.
    pub fn from_draft(
        draft: &TransactionDraft,
        status: SaleStatus,
        payment: Option<PaymentRequest>,
    ) -> Self {
        NewSale {
            client_id: draft.party_id.clone(),
            status,
            header_discount: draft.header_discount,
            tax: draft.tax,
            lines: draft.lines.clone(),
            payment,
            notes: draft.notes.clone(),
        }
    }
}

/// Filters for [`SaleRepository::list`]. Unset fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub status: Option<SaleStatus>,
    pub client_id: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Saves a new sale, decrementing stock when it is saved as completed.
    ///
    /// ## Errors
    /// - `Core(EmptyTransaction)` without lines
    /// - `Core(InvalidPayment)` when a completed sale lacks a covering payment
    /// - `NotFound` if a line references an unknown product
    ///
    /// Nothing is written on error.
    pub async fn create(&self, new_sale: NewSale) -> DbResult<Sale> {
        if new_sale.lines.is_empty() {
            return Err(CoreError::EmptyTransaction.into());
        }
        for line in &new_sale.lines {
            line.pricing.validate()?;
        }

        let effect = sale_effect(None, new_sale.status)?;
        let totals = compute_totals(&new_sale.lines, new_sale.header_discount, new_sale.tax);

        let settlement = match new_sale.status {
            SaleStatus::Completed => {
                let payment = new_sale.payment.ok_or_else(|| CoreError::InvalidPayment {
                    reason: "a completed sale needs a payment".to_string(),
                })?;
                Some(payment.settle(totals.total)?)
            }
            _ => None,
        };

        let id = new_id();
        let now = Utc::now();

        debug!(id = %id, status = ?new_sale.status, lines = new_sale.lines.len(), "Creating sale");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, folio, client_id, status, header_discount_bps, tax_bps,
                subtotal_cents, discount_cents, subtotal_after_discount_cents, tax_cents, total_cents,
                payment_method, tendered_cents, change_cents, notes,
                created_at, updated_at, completed_at, cancelled_at
            ) VALUES (
                ?1, (SELECT COALESCE(MAX(folio), 0) + 1 FROM sales), ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14,
                ?15, ?15, ?16, NULL
            )
            "#,
        )
        .bind(&id)
        .bind(&new_sale.client_id)
        .bind(new_sale.status)
        .bind(new_sale.header_discount.bps())
        .bind(new_sale.tax.bps())
        .bind(totals.subtotal.cents())
        .bind(totals.discount.cents())
        .bind(totals.subtotal_after_discount.cents())
        .bind(totals.tax.cents())
        .bind(totals.total.cents())
        .bind(settlement.map(|s| s.method))
        .bind(settlement.and_then(|s| s.tendered).map(|m| m.cents()))
        .bind(settlement.and_then(|s| s.change).map(|m| m.cents()))
        .bind(&new_sale.notes)
        .bind(now)
        .bind(settlement.map(|_| now))
        .execute(&mut *tx)
        .await?;

        insert_items(&mut *tx, ItemTable::Sale, &id, &new_sale.lines, now).await?;

        if let Some(direction) = effect {
            let plan = plan_adjustments(&new_sale.lines, direction);
            apply_adjustments(&mut *tx, &plan, MovementReason::SaleCompleted, Some(&id)).await?;
        }

        let sale = fetch_sale(&mut *tx, &id).await?;
        tx.commit().await?;

        info!(
            id = %sale.id,
            folio = sale.folio,
            status = ?sale.status,
            total_cents = sale.total_cents,
            "Sale saved"
        );

        Ok(sale)
    }

    /// Completes a pending sale: settles the payment against the stored
    /// total and decrements stock.
    pub async fn complete(&self, sale_id: &str, payment: PaymentRequest) -> DbResult<Sale> {
        debug!(id = %sale_id, method = ?payment.method, "Completing sale");

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        if !transition(&mut *tx, sale_id, SaleStatus::Pending, SaleStatus::Completed, now).await? {
            return Err(rejected_transition(&mut *tx, sale_id, SaleStatus::Completed).await);
        }

        let total: i64 = sqlx::query_scalar("SELECT total_cents FROM sales WHERE id = ?1")
            .bind(sale_id)
            .fetch_one(&mut *tx)
            .await?;

        let settlement = payment.settle(Money::from_cents(total))?;

        sqlx::query(
            r#"
            UPDATE sales SET payment_method = ?2, tendered_cents = ?3, change_cents = ?4
            WHERE id = ?1
            "#,
        )
        .bind(sale_id)
        .bind(settlement.method)
        .bind(settlement.tendered.map(|m| m.cents()))
        .bind(settlement.change.map(|m| m.cents()))
        .execute(&mut *tx)
        .await?;

        if let Some(direction) = sale_effect(Some(SaleStatus::Pending), SaleStatus::Completed)? {
            let items = fetch_items(&mut *tx, sale_id).await?;
            let plan = plan_adjustments(&items, direction);
            apply_adjustments(&mut *tx, &plan, MovementReason::SaleCompleted, Some(sale_id)).await?;
        }

        let sale = fetch_sale(&mut *tx, sale_id).await?;
        tx.commit().await?;

        info!(id = %sale.id, folio = sale.folio, total_cents = sale.total_cents, "Sale completed");
        Ok(sale)
    }

    /// Cancels a sale. A completed sale gets its full quantities back in
    /// stock; a pending one only changes status.
    pub async fn cancel(&self, sale_id: &str) -> DbResult<Sale> {
        debug!(id = %sale_id, "Cancelling sale");

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let from = if transition(&mut *tx, sale_id, SaleStatus::Completed, SaleStatus::Cancelled, now).await? {
            SaleStatus::Completed
        } else if transition(&mut *tx, sale_id, SaleStatus::Pending, SaleStatus::Cancelled, now).await? {
            SaleStatus::Pending
        } else {
            return Err(rejected_transition(&mut *tx, sale_id, SaleStatus::Cancelled).await);
        };

        if let Some(direction) = sale_effect(Some(from), SaleStatus::Cancelled)? {
            let items = fetch_items(&mut *tx, sale_id).await?;
            let plan = plan_adjustments(&items, direction);
            apply_adjustments(&mut *tx, &plan, MovementReason::SaleCancelled, Some(sale_id)).await?;
        }

        let sale = fetch_sale(&mut *tx, sale_id).await?;
        tx.commit().await?;

        info!(id = %sale.id, folio = sale.folio, was = ?from, "Sale cancelled");
        Ok(sale)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {} FROM sales WHERE id = ?1", SALE_COLUMNS);

        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    pub async fn get_by_folio(&self, folio: i64) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {} FROM sales WHERE folio = ?1", SALE_COLUMNS);

        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(folio)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Lines of a sale in the order they were entered.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let rows = sqlx::query_as::<_, ItemRow>(ItemTable::Sale.select_sql())
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(ItemRow::into_sale_item)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Sales matching `filter`, newest folio first.
    pub async fn list(&self, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM sales WHERE 1 = 1", SALE_COLUMNS));

        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(client_id) = &filter.client_id {
            qb.push(" AND client_id = ").push_bind(client_id.clone());
        }
        if let Some(from) = filter.from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND created_at < ").push_bind(to);
        }
        qb.push(" ORDER BY folio DESC LIMIT ")
            .push_bind(filter.limit.unwrap_or(100));

        let sales = qb.build_query_as::<Sale>().fetch_all(&self.pool).await?;
        Ok(sales)
    }
}

// =============================================================================
// Transaction Steps
// =============================================================================

/// Moves a sale from `from` to `to` if it is still in `from`.
/// Returns false when the guard did not match.
async fn transition(
    conn: &mut SqliteConnection,
    sale_id: &str,
    from: SaleStatus,
    to: SaleStatus,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE sales SET
            status = ?3,
            updated_at = ?4,
            completed_at = CASE WHEN ?3 = 'completed' THEN ?4 ELSE completed_at END,
            cancelled_at = CASE WHEN ?3 = 'cancelled' THEN ?4 ELSE cancelled_at END
        WHERE id = ?1 AND status = ?2
        "#,
    )
    .bind(sale_id)
    .bind(from)
    .bind(to)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// The error for a guarded transition that matched no row.
async fn rejected_transition(conn: &mut SqliteConnection, sale_id: &str, to: SaleStatus) -> DbError {
    let current = sqlx::query_scalar::<_, SaleStatus>("SELECT status FROM sales WHERE id = ?1")
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await;

    match current {
        Ok(Some(from)) => CoreError::transition("sale", from, to).into(),
        Ok(None) => DbError::not_found("Sale", sale_id),
        Err(e) => e.into(),
    }
}

async fn fetch_sale(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Sale> {
    let sql = format!("SELECT {} FROM sales WHERE id = ?1", SALE_COLUMNS);

    sqlx::query_as::<_, Sale>(&sql)
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Sale", sale_id))
}

async fn fetch_items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
    let rows = sqlx::query_as::<_, ItemRow>(ItemTable::Sale.select_sql())
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;

    let items = rows
        .into_iter()
        .map(ItemRow::into_sale_item)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(items)
}
