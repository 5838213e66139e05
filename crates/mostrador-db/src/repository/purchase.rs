//! # Purchase Repository
//!
//! Purchases are effective as soon as they are saved: stock goes up in the
//! same transaction that inserts the purchase, and comes back down (clamped
//! at zero) when it is cancelled.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::stock::apply_adjustments;
use crate::repository::{insert_items, new_id, ItemRow, ItemTable};
use mostrador_core::pricing::compute_totals;
use mostrador_core::stock::{plan_adjustments, purchase_effect};
use mostrador_core::{
    CoreError, CoreResult, DraftLine, MovementReason, PaymentMethod, Percentage, Purchase,
    PurchaseItem, PurchaseStatus, TransactionDraft, ValidationError,
};

const PURCHASE_COLUMNS: &str = r#"
    id, folio, supplier_id, status, header_discount_bps, tax_bps,
    subtotal_cents, discount_cents, subtotal_after_discount_cents, tax_cents, total_cents,
    payment_method, notes, created_at, updated_at, cancelled_at
"#;

#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub supplier_id: String,
    pub header_discount: Percentage,
    pub tax: Percentage,
    pub payment_method: PaymentMethod,
    pub lines: Vec<DraftLine>,
    pub notes: Option<String>,
}

impl NewPurchase {
    /// Builds a purchase from a purchase draft. The draft must name a supplier.
    pub fn from_draft(draft: &TransactionDraft, payment_method: PaymentMethod) -> CoreResult<Self> {
        let supplier_id = draft.party_id.clone().ok_or_else(|| ValidationError::Required {
            field: "supplier".to_string(),
        })?;

        Ok(NewPurchase {
            supplier_id,
            header_discount: draft.header_discount,
            tax: draft.tax,
            payment_method,
            lines: draft.lines.clone(),
            notes: draft.notes.clone(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct PurchaseFilter {
    pub supplier_id: Option<String>,
    pub status: Option<PurchaseStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Saves a purchase and increments stock for every line.
    pub async fn create(&self, new_purchase: NewPurchase) -> DbResult<Purchase> {
        if new_purchase.lines.is_empty() {
            return Err(CoreError::EmptyTransaction.into());
        }
        for line in &new_purchase.lines {
            line.pricing.validate()?;
        }

        let effect = purchase_effect(None, PurchaseStatus::Active)?;
        let totals = compute_totals(
            &new_purchase.lines,
            new_purchase.header_discount,
            new_purchase.tax,
        );

        let id = new_id();
        let now = Utc::now();

        debug!(
            id = %id,
            supplier_id = %new_purchase.supplier_id,
            lines = new_purchase.lines.len(),
            "Creating purchase"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, folio, supplier_id, status, header_discount_bps, tax_bps,
                subtotal_cents, discount_cents, subtotal_after_discount_cents, tax_cents, total_cents,
                payment_method, notes, created_at, updated_at, cancelled_at
            ) VALUES (
                ?1, (SELECT COALESCE(MAX(folio), 0) + 1 FROM purchases), ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?13, NULL
            )
            "#,
        )
        .bind(&id)
        .bind(&new_purchase.supplier_id)
        .bind(PurchaseStatus::Active)
        .bind(new_purchase.header_discount.bps())
        .bind(new_purchase.tax.bps())
        .bind(totals.subtotal.cents())
        .bind(totals.discount.cents())
        .bind(totals.subtotal_after_discount.cents())
        .bind(totals.tax.cents())
        .bind(totals.total.cents())
        .bind(new_purchase.payment_method)
        .bind(&new_purchase.notes)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        insert_items(&mut *tx, ItemTable::Purchase, &id, &new_purchase.lines, now).await?;

        if let Some(direction) = effect {
            let plan = plan_adjustments(&new_purchase.lines, direction);
            apply_adjustments(&mut *tx, &plan, MovementReason::PurchaseCreated, Some(&id)).await?;
        }

        let purchase = fetch_purchase(&mut *tx, &id).await?;
        tx.commit().await?;

        info!(
            id = %purchase.id,
            folio = purchase.folio,
            total_cents = purchase.total_cents,
            "Purchase saved"
        );

        Ok(purchase)
    }

    /// Cancels an active purchase, taking its quantities back out of stock.
    /// Products already sold below the purchased quantity clamp at zero.
    pub async fn cancel(&self, purchase_id: &str) -> DbResult<Purchase> {
        debug!(id = %purchase_id, "Cancelling purchase");

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE purchases SET status = ?2, updated_at = ?3, cancelled_at = ?3
            WHERE id = ?1 AND status = ?4
            "#,
        )
        .bind(purchase_id)
        .bind(PurchaseStatus::Cancelled)
        .bind(now)
        .bind(PurchaseStatus::Active)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let current =
                sqlx::query_scalar::<_, PurchaseStatus>("SELECT status FROM purchases WHERE id = ?1")
                    .bind(purchase_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            return Err(match current {
                Some(from) => CoreError::transition("purchase", from, PurchaseStatus::Cancelled).into(),
                None => DbError::not_found("Purchase", purchase_id),
            });
        }

        if let Some(direction) = purchase_effect(Some(PurchaseStatus::Active), PurchaseStatus::Cancelled)? {
            let items = fetch_items(&mut *tx, purchase_id).await?;
            let plan = plan_adjustments(&items, direction);
            apply_adjustments(&mut *tx, &plan, MovementReason::PurchaseCancelled, Some(purchase_id))
                .await?;
        }

        let purchase = fetch_purchase(&mut *tx, purchase_id).await?;
        tx.commit().await?;

        info!(id = %purchase.id, folio = purchase.folio, "Purchase cancelled");
        Ok(purchase)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Purchase>> {
        let sql = format!("SELECT {} FROM purchases WHERE id = ?1", PURCHASE_COLUMNS);

        let purchase = sqlx::query_as::<_, Purchase>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(purchase)
    }

    pub async fn get_items(&self, purchase_id: &str) -> DbResult<Vec<PurchaseItem>> {
        let rows = sqlx::query_as::<_, ItemRow>(ItemTable::Purchase.select_sql())
            .bind(purchase_id)
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(ItemRow::into_purchase_item)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Purchases matching `filter`, newest folio first.
    pub async fn list(&self, filter: &PurchaseFilter) -> DbResult<Vec<Purchase>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM purchases WHERE 1 = 1", PURCHASE_COLUMNS));

        if let Some(supplier_id) = &filter.supplier_id {
            qb.push(" AND supplier_id = ").push_bind(supplier_id.clone());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(from) = filter.from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND created_at < ").push_bind(to);
        }
        qb.push(" ORDER BY folio DESC LIMIT ")
            .push_bind(filter.limit.unwrap_or(100));

        let purchases = qb.build_query_as::<Purchase>().fetch_all(&self.pool).await?;
        Ok(purchases)
    }
}

async fn fetch_purchase(conn: &mut SqliteConnection, purchase_id: &str) -> DbResult<Purchase> {
    let sql = format!("SELECT {} FROM purchases WHERE id = ?1", PURCHASE_COLUMNS);

    sqlx::query_as::<_, Purchase>(&sql)
        .bind(purchase_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Purchase", purchase_id))
}

async fn fetch_items(conn: &mut SqliteConnection, purchase_id: &str) -> DbResult<Vec<PurchaseItem>> {
    let rows = sqlx::query_as::<_, ItemRow>(ItemTable::Purchase.select_sql())
        .bind(purchase_id)
        .fetch_all(&mut *conn)
        .await?;

    let items = rows
        .into_iter()
        .map(ItemRow::into_purchase_item)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(items)
}
