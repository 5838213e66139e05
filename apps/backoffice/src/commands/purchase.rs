//! # Purchase Commands
//!
//! Draft editing plus saving and cancelling purchases. A purchase adds its
//! quantities to stock when saved; cancelling takes them back out (clamped
//! at zero if some units were already sold).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use mostrador_core::{DraftKind, LinePricing, PaymentMethod, Purchase, PurchaseStatus};
use mostrador_db::{NewPurchase, PurchaseFilter};

use super::draft::{self, DiscountSwitchResponse, DraftResponse, TotalsDto};
use super::page_size;
use super::party::SupplierDto;
use super::report::day_bounds;
use super::sale::LineDto;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDto {
    pub id: String,
    pub folio: i64,
    pub supplier_id: String,
    pub status: PurchaseStatus,
    pub header_discount_bps: u32,
    pub tax_bps: u32,
    pub totals: TotalsDto,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl From<Purchase> for PurchaseDto {
    fn from(p: Purchase) -> Self {
        PurchaseDto {
            totals: TotalsDto::from(p.totals()),
            id: p.id,
            folio: p.folio,
            supplier_id: p.supplier_id,
            status: p.status,
            header_discount_bps: p.header_discount_bps,
            tax_bps: p.tax_bps,
            payment_method: p.payment_method,
            notes: p.notes,
            created_at: p.created_at,
            cancelled_at: p.cancelled_at,
        }
    }
}

/// A purchase with its lines and supplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDetail {
    pub purchase: PurchaseDto,
    pub items: Vec<LineDto>,
    pub supplier: Option<SupplierDto>,
}

/// Filters for the purchases list. Dates are whole days, both inclusive.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseQuery {
    pub supplier_id: Option<String>,
    pub status: Option<PurchaseStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<u32>,
}

// =============================================================================
// Draft
// =============================================================================

pub fn get_purchase_draft(state: &AppState) -> DraftResponse {
    draft::get(state, DraftKind::Purchase)
}

/// Adds a product at its purchase price. Purchases have no stock limit.
pub async fn add_purchase_line(
    state: &AppState,
    product_id: &str,
    quantity: Option<i64>,
) -> Result<DraftResponse, ApiError> {
    draft::add_line(state, DraftKind::Purchase, product_id, quantity).await
}

pub fn update_purchase_line(
    state: &AppState,
    product_id: &str,
    quantity: i64,
) -> Result<DraftResponse, ApiError> {
    draft::update_line(state, DraftKind::Purchase, product_id, quantity)
}

pub fn remove_purchase_line(state: &AppState, product_id: &str) -> Result<DraftResponse, ApiError> {
    draft::remove_line(state, DraftKind::Purchase, product_id)
}

pub fn set_purchase_line_pricing(
    state: &AppState,
    product_id: &str,
    pricing: LinePricing,
) -> Result<DraftResponse, ApiError> {
    draft::set_line_pricing(state, DraftKind::Purchase, product_id, pricing)
}

pub fn set_purchase_discount(state: &AppState, discount_bps: u32) -> Result<DraftResponse, ApiError> {
    draft::set_discount(state, DraftKind::Purchase, discount_bps)
}

pub fn switch_purchase_to_header_discount(
    state: &AppState,
    discount_bps: u32,
) -> Result<DiscountSwitchResponse, ApiError> {
    draft::switch_to_header_discount(state, DraftKind::Purchase, discount_bps)
}

pub fn set_purchase_tax(state: &AppState, tax_bps: u32) -> Result<DraftResponse, ApiError> {
    draft::set_tax(state, DraftKind::Purchase, tax_bps)
}

/// Sets the supplier of the purchase draft. The supplier must be active.
pub async fn set_purchase_supplier(
    state: &AppState,
    supplier_id: &str,
) -> Result<DraftResponse, ApiError> {
    debug!(supplier_id = %supplier_id, "set_purchase_supplier command");

    state
        .db()
        .suppliers()
        .get_by_id(supplier_id)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| ApiError::not_found("Supplier", supplier_id))?;

    Ok(state.drafts.with_draft(DraftKind::Purchase, |d| {
        d.set_party(Some(supplier_id.to_string()));
        DraftResponse::from(&*d)
    }))
}

pub fn set_purchase_notes(state: &AppState, notes: Option<String>) -> DraftResponse {
    draft::set_notes(state, DraftKind::Purchase, notes)
}

pub fn clear_purchase_draft(state: &AppState) -> DraftResponse {
    draft::clear(state, DraftKind::Purchase)
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Saves the purchase draft and adds its quantities to stock.
///
/// ## Errors
/// * `VALIDATION_ERROR` - empty draft or no supplier chosen
pub async fn save_purchase(
    state: &AppState,
    payment_method: PaymentMethod,
) -> Result<PurchaseDto, ApiError> {
    let draft = state.drafts.snapshot(DraftKind::Purchase);
    debug!(lines = draft.line_count(), ?payment_method, "save_purchase command");

    draft.ensure_not_empty()?;
    let new_purchase = NewPurchase::from_draft(&draft, payment_method)?;

    let purchase = state.db().purchases().create(new_purchase).await?;

    if !state.drafts.finish(&draft, state.config.snapshot().tax_rate) {
        debug!("Purchase draft changed while saving; keeping the edits");
    }

    info!(folio = purchase.folio, total_cents = purchase.total_cents, "save_purchase complete");
    Ok(PurchaseDto::from(purchase))
}

/// Cancels a purchase and takes its quantities back out of stock.
pub async fn cancel_purchase(state: &AppState, purchase_id: &str) -> Result<PurchaseDto, ApiError> {
    debug!(purchase_id = %purchase_id, "cancel_purchase command");
    let purchase = state.db().purchases().cancel(purchase_id).await?;
    Ok(PurchaseDto::from(purchase))
}

pub async fn get_purchase(state: &AppState, purchase_id: &str) -> Result<PurchaseDetail, ApiError> {
    debug!(purchase_id = %purchase_id, "get_purchase command");
    let db = state.db();

    let purchase = db
        .purchases()
        .get_by_id(purchase_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Purchase", purchase_id))?;
    let items = db.purchases().get_items(purchase_id).await?;
    let supplier = db
        .suppliers()
        .get_by_id(&purchase.supplier_id)
        .await?
        .map(SupplierDto::from);

    Ok(PurchaseDetail {
        purchase: PurchaseDto::from(purchase),
        items: items.into_iter().map(LineDto::from).collect(),
        supplier,
    })
}

/// Lists purchases, newest folio first.
pub async fn list_purchases(
    state: &AppState,
    query: PurchaseQuery,
) -> Result<Vec<PurchaseDto>, ApiError> {
    debug!(?query, "list_purchases command");
    let (from, to) = day_bounds(query.from, query.to)?;

    let purchases = state
        .db()
        .purchases()
        .list(&PurchaseFilter {
            supplier_id: query.supplier_id,
            status: query.status,
            from,
            to,
            limit: Some(page_size(query.limit, 100)),
        })
        .await?;
    Ok(purchases.into_iter().map(PurchaseDto::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::party::{create_supplier, PartyInput};
    use crate::commands::product::get_product;
    use crate::commands::sale::{add_sale_line, save_sale, PaymentInput};
    use crate::commands::test_support::{app, stocked};
    use crate::error::ErrorCode;

    async fn supplier(state: &AppState) -> SupplierDto {
        create_supplier(
            state,
            PartyInput {
                name: "Distribuidora del Bajío".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_purchase_needs_supplier() {
        let state = app().await;
        let product = stocked(&state, "ARZ-1KG", 0).await;

        add_purchase_line(&state, &product.id, Some(10)).await.unwrap();
        let err = save_purchase(&state, PaymentMethod::Transfer).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(get_purchase_draft(&state).lines.len(), 1);
    }

    #[tokio::test]
    async fn test_purchase_adds_stock_at_purchase_price() {
        let state = app().await;
        let product = stocked(&state, "ARZ-1KG", 0).await;
        let supplier = supplier(&state).await;

        // No stock limit on purchases
        let draft = add_purchase_line(&state, &product.id, Some(24)).await.unwrap();
        assert_eq!(draft.lines[0].list_price_cents, 1_800);

        set_purchase_supplier(&state, &supplier.id).await.unwrap();
        set_purchase_tax(&state, 0).unwrap();
        let purchase = save_purchase(&state, PaymentMethod::Cash).await.unwrap();

        assert_eq!(purchase.totals.total_cents, 24 * 1_800);
        assert_eq!(get_product(&state, &product.id).await.unwrap().stock, 24);
        assert!(get_purchase_draft(&state).lines.is_empty());

        let detail = get_purchase(&state, &purchase.id).await.unwrap();
        assert_eq!(detail.items[0].quantity, 24);
        assert_eq!(detail.supplier.unwrap().name, "Distribuidora del Bajío");
    }

    #[tokio::test]
    async fn test_cancel_after_sales_clamps_at_zero() {
        let state = app().await;
        let product = stocked(&state, "FRJ-1KG", 0).await;
        let supplier = supplier(&state).await;

        add_purchase_line(&state, &product.id, Some(10)).await.unwrap();
        set_purchase_supplier(&state, &supplier.id).await.unwrap();
        let purchase = save_purchase(&state, PaymentMethod::Card).await.unwrap();

        add_sale_line(&state, &product.id, Some(4)).await.unwrap();
        save_sale(
            &state,
            Some(PaymentInput {
                method: PaymentMethod::Card,
                tendered_cents: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(get_product(&state, &product.id).await.unwrap().stock, 6);

        let cancelled = cancel_purchase(&state, &purchase.id).await.unwrap();
        assert_eq!(cancelled.status, PurchaseStatus::Cancelled);
        assert_eq!(get_product(&state, &product.id).await.unwrap().stock, 0);

        let err = cancel_purchase(&state, &purchase.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);

        let active = list_purchases(
            &state,
            PurchaseQuery {
                status: Some(PurchaseStatus::Active),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(active.is_empty());
    }
}
