//! # Sale Commands
//!
//! Draft editing plus the sale lifecycle.
//!
//! ## Sale Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Sale draft ──save_sale(None)──────► PENDING ──complete_sale──┐        │
//! │       │                                  │                     │        │
//! │       └──────save_sale(Some(payment))────┼──────────► COMPLETED │        │
//! │                                          │              │       ◄┘       │
//! │                                   cancel_sale      cancel_sale          │
//! │                                          ▼              ▼                │
//! │                                      CANCELLED      CANCELLED           │
//! │                                    (no stock)    (stock restored)       │
//! │                                                                         │
//! │  Stock leaves the shelf only when a sale is COMPLETED.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use mostrador_core::{
    CoreError, DraftKind, LinePricing, Money, PaymentMethod, PaymentRequest, PurchaseItem, Sale,
    SaleItem, SaleStatus,
};
use mostrador_db::{NewSale, SaleFilter};

use super::config::CompanyDto;
use super::draft::{self, DiscountSwitchResponse, DraftResponse, TotalsDto};
use super::page_size;
use super::party::ClientDto;
use super::report::day_bounds;
use crate::error::ApiError;
use crate::state::AppState;

/// What the cashier entered in the payment dialog.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInput {
    pub method: PaymentMethod,
    /// Cash handed over; required for cash, ignored otherwise.
    pub tendered_cents: Option<i64>,
}

impl From<PaymentInput> for PaymentRequest {
    fn from(input: PaymentInput) -> Self {
        PaymentRequest {
            method: input.method,
            tendered: input.tendered_cents.map(Money::from_cents),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDto {
    pub id: String,
    pub folio: i64,
    pub client_id: Option<String>,
    pub status: SaleStatus,
    pub header_discount_bps: u32,
    pub tax_bps: u32,
    pub totals: TotalsDto,
    pub payment_method: Option<PaymentMethod>,
    pub tendered_cents: Option<i64>,
    pub change_cents: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl From<Sale> for SaleDto {
    fn from(s: Sale) -> Self {
        SaleDto {
            totals: TotalsDto::from(s.totals()),
            id: s.id,
            folio: s.folio,
            client_id: s.client_id,
            status: s.status,
            header_discount_bps: s.header_discount_bps,
            tax_bps: s.tax_bps,
            payment_method: s.payment_method,
            tendered_cents: s.tendered_cents,
            change_cents: s.change_cents,
            notes: s.notes,
            created_at: s.created_at,
            completed_at: s.completed_at,
            cancelled_at: s.cancelled_at,
        }
    }
}

/// A saved sale or purchase line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDto {
    pub product_id: String,
    pub code: String,
    pub description: String,
    pub quantity: i64,
    pub list_price_cents: i64,
    pub pricing: LinePricing,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl From<SaleItem> for LineDto {
    fn from(i: SaleItem) -> Self {
        LineDto {
            product_id: i.product_id,
            code: i.code_snapshot,
            description: i.description_snapshot,
            quantity: i.quantity,
            list_price_cents: i.list_price_cents,
            pricing: i.pricing,
            unit_price_cents: i.unit_price_cents,
            subtotal_cents: i.subtotal_cents,
        }
    }
}

impl From<PurchaseItem> for LineDto {
    fn from(i: PurchaseItem) -> Self {
        LineDto {
            product_id: i.product_id,
            code: i.code_snapshot,
            description: i.description_snapshot,
            quantity: i.quantity,
            list_price_cents: i.list_price_cents,
            pricing: i.pricing,
            unit_price_cents: i.unit_price_cents,
            subtotal_cents: i.subtotal_cents,
        }
    }
}

/// Everything the ticket view prints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleTicket {
    pub sale: SaleDto,
    pub items: Vec<LineDto>,
    pub client: Option<ClientDto>,
    /// `None` until the company profile is saved once.
    pub company: Option<CompanyDto>,
    pub store_name: String,
    pub currency_symbol: String,
}

/// Filters for the sales list. Dates are whole days, both inclusive.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleQuery {
    pub status: Option<SaleStatus>,
    pub client_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<u32>,
}

// =============================================================================
// Draft
// =============================================================================

pub fn get_sale_draft(state: &AppState) -> DraftResponse {
    draft::get(state, DraftKind::Sale)
}

/// Adds a product to the sale draft.
///
/// ## Errors
/// * `INSUFFICIENT_STOCK` - the line would hold more than is in stock;
///   nothing changes
pub async fn add_sale_line(
    state: &AppState,
    product_id: &str,
    quantity: Option<i64>,
) -> Result<DraftResponse, ApiError> {
    draft::add_line(state, DraftKind::Sale, product_id, quantity).await
}

pub fn update_sale_line(
    state: &AppState,
    product_id: &str,
    quantity: i64,
) -> Result<DraftResponse, ApiError> {
    draft::update_line(state, DraftKind::Sale, product_id, quantity)
}

pub fn remove_sale_line(state: &AppState, product_id: &str) -> Result<DraftResponse, ApiError> {
    draft::remove_line(state, DraftKind::Sale, product_id)
}

pub fn set_sale_line_pricing(
    state: &AppState,
    product_id: &str,
    pricing: LinePricing,
) -> Result<DraftResponse, ApiError> {
    draft::set_line_pricing(state, DraftKind::Sale, product_id, pricing)
}

pub fn set_sale_discount(state: &AppState, discount_bps: u32) -> Result<DraftResponse, ApiError> {
    draft::set_discount(state, DraftKind::Sale, discount_bps)
}

pub fn switch_sale_to_header_discount(
    state: &AppState,
    discount_bps: u32,
) -> Result<DiscountSwitchResponse, ApiError> {
    draft::switch_to_header_discount(state, DraftKind::Sale, discount_bps)
}

pub fn set_sale_tax(state: &AppState, tax_bps: u32) -> Result<DraftResponse, ApiError> {
    draft::set_tax(state, DraftKind::Sale, tax_bps)
}

/// Attaches a client to the sale draft, or detaches it with `None`.
pub async fn set_sale_client(
    state: &AppState,
    client_id: Option<String>,
) -> Result<DraftResponse, ApiError> {
    debug!(client_id = ?client_id, "set_sale_client command");

    if let Some(id) = &client_id {
        let client = state
            .db()
            .clients()
            .get_by_id(id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| ApiError::not_found("Client", id))?;
        debug!(client = %client.name, "Client attached to sale");
    }

    Ok(state.drafts.with_draft(DraftKind::Sale, |d| {
        d.set_party(client_id);
        DraftResponse::from(&*d)
    }))
}

pub fn set_sale_notes(state: &AppState, notes: Option<String>) -> DraftResponse {
    draft::set_notes(state, DraftKind::Sale, notes)
}

pub fn clear_sale_draft(state: &AppState) -> DraftResponse {
    draft::clear(state, DraftKind::Sale)
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Saves the sale draft.
///
/// With a payment the sale is saved COMPLETED and stock is decremented in
/// the same transaction; without one it is saved PENDING and stock is left
/// alone. On success a fresh draft is started.
///
/// ## Errors
/// * `VALIDATION_ERROR` - empty draft
/// * `INSUFFICIENT_STOCK` - stock dropped below a line's quantity since it
///   was added
/// * `PAYMENT_ERROR` - cash tendered does not cover the total
pub async fn save_sale(state: &AppState, payment: Option<PaymentInput>) -> Result<SaleDto, ApiError> {
    let draft = state.drafts.snapshot(DraftKind::Sale);
    debug!(lines = draft.line_count(), completed = payment.is_some(), "save_sale command");

    draft.ensure_not_empty()?;

    let status = match payment {
        Some(_) => SaleStatus::Completed,
        None => SaleStatus::Pending,
    };
    if status == SaleStatus::Completed {
        draft::recheck_stock(state, &draft.lines).await?;
    }

    let sale = state
        .db()
        .sales()
        .create(NewSale::from_draft(&draft, status, payment.map(PaymentRequest::from)))
        .await?;

    if !state.drafts.finish(&draft, state.config.snapshot().tax_rate) {
        debug!("Sale draft changed while saving; keeping the edits");
    }

    info!(folio = sale.folio, status = ?sale.status, total_cents = sale.total_cents, "save_sale complete");
    Ok(SaleDto::from(sale))
}

/// Completes a pending sale with its payment.
pub async fn complete_sale(
    state: &AppState,
    sale_id: &str,
    payment: PaymentInput,
) -> Result<SaleDto, ApiError> {
    debug!(sale_id = %sale_id, method = ?payment.method, "complete_sale command");

    let sales = state.db().sales();
    let sale = sales
        .get_by_id(sale_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", sale_id))?;

    if sale.status != SaleStatus::Pending {
        return Err(CoreError::transition("sale", sale.status, SaleStatus::Completed).into());
    }

    let items = sales.get_items(sale_id).await?;
    draft::recheck_stock(state, &items).await?;

    let sale = sales.complete(sale_id, payment.into()).await?;
    Ok(SaleDto::from(sale))
}

/// Cancels a sale. Stock comes back only if the sale was completed.
pub async fn cancel_sale(state: &AppState, sale_id: &str) -> Result<SaleDto, ApiError> {
    debug!(sale_id = %sale_id, "cancel_sale command");
    let sale = state.db().sales().cancel(sale_id).await?;
    Ok(SaleDto::from(sale))
}

/// Ticket view: the sale, its lines, the client and the company header.
pub async fn get_sale(state: &AppState, sale_id: &str) -> Result<SaleTicket, ApiError> {
    debug!(sale_id = %sale_id, "get_sale command");
    let db = state.db();

    let sale = db
        .sales()
        .get_by_id(sale_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", sale_id))?;
    let items = db.sales().get_items(sale_id).await?;

    let client = match &sale.client_id {
        Some(id) => db.clients().get_by_id(id).await?.map(ClientDto::from),
        None => None,
    };
    let company = db.company().get().await?.map(CompanyDto::from);
    let settings = state.config.snapshot();

    Ok(SaleTicket {
        sale: SaleDto::from(sale),
        items: items.into_iter().map(LineDto::from).collect(),
        client,
        company,
        store_name: settings.store_name,
        currency_symbol: settings.currency_symbol,
    })
}

/// Finds a sale by its folio (ticket number).
pub async fn get_sale_by_folio(state: &AppState, folio: i64) -> Result<SaleDto, ApiError> {
    let sale = state
        .db()
        .sales()
        .get_by_folio(folio)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", &folio.to_string()))?;
    Ok(SaleDto::from(sale))
}

/// Lists sales, newest folio first.
pub async fn list_sales(state: &AppState, query: SaleQuery) -> Result<Vec<SaleDto>, ApiError> {
    debug!(?query, "list_sales command");
    let (from, to) = day_bounds(query.from, query.to)?;

    let sales = state
        .db()
        .sales()
        .list(&SaleFilter {
            status: query.status,
            client_id: query.client_id,
            from,
            to,
            limit: Some(page_size(query.limit, 100)),
        })
        .await?;
    Ok(sales.into_iter().map(SaleDto::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::product::{adjust_stock, get_product};
    use crate::commands::test_support::{app, stocked};
    use crate::error::ErrorCode;
    use mostrador_core::Percentage;

    fn cash(cents: i64) -> PaymentInput {
        PaymentInput {
            method: PaymentMethod::Cash,
            tendered_cents: Some(cents),
        }
    }

    #[tokio::test]
    async fn test_adding_more_than_stock_is_rejected() {
        let state = app().await;
        let product = stocked(&state, "ARZ-1KG", 3).await;

        let err = add_sale_line(&state, &product.id, Some(5)).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(get_sale_draft(&state).lines.is_empty());
        assert_eq!(get_product(&state, &product.id).await.unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_completed_sale_decrements_and_resets_draft() {
        let state = app().await;
        let product = stocked(&state, "ARZ-1KG", 10).await;

        add_sale_line(&state, &product.id, Some(4)).await.unwrap();
        let draft = get_sale_draft(&state);
        // 4 × 25.00 = 100.00, 16% tax
        assert_eq!(draft.totals.total_cents, 11_600);

        let sale = save_sale(&state, Some(cash(20_000))).await.unwrap();
        assert_eq!(sale.status, SaleStatus::Completed);
        assert_eq!(sale.change_cents, Some(8_400));
        assert_eq!(get_product(&state, &product.id).await.unwrap().stock, 6);
        assert!(get_sale_draft(&state).lines.is_empty());
    }

    #[tokio::test]
    async fn test_pending_sale_keeps_stock_until_completed() {
        let state = app().await;
        let product = stocked(&state, "FRJ-1KG", 5).await;

        add_sale_line(&state, &product.id, Some(5)).await.unwrap();
        let sale = save_sale(&state, None).await.unwrap();
        assert_eq!(sale.status, SaleStatus::Pending);
        assert_eq!(get_product(&state, &product.id).await.unwrap().stock, 5);

        let card = PaymentInput {
            method: PaymentMethod::Card,
            tendered_cents: None,
        };
        let sale = complete_sale(&state, &sale.id, card).await.unwrap();
        assert_eq!(sale.status, SaleStatus::Completed);
        assert_eq!(get_product(&state, &product.id).await.unwrap().stock, 0);

        let err = complete_sale(&state, &sale.id, card).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }

    #[tokio::test]
    async fn test_complete_rechecks_stock() {
        let state = app().await;
        let product = stocked(&state, "AZU-2KG", 4).await;

        add_sale_line(&state, &product.id, Some(4)).await.unwrap();
        let pending = save_sale(&state, None).await.unwrap();
        adjust_stock(&state, &product.id, -2).await.unwrap();

        let err = complete_sale(&state, &pending.id, cash(50_000)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(get_product(&state, &product.id).await.unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_cancel_restores_stock_once() {
        let state = app().await;
        let product = stocked(&state, "ACE-1L", 5).await;

        add_sale_line(&state, &product.id, Some(5)).await.unwrap();
        let sale = save_sale(&state, Some(cash(20_000))).await.unwrap();
        assert_eq!(get_product(&state, &product.id).await.unwrap().stock, 0);

        let cancelled = cancel_sale(&state, &sale.id).await.unwrap();
        assert_eq!(cancelled.status, SaleStatus::Cancelled);
        assert_eq!(get_product(&state, &product.id).await.unwrap().stock, 5);

        assert!(cancel_sale(&state, &sale.id).await.is_err());
        assert_eq!(get_product(&state, &product.id).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_short_cash_keeps_draft_and_stock() {
        let state = app().await;
        let product = stocked(&state, "CAF-200", 2).await;

        add_sale_line(&state, &product.id, Some(2)).await.unwrap();
        let err = save_sale(&state, Some(cash(1_000))).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::PaymentError);
        assert_eq!(get_sale_draft(&state).lines.len(), 1);
        assert_eq!(get_product(&state, &product.id).await.unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_discount_modes_conflict() {
        let state = app().await;
        let rice = stocked(&state, "ARZ-1KG", 10).await;
        let beans = stocked(&state, "FRJ-1KG", 10).await;

        add_sale_line(&state, &rice.id, Some(1)).await.unwrap();
        add_sale_line(&state, &beans.id, Some(1)).await.unwrap();
        set_sale_line_pricing(
            &state,
            &rice.id,
            LinePricing::Discounted(Percentage::from_percent(10)),
        )
        .unwrap();

        let err = set_sale_discount(&state, 500).unwrap_err();
        assert_eq!(err.code, ErrorCode::DiscountConflict);

        let switched = switch_sale_to_header_discount(&state, 500).unwrap();
        assert_eq!(switched.cleared_line_discounts, 1);
        assert_eq!(switched.draft.header_discount_bps, 500);
        assert_eq!(switched.draft.discounted_line_count, 0);
    }

    #[tokio::test]
    async fn test_override_line_escapes_header_discount() {
        let state = app().await;
        let rice = stocked(&state, "ARZ-1KG", 10).await;
        let beans = stocked(&state, "FRJ-1KG", 10).await;

        add_sale_line(&state, &rice.id, Some(2)).await.unwrap();
        add_sale_line(&state, &beans.id, Some(1)).await.unwrap();
        set_sale_line_pricing(&state, &beans.id, LinePricing::Overridden(Money::from_cents(2_000)))
            .unwrap();
        set_sale_tax(&state, 0).unwrap();
        let draft = set_sale_discount(&state, 1_000).unwrap();

        // 10% of the 50.00 rice only
        assert_eq!(draft.totals.subtotal_cents, 7_000);
        assert_eq!(draft.totals.discount_cents, 500);
        assert_eq!(draft.totals.total_cents, 6_500);
    }

    #[tokio::test]
    async fn test_oversized_override_leaves_draft_usable() {
        let state = app().await;
        let rice = stocked(&state, "ARZ-1KG", 10).await;
        add_sale_line(&state, &rice.id, Some(2)).await.unwrap();

        let err = set_sale_line_pricing(
            &state,
            &rice.id,
            LinePricing::Overridden(Money::from_cents(i64::MAX / 2 + 1)),
        )
        .unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationError);
        let draft = get_sale_draft(&state);
        assert_eq!(draft.lines[0].pricing, LinePricing::Standard);
        assert_eq!(draft.totals.subtotal_cents, 5_000);
    }

    #[tokio::test]
    async fn test_ticket_carries_client_and_company() {
        use crate::commands::config::update_company_profile;
        use crate::commands::party::{create_client, PartyInput};
        use mostrador_db::CompanyProfileInput;

        let state = app().await;
        let product = stocked(&state, "LEC-1L", 6).await;
        let client = create_client(
            &state,
            PartyInput {
                name: "Cafetería Central".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        update_company_profile(
            &state,
            CompanyProfileInput {
                name: "Abarrotes La Esquina".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        add_sale_line(&state, &product.id, Some(2)).await.unwrap();
        set_sale_client(&state, Some(client.id.clone())).await.unwrap();
        let sale = save_sale(&state, Some(cash(10_000))).await.unwrap();

        let ticket = get_sale(&state, &sale.id).await.unwrap();
        assert_eq!(ticket.items.len(), 1);
        assert_eq!(ticket.items[0].code, "LEC-1L");
        assert_eq!(ticket.client.unwrap().id, client.id);
        assert_eq!(ticket.company.unwrap().name, "Abarrotes La Esquina");

        let by_folio = get_sale_by_folio(&state, sale.folio).await.unwrap();
        assert_eq!(by_folio.id, sale.id);

        assert!(set_sale_client(&state, Some("missing".to_string())).await.is_err());
    }

    #[tokio::test]
    async fn test_list_sales_filters_by_status() {
        let state = app().await;
        let product = stocked(&state, "SAL-1KG", 10).await;

        for payment in [None, Some(cash(10_000)), Some(cash(10_000))] {
            add_sale_line(&state, &product.id, Some(1)).await.unwrap();
            save_sale(&state, payment).await.unwrap();
        }

        let completed = list_sales(
            &state,
            SaleQuery {
                status: Some(SaleStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(completed.len(), 2);
        assert!(completed[0].folio > completed[1].folio);

        let today = Utc::now().date_naive();
        let all_today = list_sales(
            &state,
            SaleQuery {
                from: Some(today),
                to: Some(today),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(all_today.len(), 3);
    }
}
