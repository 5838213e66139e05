//! # Draft Commands
//!
//! Editing operations shared by the sale and purchase drafts. The sale and
//! purchase modules expose them under their own names.
//!
//! ## Draft Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ Editing  │────►│  Saving  │────►│  Saved   │       │
//! │  │  Draft   │     │          │     │          │     │  (folio) │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │                        │                                   │            │
//! │                   add_line                                 │            │
//! │                   update_line                              ▼            │
//! │                   set_line_pricing              fresh draft, same tax   │
//! │                   set_discount                                          │
//! │                        │                                                │
//! │                   clear ───────────► (back to empty)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The draft lock is taken only around the synchronous draft operation;
//! product lookups happen before it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use mostrador_core::pricing::{double_discounted_lines, PricedLine};
use mostrador_core::stock::{check_product_availability, plan_adjustments, StockLine};
use mostrador_core::{
    DraftKind, DraftLine, LinePricing, Percentage, StockDirection, TransactionDraft,
    TransactionTotals,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Totals in cents, as the dashboard displays them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalsDto {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub subtotal_after_discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

impl From<TransactionTotals> for TotalsDto {
    fn from(t: TransactionTotals) -> Self {
        TotalsDto {
            subtotal_cents: t.subtotal.cents(),
            discount_cents: t.discount.cents(),
            subtotal_after_discount_cents: t.subtotal_after_discount.cents(),
            tax_cents: t.tax.cents(),
            total_cents: t.total.cents(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftLineDto {
    pub product_id: String,
    pub code: String,
    pub description: String,
    pub quantity: i64,
    pub list_price_cents: i64,
    pub pricing: LinePricing,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    pub available_stock: i64,
}

impl From<&DraftLine> for DraftLineDto {
    fn from(line: &DraftLine) -> Self {
        DraftLineDto {
            product_id: line.product_id.clone(),
            code: line.code.clone(),
            description: line.description.clone(),
            quantity: line.quantity,
            list_price_cents: line.list_price.cents(),
            pricing: line.pricing,
            unit_price_cents: line.unit_price().cents(),
            subtotal_cents: line.line_subtotal().cents(),
            available_stock: line.available_stock,
        }
    }
}

/// The draft as the dashboard shows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResponse {
    pub kind: DraftKind,
    pub lines: Vec<DraftLineDto>,
    pub header_discount_bps: u32,
    pub tax_bps: u32,
    /// Client for sales, supplier for purchases.
    pub party_id: Option<String>,
    pub notes: Option<String>,
    pub totals: TotalsDto,
    pub discounted_line_count: usize,
    pub total_quantity: i64,
    /// Indexes of lines taking both their own discount and the header one.
    pub double_discounted_lines: Vec<usize>,
}

impl From<&TransactionDraft> for DraftResponse {
    fn from(draft: &TransactionDraft) -> Self {
        DraftResponse {
            kind: draft.kind,
            lines: draft.lines.iter().map(DraftLineDto::from).collect(),
            header_discount_bps: draft.header_discount.bps(),
            tax_bps: draft.tax.bps(),
            party_id: draft.party_id.clone(),
            notes: draft.notes.clone(),
            totals: TotalsDto::from(draft.totals()),
            discounted_line_count: draft.discounted_line_count(),
            total_quantity: draft.total_quantity(),
            double_discounted_lines: double_discounted_lines(&draft.lines, draft.header_discount),
        }
    }
}

/// Result of switching to a header discount.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountSwitchResponse {
    pub draft: DraftResponse,
    /// Line discounts removed; the dashboard warns when this is not zero.
    pub cleared_line_discounts: usize,
}

pub(crate) fn get(state: &AppState, kind: DraftKind) -> DraftResponse {
    state.drafts.with_draft(kind, |d| DraftResponse::from(&*d))
}

/// Adds an active product to the draft, merging with its existing line.
pub(crate) async fn add_line(
    state: &AppState,
    kind: DraftKind,
    product_id: &str,
    quantity: Option<i64>,
) -> Result<DraftResponse, ApiError> {
    let quantity = quantity.unwrap_or(1);
    debug!(?kind, product_id = %product_id, quantity = %quantity, "add_line command");

    let product = state
        .db()
        .products()
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", product_id))?;

    if !product.is_active {
        return Err(ApiError::validation(format!(
            "Product {} is no longer active",
            product.code
        )));
    }

    state.drafts.with_draft(kind, |d| {
        d.add_product(&product, quantity)?;
        Ok::<_, ApiError>(DraftResponse::from(&*d))
    })
}

/// Sets a line's quantity; zero removes the line.
pub(crate) fn update_line(
    state: &AppState,
    kind: DraftKind,
    product_id: &str,
    quantity: i64,
) -> Result<DraftResponse, ApiError> {
    debug!(?kind, product_id = %product_id, quantity = %quantity, "update_line command");
    state.drafts.with_draft(kind, |d| {
        d.set_quantity(product_id, quantity)?;
        Ok::<_, ApiError>(DraftResponse::from(&*d))
    })
}

pub(crate) fn remove_line(
    state: &AppState,
    kind: DraftKind,
    product_id: &str,
) -> Result<DraftResponse, ApiError> {
    debug!(?kind, product_id = %product_id, "remove_line command");
    state.drafts.with_draft(kind, |d| {
        d.remove_line(product_id)?;
        Ok::<_, ApiError>(DraftResponse::from(&*d))
    })
}

pub(crate) fn set_line_pricing(
    state: &AppState,
    kind: DraftKind,
    product_id: &str,
    pricing: LinePricing,
) -> Result<DraftResponse, ApiError> {
    debug!(?kind, product_id = %product_id, ?pricing, "set_line_pricing command");
    state.drafts.with_draft(kind, |d| {
        d.set_line_pricing(product_id, pricing)?;
        Ok::<_, ApiError>(DraftResponse::from(&*d))
    })
}

/// Sets the header discount. Fails with `DISCOUNT_CONFLICT` while lines
/// carry their own discount.
pub(crate) fn set_discount(
    state: &AppState,
    kind: DraftKind,
    discount_bps: u32,
) -> Result<DraftResponse, ApiError> {
    debug!(?kind, discount_bps = %discount_bps, "set_discount command");
    state.drafts.with_draft(kind, |d| {
        d.set_header_discount(Percentage::from_bps(discount_bps))?;
        Ok::<_, ApiError>(DraftResponse::from(&*d))
    })
}

/// Drops line discounts and applies a header discount instead.
pub(crate) fn switch_to_header_discount(
    state: &AppState,
    kind: DraftKind,
    discount_bps: u32,
) -> Result<DiscountSwitchResponse, ApiError> {
    debug!(?kind, discount_bps = %discount_bps, "switch_to_header_discount command");
    state.drafts.with_draft(kind, |d| {
        let cleared = d.switch_to_header_discount(Percentage::from_bps(discount_bps))?;
        Ok::<_, ApiError>(DiscountSwitchResponse {
            draft: DraftResponse::from(&*d),
            cleared_line_discounts: cleared,
        })
    })
}

pub(crate) fn set_tax(
    state: &AppState,
    kind: DraftKind,
    tax_bps: u32,
) -> Result<DraftResponse, ApiError> {
    debug!(?kind, tax_bps = %tax_bps, "set_tax command");
    state.drafts.with_draft(kind, |d| {
        d.set_tax(Percentage::from_bps(tax_bps))?;
        Ok::<_, ApiError>(DraftResponse::from(&*d))
    })
}

pub(crate) fn set_notes(state: &AppState, kind: DraftKind, notes: Option<String>) -> DraftResponse {
    state.drafts.with_draft(kind, |d| {
        d.set_notes(notes);
        DraftResponse::from(&*d)
    })
}

/// Empties the draft and picks up the current configured tax rate.
pub(crate) fn clear(state: &AppState, kind: DraftKind) -> DraftResponse {
    debug!(?kind, "clear draft command");
    let tax = state.config.snapshot().tax_rate;
    state.drafts.with_draft(kind, |d| {
        *d = TransactionDraft::new(kind, tax);
        DraftResponse::from(&*d)
    })
}

/// Rejects sale lines asking for more than is in stock right now.
///
/// Drafts check availability when each line is added, but stock may have
/// moved since (another sale, a manual correction), so saving or completing
/// a sale checks again against current rows. The database layer only
/// clamps; this is where overselling is refused.
pub(crate) async fn recheck_stock<L: StockLine>(state: &AppState, lines: &[L]) -> Result<(), ApiError> {
    for adjustment in plan_adjustments(lines, StockDirection::Decrement) {
        let product = state
            .db()
            .products()
            .get_by_id(&adjustment.product_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Product", &adjustment.product_id))?;
        check_product_availability(&product, adjustment.quantity)?;
    }
    Ok(())
}
