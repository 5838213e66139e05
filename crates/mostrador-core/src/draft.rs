//! # Transaction Drafts
//!
//! The in-progress sale or purchase before it is saved.
//!
//! ## Draft Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Dashboard action          Draft operation             Effect           │
//! │  ────────────────          ───────────────             ──────           │
//! │  Pick product ───────────► add_product() ────────────► push / merge     │
//! │  Edit quantity ──────────► set_quantity() ───────────► qty = n (0 drops)│
//! │  Line discount/price ────► set_line_pricing() ───────► variant swap     │
//! │  Header discount ────────► set_header_discount() ────► header % set     │
//! │  "Use header discount" ──► switch_to_header_discount() clears line %    │
//! │  Save ───────────────────► totals() + lines ─────────► repository       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by product (adding the same product merges quantity)
//! - A line discount and a header discount are never both set
//! - Sale drafts never hold more units than the product had in stock when
//!   it was picked
//! - At most [`MAX_DRAFT_LINES`] lines and [`MAX_LINE_QUANTITY`] units per line

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::{compute_totals, LinePricing, PricedLine, TransactionTotals};
use crate::stock::{check_availability, StockLine};
use crate::types::{Percentage, Product};
use crate::validation::{
    validate_draft_size, validate_percentage, validate_price_cents, validate_quantity,
};
use crate::{MAX_DRAFT_LINES, MAX_LINE_QUANTITY};

/// Which kind of transaction a draft will become.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DraftKind {
    /// Lines priced at sale price; stock availability is enforced.
    Sale,
    /// Lines priced at purchase price; no stock limit.
    Purchase,
}

/// A line of a draft.
///
/// Product data is frozen when the line is added, so the draft keeps showing
/// the same code, description and list price if the catalog changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DraftLine {
    pub product_id: String,
    pub code: String,
    pub description: String,
    pub list_price: Money,
    /// Stock when the product was picked.
    pub available_stock: i64,
    pub quantity: i64,
    pub pricing: LinePricing,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl DraftLine {
    fn from_product(product: &Product, kind: DraftKind, quantity: i64) -> Self {
        let list_price = match kind {
            DraftKind::Sale => product.sale_price(),
            DraftKind::Purchase => product.purchase_price(),
        };

        DraftLine {
            product_id: product.id.clone(),
            code: product.code.clone(),
            description: product.description.clone(),
            list_price,
            available_stock: product.stock,
            quantity,
            pricing: LinePricing::Standard,
            added_at: Utc::now(),
        }
    }
}

impl PricedLine for DraftLine {
    fn quantity(&self) -> i64 {
        self.quantity
    }

    fn list_price(&self) -> Money {
        self.list_price
    }

    fn pricing(&self) -> LinePricing {
        self.pricing
    }
}

impl StockLine for DraftLine {
    fn product_id(&self) -> &str {
        &self.product_id
    }

    fn quantity(&self) -> i64 {
        self.quantity
    }
}

/// A sale or purchase being built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TransactionDraft {
    pub kind: DraftKind,
    pub lines: Vec<DraftLine>,
    pub header_discount: Percentage,
    pub tax: Percentage,
    /// Client for sales, supplier for purchases.
    pub party_id: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl TransactionDraft {
    pub fn new(kind: DraftKind, tax: Percentage) -> Self {
        TransactionDraft {
            kind,
            lines: Vec::new(),
            header_discount: Percentage::zero(),
            tax,
            party_id: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    pub fn sale(tax: Percentage) -> Self {
        Self::new(DraftKind::Sale, tax)
    }

    pub fn purchase(tax: Percentage) -> Self {
        Self::new(DraftKind::Purchase, tax)
    }

    fn line_mut(&mut self, product_id: &str) -> CoreResult<&mut DraftLine> {
        self.lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or_else(|| CoreError::LineNotFound(product_id.to_string()))
    }

    fn check_quantity(&self, line: &DraftLine, quantity: i64) -> CoreResult<()> {
        if quantity > MAX_LINE_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_LINE_QUANTITY,
            });
        }
        if self.kind == DraftKind::Sale {
            check_availability(&line.code, line.available_stock, quantity)?;
        }
        Ok(())
    }

    /// Adds a product, or merges the quantity into its existing line.
    ///
    /// ## Returns
    /// The line's quantity after the operation.
    pub fn add_product(&mut self, product: &Product, quantity: i64) -> CoreResult<i64> {
        validate_quantity(quantity)?;

        if let Some(idx) = self.lines.iter().position(|l| l.product_id == product.id) {
            let merged = self.lines[idx].quantity + quantity;
            self.check_quantity(&self.lines[idx], merged)?;
            self.lines[idx].quantity = merged;
            return Ok(merged);
        }

        validate_draft_size(self.lines.len()).map_err(|_| CoreError::DraftTooLarge {
            max: MAX_DRAFT_LINES,
        })?;

        let line = DraftLine::from_product(product, self.kind, quantity);
        validate_price_cents(line.list_price.cents())?;
        self.check_quantity(&line, quantity)?;
        self.lines.push(line);
        Ok(quantity)
    }

    /// Sets a line's quantity. Zero removes the line.
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_line(product_id).map(|_| ());
        }
        if quantity < 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }

        let idx = self
            .lines
            .iter()
            .position(|l| l.product_id == product_id)
            .ok_or_else(|| CoreError::LineNotFound(product_id.to_string()))?;
        self.check_quantity(&self.lines[idx], quantity)?;
        self.lines[idx].quantity = quantity;
        Ok(())
    }

    /// Removes a line and returns it.
    pub fn remove_line(&mut self, product_id: &str) -> CoreResult<DraftLine> {
        let idx = self
            .lines
            .iter()
            .position(|l| l.product_id == product_id)
            .ok_or_else(|| CoreError::LineNotFound(product_id.to_string()))?;
        Ok(self.lines.remove(idx))
    }

    /// Changes how a line is priced.
    ///
    /// A line discount is rejected while a header discount is set; the
    /// dashboard then offers [`switch_to_header_discount`](Self::switch_to_header_discount)
    /// or clearing the header discount.
    pub fn set_line_pricing(&mut self, product_id: &str, pricing: LinePricing) -> CoreResult<()> {
        pricing.validate()?;

        if pricing.is_discounted() && !self.header_discount.is_zero() {
            return Err(CoreError::DiscountModeConflict(format!(
                "header discount {} is active; remove it before discounting lines",
                self.header_discount
            )));
        }

        self.line_mut(product_id)?.pricing = pricing;
        Ok(())
    }

    /// Sets the header discount. Rejected while any line is discounted.
    pub fn set_header_discount(&mut self, discount: Percentage) -> CoreResult<()> {
        validate_percentage("header discount", discount)?;

        let discounted = self.discounted_line_count();
        if !discount.is_zero() && discounted > 0 {
            return Err(CoreError::DiscountModeConflict(format!(
                "{} line(s) already carry a line discount",
                discounted
            )));
        }

        self.header_discount = discount;
        Ok(())
    }

    /// Sets the header discount after resetting every discounted line to
    /// standard pricing. Overridden lines keep their price.
    ///
    /// ## Returns
    /// How many line discounts were cleared, for the warning shown to the user.
    pub fn switch_to_header_discount(&mut self, discount: Percentage) -> CoreResult<usize> {
        validate_percentage("header discount", discount)?;

        let mut cleared = 0;
        for line in self.lines.iter_mut().filter(|l| l.pricing.is_discounted()) {
            line.pricing = LinePricing::Standard;
            cleared += 1;
        }

        self.header_discount = discount;
        Ok(cleared)
    }

    pub fn set_tax(&mut self, tax: Percentage) -> CoreResult<()> {
        validate_percentage("tax", tax)?;
        self.tax = tax;
        Ok(())
    }

    pub fn set_party(&mut self, party_id: Option<String>) {
        self.party_id = party_id;
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes.filter(|n| !n.trim().is_empty());
    }

    /// Empties the draft, keeping its kind and tax rate.
    pub fn clear(&mut self) {
        *self = Self::new(self.kind, self.tax);
    }

    pub fn totals(&self) -> TransactionTotals {
        compute_totals(&self.lines, self.header_discount, self.tax)
    }

    pub fn discounted_line_count(&self) -> usize {
        self.lines.iter().filter(|l| l.pricing.is_discounted()).count()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Fails with [`CoreError::EmptyTransaction`] when there is nothing to save.
    pub fn ensure_not_empty(&self) -> CoreResult<()> {
        if self.is_empty() {
            return Err(CoreError::EmptyTransaction);
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, sale: i64, purchase: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            code: format!("P-{}", id),
            description: format!("Producto {}", id),
            category: None,
            unit: "pieza".to_string(),
            purchase_price_cents: purchase,
            sale_price_cents: sale,
            stock,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_merges_quantity() {
        let mut draft = TransactionDraft::sale(Percentage::from_percent(16));
        let p = product("1", 2_000, 1_500, 10);

        draft.add_product(&p, 2).unwrap();
        assert_eq!(draft.add_product(&p, 3).unwrap(), 5);
        assert_eq!(draft.line_count(), 1);
        assert_eq!(draft.total_quantity(), 5);
    }

    #[test]
    fn test_sale_rejects_quantity_above_stock() {
        let mut draft = TransactionDraft::sale(Percentage::zero());
        let p = product("1", 2_000, 1_500, 3);

        let err = draft.add_product(&p, 5).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 3, requested: 5, .. }
        ));
        assert!(draft.is_empty());

        draft.add_product(&p, 3).unwrap();
        assert!(draft.add_product(&p, 1).is_err());
        assert!(draft.set_quantity(&p.id, 4).is_err());
        assert_eq!(draft.total_quantity(), 3);
    }

    #[test]
    fn test_purchase_ignores_stock_and_uses_purchase_price() {
        let mut draft = TransactionDraft::purchase(Percentage::zero());
        let p = product("1", 2_000, 1_500, 0);

        draft.add_product(&p, 50).unwrap();
        assert_eq!(draft.lines[0].list_price.cents(), 1_500);
        assert_eq!(draft.totals().total.cents(), 75_000);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut draft = TransactionDraft::sale(Percentage::zero());
        let p = product("1", 100, 50, 10);
        draft.add_product(&p, 2).unwrap();

        draft.set_quantity(&p.id, 0).unwrap();
        assert!(draft.is_empty());
        assert!(matches!(
            draft.set_quantity(&p.id, 1),
            Err(CoreError::LineNotFound(_))
        ));
    }

    #[test]
    fn test_quantity_limit() {
        let mut draft = TransactionDraft::purchase(Percentage::zero());
        let p = product("1", 100, 50, 0);
        draft.add_product(&p, MAX_LINE_QUANTITY).unwrap();

        assert!(matches!(
            draft.add_product(&p, 1),
            Err(CoreError::QuantityTooLarge { .. })
        ));
        assert!(matches!(
            draft.set_quantity(&p.id, MAX_LINE_QUANTITY + 1),
            Err(CoreError::QuantityTooLarge { .. })
        ));
    }

    #[test]
    fn test_line_limit() {
        let mut draft = TransactionDraft::purchase(Percentage::zero());
        for i in 0..MAX_DRAFT_LINES {
            draft.add_product(&product(&i.to_string(), 100, 50, 0), 1).unwrap();
        }
        let err = draft.add_product(&product("extra", 100, 50, 0), 1).unwrap_err();
        assert!(matches!(err, CoreError::DraftTooLarge { .. }));
    }

    #[test]
    fn test_huge_prices_rejected_before_totals() {
        let mut draft = TransactionDraft::sale(Percentage::from_percent(16));
        let p = product("p1", 2_500, 1_800, 10);
        draft.add_product(&p, 2).unwrap();

        let err = draft
            .set_line_pricing("p1", LinePricing::Overridden(Money::from_cents(i64::MAX / 2 + 1)))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));
        assert_eq!(draft.lines[0].pricing, LinePricing::Standard);
        assert_eq!(draft.totals().subtotal.cents(), 5_000);

        let pricey = product("p2", crate::MAX_PRICE_CENTS + 1, 1_800, 10);
        assert!(draft.add_product(&pricey, 1).is_err());
        assert_eq!(draft.line_count(), 1);
    }

    #[test]
    fn test_largest_draft_totals_fit() {
        let mut draft = TransactionDraft::purchase(Percentage::from_percent(100));
        for i in 0..MAX_DRAFT_LINES {
            let p = product(&i.to_string(), crate::MAX_PRICE_CENTS, crate::MAX_PRICE_CENTS, 0);
            draft.add_product(&p, MAX_LINE_QUANTITY).unwrap();
        }

        let per_line = crate::MAX_PRICE_CENTS * MAX_LINE_QUANTITY;
        let totals = draft.totals();
        assert_eq!(totals.subtotal.cents(), per_line * MAX_DRAFT_LINES as i64);
        assert_eq!(totals.total.cents(), totals.subtotal.cents() * 2);
    }

    #[test]
    fn test_discount_modes_are_exclusive() {
        let mut draft = TransactionDraft::sale(Percentage::zero());
        let p = product("1", 1_000, 500, 10);
        draft.add_product(&p, 1).unwrap();

        draft.set_header_discount(Percentage::from_percent(10)).unwrap();
        let err = draft
            .set_line_pricing(&p.id, LinePricing::Discounted(Percentage::from_percent(5)))
            .unwrap_err();
        assert!(matches!(err, CoreError::DiscountModeConflict(_)));

        // overrides are allowed alongside a header discount
        draft
            .set_line_pricing(&p.id, LinePricing::Overridden(Money::from_cents(900)))
            .unwrap();

        draft.set_header_discount(Percentage::zero()).unwrap();
        draft
            .set_line_pricing(&p.id, LinePricing::Discounted(Percentage::from_percent(5)))
            .unwrap();
        assert!(matches!(
            draft.set_header_discount(Percentage::from_percent(10)),
            Err(CoreError::DiscountModeConflict(_))
        ));
    }

    #[test]
    fn test_switch_to_header_discount_clears_line_discounts() {
        let mut draft = TransactionDraft::sale(Percentage::zero());
        let a = product("a", 1_000, 500, 10);
        let b = product("b", 1_000, 500, 10);
        let c = product("c", 1_000, 500, 10);
        for p in [&a, &b, &c] {
            draft.add_product(p, 1).unwrap();
        }
        draft
            .set_line_pricing(&a.id, LinePricing::Discounted(Percentage::from_percent(5)))
            .unwrap();
        draft
            .set_line_pricing(&b.id, LinePricing::Overridden(Money::from_cents(800)))
            .unwrap();

        let cleared = draft.switch_to_header_discount(Percentage::from_percent(10)).unwrap();

        assert_eq!(cleared, 1);
        assert_eq!(draft.lines[0].pricing, LinePricing::Standard);
        assert!(draft.lines[1].pricing.is_overridden());
        assert_eq!(draft.discounted_line_count(), 0);

        // a and c discounted: 2000 × 10% = 200; b stays at 800
        let totals = draft.totals();
        assert_eq!(totals.subtotal.cents(), 2_800);
        assert_eq!(totals.discount.cents(), 200);
        assert_eq!(totals.total.cents(), 2_600);
    }

    #[test]
    fn test_clear_keeps_kind_and_tax() {
        let mut draft = TransactionDraft::sale(Percentage::from_percent(16));
        draft.add_product(&product("1", 100, 50, 10), 1).unwrap();
        draft.set_party(Some("client".to_string()));

        draft.clear();

        assert!(draft.is_empty());
        assert_eq!(draft.kind, DraftKind::Sale);
        assert_eq!(draft.tax, Percentage::from_percent(16));
        assert!(draft.party_id.is_none());
        assert!(matches!(draft.ensure_not_empty(), Err(CoreError::EmptyTransaction)));
    }
}
