//! # Pricing
//!
//! Totals computation shared by sales and purchases.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Transaction Totals                                 │
//! │                                                                         │
//! │  per line:  effective unit price  (LinePricing)                        │
//! │               Standard       → list price                              │
//! │               Discounted(p)  → list price × (1 − p)                    │
//! │               Overridden(m)  → m                                       │
//! │             line subtotal = effective unit price × quantity            │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │  subtotal           = Σ line subtotals                                 │
//! │  discount           = header% × Σ subtotals of NON-overridden lines    │
//! │  after discount     = subtotal − discount                              │
//! │  tax                = tax% × after discount                            │
//! │  total              = after discount + tax                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each percentage step rounds half away from zero to the cent.
//!
//! ## Example
//! ```rust
//! use mostrador_core::money::Money;
//! use mostrador_core::pricing::{compute_totals, LineInput, LinePricing};
//! use mostrador_core::types::Percentage;
//!
//! let lines = [LineInput::new(1, Money::from_cents(100_000), LinePricing::Standard)];
//! let totals = compute_totals(&lines, Percentage::from_percent(10), Percentage::from_percent(16));
//!
//! assert_eq!(totals.discount.cents(), 10_000);
//! assert_eq!(totals.subtotal_after_discount.cents(), 90_000);
//! assert_eq!(totals.tax.cents(), 14_400);
//! assert_eq!(totals.total.cents(), 104_400);
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Percentage, PurchaseItem, SaleItem};
use crate::MAX_PRICE_CENTS;

// =============================================================================
// Line Pricing
// =============================================================================

/// How a line's unit price is derived from its list price.
///
/// A line discount and a price override cannot coexist: the variant makes
/// that combination unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
#[ts(export)]
pub enum LinePricing {
    /// List price, eligible for the header discount.
    Standard,
    /// List price reduced by a line discount.
    Discounted(Percentage),
    /// Manually entered unit price; never discounted.
    Overridden(Money),
}

impl Default for LinePricing {
    fn default() -> Self {
        LinePricing::Standard
    }
}

impl LinePricing {
    /// Column value stored for `Standard`.
    pub const STANDARD: &'static str = "standard";
    /// Column value stored for `Discounted`.
    pub const DISCOUNTED: &'static str = "discounted";
    /// Column value stored for `Overridden`.
    pub const OVERRIDDEN: &'static str = "overridden";

    /// Unit price actually charged for a given list price.
    ///
    /// ```rust
    /// use mostrador_core::money::Money;
    /// use mostrador_core::pricing::LinePricing;
    /// use mostrador_core::types::Percentage;
    ///
    /// let list = Money::from_cents(2_000);
    /// assert_eq!(LinePricing::Standard.effective_unit_price(list).cents(), 2_000);
    /// assert_eq!(
    ///     LinePricing::Discounted(Percentage::from_percent(15)).effective_unit_price(list).cents(),
    ///     1_700
    /// );
    /// assert_eq!(
    ///     LinePricing::Overridden(Money::from_cents(1_850)).effective_unit_price(list).cents(),
    ///     1_850
    /// );
    /// ```
    pub fn effective_unit_price(&self, list_price: Money) -> Money {
        match self {
            LinePricing::Standard => list_price,
            LinePricing::Discounted(pct) => list_price.apply_percentage_discount(*pct),
            LinePricing::Overridden(price) => *price,
        }
    }

    #[inline]
    pub fn is_overridden(&self) -> bool {
        matches!(self, LinePricing::Overridden(_))
    }

    #[inline]
    pub fn is_discounted(&self) -> bool {
        matches!(self, LinePricing::Discounted(_))
    }

    /// Rejects discounts above 100% and override prices outside
    /// `0..=MAX_PRICE_CENTS`.
    pub fn validate(&self) -> CoreResult<()> {
        match self {
            LinePricing::Standard => Ok(()),
            LinePricing::Discounted(pct) if !pct.is_within_full() => {
                Err(ValidationError::OutOfRange {
                    field: "line discount".to_string(),
                    min: 0,
                    max: Percentage::FULL_BPS as i64,
                }
                .into())
            }
            LinePricing::Discounted(_) => Ok(()),
            LinePricing::Overridden(price)
                if price.is_negative() || price.cents() > MAX_PRICE_CENTS =>
            {
                Err(ValidationError::OutOfRange {
                    field: "override price".to_string(),
                    min: 0,
                    max: MAX_PRICE_CENTS,
                }
                .into())
            }
            LinePricing::Overridden(_) => Ok(()),
        }
    }

    /// Splits the variant into its persisted columns:
    /// `(pricing_kind, line_discount_bps, override_price_cents)`.
    pub fn to_parts(&self) -> (&'static str, Option<u32>, Option<i64>) {
        match self {
            LinePricing::Standard => (Self::STANDARD, None, None),
            LinePricing::Discounted(pct) => (Self::DISCOUNTED, Some(pct.bps()), None),
            LinePricing::Overridden(price) => (Self::OVERRIDDEN, None, Some(price.cents())),
        }
    }

    /// Rebuilds the variant from persisted columns.
    ///
    /// Rows that carry both a discount and an override, or a kind without its
    /// value, are rejected.
    pub fn from_parts(
        kind: &str,
        discount_bps: Option<u32>,
        override_cents: Option<i64>,
    ) -> CoreResult<Self> {
        match (kind, discount_bps, override_cents) {
            (Self::STANDARD, None, None) => Ok(LinePricing::Standard),
            (Self::DISCOUNTED, Some(bps), None) => {
                Ok(LinePricing::Discounted(Percentage::from_bps(bps)))
            }
            (Self::OVERRIDDEN, None, Some(cents)) => {
                Ok(LinePricing::Overridden(Money::from_cents(cents)))
            }
            _ => Err(CoreError::InvalidLinePricing(format!(
                "kind={} discount={:?} override={:?}",
                kind, discount_bps, override_cents
            ))),
        }
    }
}

// =============================================================================
// Priced Lines
// =============================================================================

/// Anything that can be priced as a transaction line.
///
/// Implemented by sale items, purchase items, draft lines and [`LineInput`].
pub trait PricedLine {
    fn quantity(&self) -> i64;
    fn list_price(&self) -> Money;
    fn pricing(&self) -> LinePricing;

    fn unit_price(&self) -> Money {
        self.pricing().effective_unit_price(self.list_price())
    }

    /// quantity × effective unit price.
    fn line_subtotal(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity())
    }
}

/// Plain input struct for pricing without a draft or stored item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInput {
    pub quantity: i64,
    pub list_price: Money,
    pub pricing: LinePricing,
}

impl LineInput {
    pub fn new(quantity: i64, list_price: Money, pricing: LinePricing) -> Self {
        LineInput {
            quantity,
            list_price,
            pricing,
        }
    }
}

impl PricedLine for LineInput {
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

impl PricedLine for SaleItem {
    fn quantity(&self) -> i64 {
        self.quantity
    }

    fn list_price(&self) -> Money {
        Money::from_cents(self.list_price_cents)
    }

    fn pricing(&self) -> LinePricing {
        self.pricing
    }
}

impl PricedLine for PurchaseItem {
    fn quantity(&self) -> i64 {
        self.quantity
    }

    fn list_price(&self) -> Money {
        Money::from_cents(self.list_price_cents)
    }

    fn pricing(&self) -> LinePricing {
        self.pricing
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Computed totals of a sale or purchase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TransactionTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub subtotal_after_discount: Money,
    pub tax: Money,
    pub total: Money,
}

/// Computes the totals of a transaction.
///
/// The header discount only reaches lines whose price was not overridden.
/// Header and line discounts are not re-validated here: a caller that sets
/// both gets both (see [`double_discounted_lines`]).
pub fn compute_totals<L: PricedLine>(
    lines: &[L],
    header_discount: Percentage,
    tax: Percentage,
) -> TransactionTotals {
    let mut subtotal = Money::zero();
    let mut discountable = Money::zero();

    for line in lines {
        let line_subtotal = line.line_subtotal();
        subtotal += line_subtotal;
        if !line.pricing().is_overridden() {
            discountable += line_subtotal;
        }
    }

    let discount = discountable.percentage_of(header_discount);
    let subtotal_after_discount = subtotal - discount;
    let tax = subtotal_after_discount.percentage_of(tax);

    TransactionTotals {
        subtotal,
        discount,
        subtotal_after_discount,
        tax,
        total: subtotal_after_discount + tax,
    }
}

/// Indexes of lines that carry a line discount while a header discount is
/// set, i.e. lines that [`compute_totals`] would discount twice.
pub fn double_discounted_lines<L: PricedLine>(lines: &[L], header_discount: Percentage) -> Vec<usize> {
    if header_discount.is_zero() {
        return Vec::new();
    }

    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.pricing().is_discounted())
        .map(|(i, _)| i)
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn standard(qty: i64, cents: i64) -> LineInput {
        LineInput::new(qty, Money::from_cents(cents), LinePricing::Standard)
    }

    #[test]
    fn test_reference_example() {
        // subtotal=1000, header discount=10%, tax=16%
        let lines = [standard(4, 25_000)];
        let totals = compute_totals(&lines, Percentage::from_percent(10), Percentage::from_percent(16));

        assert_eq!(totals.subtotal.cents(), 100_000);
        assert_eq!(totals.discount.cents(), 10_000);
        assert_eq!(totals.subtotal_after_discount.cents(), 90_000);
        assert_eq!(totals.tax.cents(), 14_400);
        assert_eq!(totals.total.cents(), 104_400);
    }

    #[test]
    fn test_final_matches_closed_form_for_standard_lines() {
        // final = (s − s·D) × (1 + T), within one cent per rounding step
        let discounts = [0u32, 500, 1000, 1250, 3333];
        let taxes = [0u32, 800, 1600];
        let subtotals = [1i64, 99, 1_000, 12_345, 999_999];

        for &d in &discounts {
            for &t in &taxes {
                for &s in &subtotals {
                    let lines = [standard(1, s)];
                    let totals =
                        compute_totals(&lines, Percentage::from_bps(d), Percentage::from_bps(t));

                    // exact rational value × 10^8
                    let exact = s as i128 * (10_000 - d as i128) * (10_000 + t as i128);
                    let got = totals.total.cents() as i128 * 100_000_000;
                    assert!(
                        (got - exact).abs() <= 2 * 100_000_000,
                        "s={} d={} t={} total={}",
                        s,
                        d,
                        t,
                        totals.total
                    );
                    assert_eq!(
                        totals.total,
                        totals.subtotal - totals.discount + totals.tax
                    );
                }
            }
        }
    }

    #[test]
    fn test_header_discount_skips_overridden_lines() {
        let lines = [
            standard(2, 5_000),
            LineInput::new(1, Money::from_cents(8_000), LinePricing::Overridden(Money::from_cents(6_000))),
        ];
        let totals = compute_totals(&lines, Percentage::from_percent(10), Percentage::zero());

        assert_eq!(totals.subtotal.cents(), 16_000);
        // only the 10_000 of standard lines is discounted
        assert_eq!(totals.discount.cents(), 1_000);
        assert_eq!(totals.total.cents(), 15_000);
    }

    #[test]
    fn test_overridden_contribution_never_reduced() {
        let overridden = LineInput::new(
            3,
            Money::from_cents(1_000),
            LinePricing::Overridden(Money::from_cents(700)),
        );
        for bps in [0u32, 1_000, 5_000, 10_000] {
            let totals = compute_totals(&[overridden], Percentage::from_bps(bps), Percentage::zero());
            assert_eq!(totals.subtotal_after_discount.cents(), 2_100);
        }
    }

    #[test]
    fn test_line_discount_applies_per_unit() {
        // 3 × (33.33 − 10%) = 3 × 30.00 (29.997 rounds to 30.00)
        let line = LineInput::new(
            3,
            Money::from_cents(3_333),
            LinePricing::Discounted(Percentage::from_percent(10)),
        );
        assert_eq!(line.unit_price().cents(), 3_000);
        assert_eq!(line.line_subtotal().cents(), 9_000);
    }

    #[test]
    fn test_tax_computed_after_discount() {
        let lines = [standard(1, 10_000)];
        let totals = compute_totals(&lines, Percentage::from_percent(50), Percentage::from_percent(16));
        assert_eq!(totals.tax.cents(), 800);
    }

    #[test]
    fn test_empty_lines() {
        let lines: [LineInput; 0] = [];
        let totals = compute_totals(&lines, Percentage::from_percent(10), Percentage::from_percent(16));
        assert_eq!(totals, TransactionTotals::default());
    }

    #[test]
    fn test_double_discount_is_reported_not_prevented() {
        let lines = [
            standard(1, 1_000),
            LineInput::new(1, Money::from_cents(1_000), LinePricing::Discounted(Percentage::from_percent(10))),
        ];
        let header = Percentage::from_percent(10);

        assert_eq!(double_discounted_lines(&lines, header), vec![1]);
        assert!(double_discounted_lines(&lines, Percentage::zero()).is_empty());

        // 1000 + 900 = 1900; header 10% of 1900 = 190
        let totals = compute_totals(&lines, header, Percentage::zero());
        assert_eq!(totals.discount.cents(), 190);
    }

    #[test]
    fn test_parts_roundtrip_and_rejects_mixed() {
        for pricing in [
            LinePricing::Standard,
            LinePricing::Discounted(Percentage::from_bps(750)),
            LinePricing::Overridden(Money::from_cents(4_200)),
        ] {
            let (kind, d, o) = pricing.to_parts();
            assert_eq!(LinePricing::from_parts(kind, d, o).unwrap(), pricing);
        }

        assert!(LinePricing::from_parts("discounted", Some(100), Some(5)).is_err());
        assert!(LinePricing::from_parts("overridden", None, None).is_err());
        assert!(LinePricing::from_parts("bogus", None, None).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(LinePricing::Discounted(Percentage::from_bps(10_000)).validate().is_ok());
        assert!(LinePricing::Discounted(Percentage::from_bps(10_001)).validate().is_err());
        assert!(LinePricing::Overridden(Money::from_cents(-1)).validate().is_err());
        assert!(LinePricing::Overridden(Money::zero()).validate().is_ok());
        assert!(LinePricing::Overridden(Money::from_cents(MAX_PRICE_CENTS)).validate().is_ok());
        assert!(LinePricing::Overridden(Money::from_cents(MAX_PRICE_CENTS + 1)).validate().is_err());
    }

    #[test]
    fn test_line_pricing_json_shape() {
        let json = serde_json::to_string(&LinePricing::Discounted(Percentage::from_bps(500))).unwrap();
        assert_eq!(json, r#"{"kind":"discounted","value":500}"#);
        let json = serde_json::to_string(&LinePricing::Standard).unwrap();
        assert_eq!(json, r#"{"kind":"standard"}"#);
    }
}
