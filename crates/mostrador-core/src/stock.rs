//! # Stock Rules
//!
//! Pure rules of the stock mutation protocol. The database layer performs the
//! reads and writes; this module decides direction and arithmetic.
//!
//! ## Lifecycle Effects
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Transition                       Stock effect                          │
//! │  ───────────────────────────────  ───────────────────────────────────   │
//! │  new sale        → Pending        none                                  │
//! │  new sale        → Completed      decrement                             │
//! │  sale Pending    → Completed      decrement                             │
//! │  sale Pending    → Cancelled      none                                  │
//! │  sale Completed  → Cancelled      increment (inverse)                   │
//! │  new purchase    → Active         increment                             │
//! │  purchase Active → Cancelled      decrement (inverse)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Decrements clamp at zero. When a decrement clamps, the later inverse
//! increment restores the full quantity, so the round trip is not exact.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{Product, PurchaseItem, PurchaseStatus, SaleItem, SaleStatus};

// =============================================================================
// Direction and Arithmetic
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockDirection {
    Increment,
    Decrement,
}

impl StockDirection {
    /// The compensating direction.
    #[inline]
    pub fn inverse(self) -> Self {
        match self {
            StockDirection::Increment => StockDirection::Decrement,
            StockDirection::Decrement => StockDirection::Increment,
        }
    }
}

/// Result of applying one adjustment to a stock level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChange {
    pub before: i64,
    pub after: i64,
    /// The decrement wanted to go below zero and was cut at zero.
    pub clamped: bool,
}

/// Computes the new stock level.
///
/// ```rust
/// use mostrador_core::stock::{apply_stock, StockDirection};
///
/// let change = apply_stock(5, 5, StockDirection::Decrement);
/// assert_eq!(change.after, 0);
/// assert!(!change.clamped);
///
/// let change = apply_stock(3, 5, StockDirection::Decrement);
/// assert_eq!(change.after, 0);
/// assert!(change.clamped);
/// ```
pub fn apply_stock(current: i64, quantity: i64, direction: StockDirection) -> StockChange {
    match direction {
        StockDirection::Increment => StockChange {
            before: current,
            after: current + quantity,
            clamped: false,
        },
        StockDirection::Decrement => {
            let wanted = current - quantity;
            StockChange {
                before: current,
                after: wanted.max(0),
                clamped: wanted < 0,
            }
        }
    }
}

// =============================================================================
// Adjustment Planning
// =============================================================================

/// One product's stock change to be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub product_id: String,
    pub quantity: i64,
    pub direction: StockDirection,
}

/// A line that moves stock.
pub trait StockLine {
    fn product_id(&self) -> &str;
    fn quantity(&self) -> i64;
}

impl StockLine for SaleItem {
    fn product_id(&self) -> &str {
        &self.product_id
    }

    fn quantity(&self) -> i64 {
        self.quantity
    }
}

impl StockLine for PurchaseItem {
    fn product_id(&self) -> &str {
        &self.product_id
    }

    fn quantity(&self) -> i64 {
        self.quantity
    }
}

/// Builds one adjustment per product, summing quantities of repeated lines.
///
/// Order follows the first appearance of each product so that writes happen
/// in a stable order.
pub fn plan_adjustments<L: StockLine>(lines: &[L], direction: StockDirection) -> Vec<StockAdjustment> {
    let mut plan: Vec<StockAdjustment> = Vec::with_capacity(lines.len());

    for line in lines {
        match plan.iter_mut().find(|a| a.product_id == line.product_id()) {
            Some(existing) => existing.quantity += line.quantity(),
            None => plan.push(StockAdjustment {
                product_id: line.product_id().to_string(),
                quantity: line.quantity(),
                direction,
            }),
        }
    }

    plan
}

// =============================================================================
// Lifecycle Effects
// =============================================================================

/// Stock effect of a sale status transition. `from = None` means creation.
pub fn sale_effect(from: Option<SaleStatus>, to: SaleStatus) -> CoreResult<Option<StockDirection>> {
    use SaleStatus::*;

    match (from, to) {
        (None, Pending) => Ok(None),
        (None, Completed) => Ok(Some(StockDirection::Decrement)),
        (Some(Pending), Completed) => Ok(Some(StockDirection::Decrement)),
        (Some(Pending), Cancelled) => Ok(None),
        (Some(Completed), Cancelled) => Ok(Some(StockDirection::Increment)),
        (from, to) => Err(CoreError::InvalidStatusTransition {
            entity: "sale".to_string(),
            from: from.map(|s| format!("{:?}", s)).unwrap_or_else(|| "New".to_string()),
            to: format!("{:?}", to),
        }),
    }
}

/// Stock effect of a purchase status transition. `from = None` means creation.
pub fn purchase_effect(
    from: Option<PurchaseStatus>,
    to: PurchaseStatus,
) -> CoreResult<Option<StockDirection>> {
    use PurchaseStatus::*;

    match (from, to) {
        (None, Active) => Ok(Some(StockDirection::Increment)),
        (Some(Active), Cancelled) => Ok(Some(StockDirection::Decrement)),
        (from, to) => Err(CoreError::InvalidStatusTransition {
            entity: "purchase".to_string(),
            from: from.map(|s| format!("{:?}", s)).unwrap_or_else(|| "New".to_string()),
            to: format!("{:?}", to),
        }),
    }
}

// =============================================================================
// Availability
// =============================================================================

/// Rejects selling more than is available.
pub fn check_availability(code: &str, available: i64, requested: i64) -> CoreResult<()> {
    if requested > available {
        return Err(CoreError::InsufficientStock {
            code: code.to_string(),
            available,
            requested,
        });
    }
    Ok(())
}

/// [`check_availability`] against a loaded product.
pub fn check_product_availability(product: &Product, requested: i64) -> CoreResult<()> {
    check_availability(&product.code, product.stock, requested)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct Line(&'static str, i64);

    impl StockLine for Line {
        fn product_id(&self) -> &str {
            self.0
        }
        fn quantity(&self) -> i64 {
            self.1
        }
    }

    #[test]
    fn test_decrement_clamps_at_zero() {
        for (s, q) in [(0, 1), (3, 5), (5, 5), (10, 4)] {
            let change = apply_stock(s, q, StockDirection::Decrement);
            assert_eq!(change.after, (s - q).max(0));
            assert_eq!(change.clamped, s - q < 0);
        }
    }

    #[test]
    fn test_complete_then_cancel_restores_stock() {
        let sold = apply_stock(5, 5, StockDirection::Decrement);
        assert_eq!(sold.after, 0);

        let restored = apply_stock(sold.after, 5, StockDirection::Decrement.inverse());
        assert_eq!(restored.after, 5);
    }

    #[test]
    fn test_clamped_round_trip_is_not_exact() {
        let sold = apply_stock(3, 5, StockDirection::Decrement);
        let restored = apply_stock(sold.after, 5, StockDirection::Increment);
        assert_eq!(restored.after, 5);
        assert_ne!(restored.after, 3);
    }

    #[test]
    fn test_plan_aggregates_repeated_products() {
        let lines = [Line("a", 2), Line("b", 1), Line("a", 3)];
        let plan = plan_adjustments(&lines, StockDirection::Decrement);

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].product_id, "a");
        assert_eq!(plan[0].quantity, 5);
        assert_eq!(plan[1].product_id, "b");
        assert!(plan.iter().all(|a| a.direction == StockDirection::Decrement));
    }

    #[test]
    fn test_sale_effects() {
        use SaleStatus::*;
        assert_eq!(sale_effect(None, Pending).unwrap(), None);
        assert_eq!(sale_effect(None, Completed).unwrap(), Some(StockDirection::Decrement));
        assert_eq!(sale_effect(Some(Pending), Completed).unwrap(), Some(StockDirection::Decrement));
        assert_eq!(sale_effect(Some(Pending), Cancelled).unwrap(), None);
        assert_eq!(sale_effect(Some(Completed), Cancelled).unwrap(), Some(StockDirection::Increment));

        assert!(sale_effect(None, Cancelled).is_err());
        assert!(sale_effect(Some(Cancelled), Cancelled).is_err());
        assert!(sale_effect(Some(Cancelled), Completed).is_err());
        assert!(sale_effect(Some(Completed), Completed).is_err());
        assert!(sale_effect(Some(Completed), Pending).is_err());
    }

    #[test]
    fn test_purchase_effects() {
        use PurchaseStatus::*;
        assert_eq!(purchase_effect(None, Active).unwrap(), Some(StockDirection::Increment));
        assert_eq!(purchase_effect(Some(Active), Cancelled).unwrap(), Some(StockDirection::Decrement));
        assert!(purchase_effect(Some(Cancelled), Cancelled).is_err());
        assert!(purchase_effect(None, Cancelled).is_err());
    }

    #[test]
    fn test_check_availability() {
        assert!(check_availability("ARZ", 5, 5).is_ok());
        let err = check_availability("ARZ", 3, 5).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 3, requested: 5, .. }
        ));
    }
}
