//! # Payment Settlement
//!
//! Turns a payment method, a total and the amount handed over into the
//! values stored on a completed sale.
//!
//! ```text
//!   Cash      tendered ≥ total required, change = tendered − total
//!   Card      tendered ignored, exact total charged
//!   Transfer  tendered ignored, exact total charged
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::PaymentMethod;

/// Payment data recorded when a sale completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentSettlement {
    pub method: PaymentMethod,
    /// Cash handed over; `None` for card and transfer.
    pub tendered: Option<Money>,
    /// Change returned; `None` for card and transfer.
    pub change: Option<Money>,
}

/// What the cashier entered: method and, for cash, the amount handed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    pub tendered: Option<Money>,
}

impl PaymentRequest {
    pub fn cash(tendered: Money) -> Self {
        PaymentRequest {
            method: PaymentMethod::Cash,
            tendered: Some(tendered),
        }
    }

    pub fn card() -> Self {
        PaymentRequest {
            method: PaymentMethod::Card,
            tendered: None,
        }
    }

    pub fn transfer() -> Self {
        PaymentRequest {
            method: PaymentMethod::Transfer,
            tendered: None,
        }
    }

    /// Settles this request against `total`.
    pub fn settle(&self, total: Money) -> CoreResult<PaymentSettlement> {
        settle_payment(self.method, total, self.tendered)
    }
}

/// Settles a payment against a sale total.
///
/// ```rust
/// use mostrador_core::money::Money;
/// use mostrador_core::payment::settle_payment;
/// use mostrador_core::types::PaymentMethod;
///
/// let s = settle_payment(PaymentMethod::Cash, Money::from_cents(8_450), Some(Money::from_cents(10_000))).unwrap();
/// assert_eq!(s.change, Some(Money::from_cents(1_550)));
///
/// assert!(settle_payment(PaymentMethod::Cash, Money::from_cents(8_450), Some(Money::from_cents(5_000))).is_err());
/// ```
pub fn settle_payment(
    method: PaymentMethod,
    total: Money,
    tendered: Option<Money>,
) -> CoreResult<PaymentSettlement> {
    if total.is_negative() {
        return Err(CoreError::InvalidPayment {
            reason: format!("total {} is negative", total),
        });
    }

    match method {
        PaymentMethod::Cash => {
            let tendered = tendered.ok_or_else(|| CoreError::InvalidPayment {
                reason: "cash payments need the amount tendered".to_string(),
            })?;

            if tendered < total {
                return Err(CoreError::InvalidPayment {
                    reason: format!("tendered {} does not cover total {}", tendered, total),
                });
            }

            Ok(PaymentSettlement {
                method,
                tendered: Some(tendered),
                change: Some(tendered - total),
            })
        }
        PaymentMethod::Card | PaymentMethod::Transfer => Ok(PaymentSettlement {
            method,
            tendered: None,
            change: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_cash() {
        let s = settle_payment(
            PaymentMethod::Cash,
            Money::from_cents(1_000),
            Some(Money::from_cents(1_000)),
        )
        .unwrap();
        assert_eq!(s.change, Some(Money::zero()));
    }

    #[test]
    fn test_cash_requires_tendered() {
        let err = settle_payment(PaymentMethod::Cash, Money::from_cents(1_000), None).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPayment { .. }));
    }

    #[test]
    fn test_card_ignores_tendered() {
        let s = settle_payment(
            PaymentMethod::Card,
            Money::from_cents(1_000),
            Some(Money::from_cents(50)),
        )
        .unwrap();
        assert_eq!(s.tendered, None);
        assert_eq!(s.change, None);
    }

    #[test]
    fn test_request_settles_against_total() {
        let s = PaymentRequest::cash(Money::from_cents(20_000))
            .settle(Money::from_cents(10_440))
            .unwrap();
        assert_eq!(s.change, Some(Money::from_cents(9_560)));
        assert!(PaymentRequest::transfer().settle(Money::from_cents(1)).is_ok());
    }
}
