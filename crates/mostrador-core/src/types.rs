//! # Domain Types
//!
//! Core domain types used throughout Mostrador.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    Purchase     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  code (business)│   │  folio          │   │  folio          │       │
//! │  │  sale_price     │   │  status         │   │  supplier_id    │       │
//! │  │  stock          │   │  totals         │   │  totals         │       │
//! │  └─────────────────┘   └────────┬────────┘   └────────┬────────┘       │
//! │                                 │ 1..n                │ 1..n           │
//! │                        ┌────────▼────────┐   ┌────────▼────────┐       │
//! │                        │    SaleItem     │   │  PurchaseItem   │       │
//! │                        │  LinePricing    │   │  LinePricing    │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Client, Supplier, StockMovement, ConfigEntry, CompanyProfile          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (code, folio) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::pricing::{LinePricing, TransactionTotals};
use crate::stock::StockDirection;

// =============================================================================
// Percentage
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// Used for tax (IVA), header discounts and line discounts.
///
/// ## Why Basis Points?
/// 1 basis point = 0.01%. 1600 bps = 16% keeps every rate an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percentage(u32);

impl Percentage {
    /// 100% in basis points.
    pub const FULL_BPS: u32 = 10_000;

    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percentage(bps)
    }

    /// Creates a percentage from whole percent points (`16` → 16%).
    #[inline]
    pub const fn from_percent(pct: u32) -> Self {
        Percentage(pct * 100)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }

    /// Checks if the percentage is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Whether the value lies within 0%..=100%.
    #[inline]
    pub const fn is_within_full(&self) -> bool {
        self.0 <= Self::FULL_BPS
    }
}

impl Default for Percentage {
    fn default() -> Self {
        Percentage::zero()
    }
}

/// Parses `"16"`, `"8.25"` or `"8.5"` into basis points without floats.
impl FromStr for Percentage {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFormat {
            field: "percentage".to_string(),
            reason: "must be a number with at most two decimals".to_string(),
        };

        let s = s.trim().trim_end_matches('%').trim();
        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty()
            || frac.len() > 2
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: u32 = whole.parse().map_err(|_| invalid())?;
        let frac: u32 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u32>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };

        whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(frac))
            .map(Percentage)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{}%", whole)
        } else if frac % 10 == 0 {
            write!(f, "{}.{}%", whole, frac / 10)
        } else {
            write!(f, "{}.{:02}%", whole, frac)
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business code, also printed as barcode on shelf labels.
    pub code: String,

    /// Display name shown on tickets and reports.
    pub description: String,

    pub category: Option<String>,

    /// Unit of measure ("pieza", "kg", "caja", ...).
    pub unit: String,

    /// Cost from the supplier, in cents.
    pub purchase_price_cents: i64,

    /// Price charged to clients, in cents.
    pub sale_price_cents: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_cents(self.purchase_price_cents)
    }

    /// Checks if `quantity` units can be sold from current stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

// =============================================================================
// Parties
// =============================================================================

/// A client the business sells to.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub name: String,
    /// Tax registry id (RFC).
    pub tax_id: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A supplier the business buys from.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub contact_name: Option<String>,
    pub tax_id: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Statuses
// =============================================================================

/// The status of a sale.
///
/// ```text
///   ┌─────────┐  complete   ┌───────────┐
///   │ Pending │────────────►│ Completed │   stock decremented on entry
///   └────┬────┘             └─────┬─────┘
///        │ cancel                 │ cancel (stock restored)
///        ▼                        ▼
///   ┌──────────────────────────────────┐
///   │            Cancelled             │
///   └──────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Saved without stock effect; can be continued later.
    Pending,
    /// Paid and effective: stock has been decremented.
    Completed,
    /// Voided; any stock effect was reversed.
    Cancelled,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Pending
    }
}

/// The status of a purchase. Purchases are effective on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Active,
    Cancelled,
}

impl Default for PurchaseStatus {
    fn default() -> Self {
        PurchaseStatus::Active
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash; tendered amount and change are recorded.
    Cash,
    /// Card on an external terminal.
    Card,
    /// Bank transfer.
    Transfer,
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "efectivo" => Ok(PaymentMethod::Cash),
            "card" | "tarjeta" | "credit" | "debit" => Ok(PaymentMethod::Card),
            "transfer" | "transferencia" => Ok(PaymentMethod::Transfer),
            other => Err(ValidationError::InvalidFormat {
                field: "payment method".to_string(),
                reason: format!("unknown method '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A sale header with its computed totals.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Sequential number printed on the ticket.
    pub folio: i64,
    pub client_id: Option<String>,
    pub status: SaleStatus,
    pub header_discount_bps: u32,
    pub tax_bps: u32,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub subtotal_after_discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: Option<PaymentMethod>,
    /// Cash only: what the client handed over.
    pub tendered_cents: Option<i64>,
    /// Cash only: change returned.
    pub change_cents: Option<i64>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Sale {
    /// Returns the stored totals.
    pub fn totals(&self) -> TransactionTotals {
        TransactionTotals {
            subtotal: Money::from_cents(self.subtotal_cents),
            discount: Money::from_cents(self.discount_cents),
            subtotal_after_discount: Money::from_cents(self.subtotal_after_discount_cents),
            tax: Money::from_cents(self.tax_cents),
            total: Money::from_cents(self.total_cents),
        }
    }

    #[inline]
    pub fn header_discount(&self) -> Percentage {
        Percentage::from_bps(self.header_discount_bps)
    }

    #[inline]
    pub fn tax_rate(&self) -> Percentage {
        Percentage::from_bps(self.tax_bps)
    }
}

/// A line of a sale.
///
/// Uses the snapshot pattern: code, description and list price are frozen at
/// the time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub code_snapshot: String,
    pub description_snapshot: String,
    pub quantity: i64,
    /// Unit price captured from the product when the line was added.
    pub list_price_cents: i64,
    pub pricing: LinePricing,
    /// Price actually charged per unit after line pricing.
    pub unit_price_cents: i64,
    /// unit_price × quantity.
    pub subtotal_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Purchase
// =============================================================================

/// A purchase from a supplier. Stock is incremented when it is created.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    pub folio: i64,
    pub supplier_id: String,
    pub status: PurchaseStatus,
    pub header_discount_bps: u32,
    pub tax_bps: u32,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub subtotal_after_discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Purchase {
    /// Returns the stored totals.
    pub fn totals(&self) -> TransactionTotals {
        TransactionTotals {
            subtotal: Money::from_cents(self.subtotal_cents),
            discount: Money::from_cents(self.discount_cents),
            subtotal_after_discount: Money::from_cents(self.subtotal_after_discount_cents),
            tax: Money::from_cents(self.tax_cents),
            total: Money::from_cents(self.total_cents),
        }
    }
}

/// A line of a purchase; list price is the product's purchase price.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    pub product_id: String,
    pub code_snapshot: String,
    pub description_snapshot: String,
    pub quantity: i64,
    pub list_price_cents: i64,
    pub pricing: LinePricing,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Stock Movement
// =============================================================================

/// Why stock changed. Stored with every movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    SaleCompleted,
    SaleCancelled,
    PurchaseCreated,
    PurchaseCancelled,
    /// Manual inventory correction.
    Manual,
}

/// One applied stock change (audit log row).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub direction: StockDirection,
    pub quantity: i64,
    pub stock_before: i64,
    pub stock_after: i64,
    /// True when a decrement hit zero before consuming the whole quantity.
    pub clamped: bool,
    pub reason: MovementReason,
    /// Sale or purchase id, when the movement came from one.
    pub reference_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Configuration Types
// =============================================================================

/// A key-value configuration entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// The business's own data, printed on tickets and reports.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CompanyProfile {
    pub name: String,
    pub tax_id: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Storage URL of the logo embedded in generated documents.
    pub logo_url: Option<String>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
