//! # mostrador-core: Pure Business Logic for Mostrador
//!
//! Pricing, stock rules, drafts and validation for the Mostrador back office,
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mostrador Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Backoffice commands                          │   │
//! │  │    add_sale_line, save_sale, cancel_purchase, sales_summary     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ mostrador-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  money  │ │ pricing │ │  stock  │ │  draft  │ │validation│ │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 mostrador-db (Database Layer)                   │   │
//! │  │       SQLite repositories, migrations, stock transactions       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic
//! - [`types`] - Domain types (Product, Sale, Purchase, Percentage, ...)
//! - [`pricing`] - Line pricing and transaction totals
//! - [`stock`] - Stock directions, clamping and lifecycle effects
//! - [`draft`] - The transaction being built before it is saved
//! - [`payment`] - Cash/card/transfer settlement
//! - [`validation`] - Field rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use mostrador_core::{Money, Percentage, TransactionDraft};
//! use mostrador_core::pricing::LinePricing;
//! # use mostrador_core::Product;
//! # let now = chrono::Utc::now();
//! # let rice = Product {
//! #     id: "p1".into(), code: "ARZ-1KG".into(), description: "Arroz 1kg".into(),
//! #     category: None, unit: "pieza".into(), purchase_price_cents: 1_800,
//! #     sale_price_cents: 2_500, stock: 40, is_active: true,
//! #     created_at: now, updated_at: now,
//! # };
//!
//! let mut draft = TransactionDraft::sale(Percentage::from_percent(16));
//! draft.add_product(&rice, 4).unwrap();
//! draft.set_header_discount(Percentage::from_percent(10)).unwrap();
//!
//! let totals = draft.totals();
//! assert_eq!(totals.subtotal, Money::from_cents(10_000));
//! assert_eq!(totals.discount, Money::from_cents(1_000));
//! assert_eq!(totals.tax, Money::from_cents(1_440));
//! assert_eq!(totals.total, Money::from_cents(10_440));
//! # let _ = LinePricing::Standard;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod draft;
pub mod error;
pub mod money;
pub mod payment;
pub mod pricing;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use draft::{DraftKind, DraftLine, TransactionDraft};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use payment::{PaymentRequest, PaymentSettlement};
pub use pricing::{LinePricing, TransactionTotals};
pub use stock::{StockAdjustment, StockChange, StockDirection};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines in a single sale or purchase.
pub const MAX_DRAFT_LINES: usize = 100;

/// Maximum quantity on a single line.
///
/// Catches typing 10000 instead of 10 while still allowing bulk purchases.
pub const MAX_LINE_QUANTITY: i64 = 9_999;

/// Highest unit price accepted, in cents (100 million).
///
/// With at most [`MAX_DRAFT_LINES`] lines of [`MAX_LINE_QUANTITY`] units a
/// transaction total stays far below `i64::MAX`.
pub const MAX_PRICE_CENTS: i64 = 10_000_000_000;

/// Tax rate used until one is configured (IVA 16%).
pub const DEFAULT_TAX_BPS: u32 = 1_600;

/// Stock level at or below which a product is reported as low.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;
