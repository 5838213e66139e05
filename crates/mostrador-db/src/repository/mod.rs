//! # Repository Module
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Backoffice command                                                    │
//! │       │  db.sales().create(new_sale)                                   │
//! │       ▼                                                                 │
//! │  SaleRepository                                                        │
//! │  ├── BEGIN                                                             │
//! │  ├── insert header + lines                                             │
//! │  ├── stock::apply_adjustments(&mut tx, ...)   ◄── shared with purchase │
//! │  └── COMMIT (or rollback on any error)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - catalog CRUD, search, low stock, manual adjustments
//! - [`party::ClientRepository`], [`party::SupplierRepository`] - parties
//! - [`stock::StockRepository`] - movement log and the adjustment protocol
//! - [`sale::SaleRepository`] - sale lifecycle
//! - [`purchase::PurchaseRepository`] - purchase lifecycle
//! - [`config::ConfigRepository`], [`config::CompanyRepository`] - settings
//! - [`report::ReportRepository`] - summaries

pub mod config;
pub mod party;
pub mod product;
pub mod purchase;
pub mod report;
pub mod sale;
pub mod stock;

use chrono::{DateTime, Utc};
use mostrador_core::pricing::PricedLine;
use mostrador_core::{CoreResult, DraftLine, LinePricing, PurchaseItem, SaleItem};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::error::DbResult;

/// Generates a new entity ID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builds a `LIKE` pattern matching `query` anywhere, with `\` as escape.
pub(crate) fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// A stored sale or purchase line with its pricing still in column form.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ItemRow {
    pub id: String,
    pub parent_id: String,
    pub product_id: String,
    pub code_snapshot: String,
    pub description_snapshot: String,
    pub quantity: i64,
    pub list_price_cents: i64,
    pub pricing_kind: String,
    pub line_discount_bps: Option<u32>,
    pub override_price_cents: Option<i64>,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl ItemRow {
    fn pricing(&self) -> CoreResult<LinePricing> {
        LinePricing::from_parts(
            &self.pricing_kind,
            self.line_discount_bps,
            self.override_price_cents,
        )
    }

    pub fn into_sale_item(self) -> CoreResult<SaleItem> {
        let pricing = self.pricing()?;
        Ok(SaleItem {
            id: self.id,
            sale_id: self.parent_id,
            product_id: self.product_id,
            code_snapshot: self.code_snapshot,
            description_snapshot: self.description_snapshot,
            quantity: self.quantity,
            list_price_cents: self.list_price_cents,
            pricing,
            unit_price_cents: self.unit_price_cents,
            subtotal_cents: self.subtotal_cents,
            created_at: self.created_at,
        })
    }

    pub fn into_purchase_item(self) -> CoreResult<PurchaseItem> {
        let pricing = self.pricing()?;
        Ok(PurchaseItem {
            id: self.id,
            purchase_id: self.parent_id,
            product_id: self.product_id,
            code_snapshot: self.code_snapshot,
            description_snapshot: self.description_snapshot,
            quantity: self.quantity,
            list_price_cents: self.list_price_cents,
            pricing,
            unit_price_cents: self.unit_price_cents,
            subtotal_cents: self.subtotal_cents,
            created_at: self.created_at,
        })
    }
}

/// The line table of a sale or a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemTable {
    Sale,
    Purchase,
}

impl ItemTable {
    fn insert_sql(self) -> &'static str {
        match self {
            ItemTable::Sale => {
                r#"
                INSERT INTO sale_items (
                    id, sale_id, line_no, product_id, code_snapshot, description_snapshot,
                    quantity, list_price_cents, pricing_kind, line_discount_bps,
                    override_price_cents, unit_price_cents, subtotal_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#
            }
            ItemTable::Purchase => {
                r#"
                INSERT INTO purchase_items (
                    id, purchase_id, line_no, product_id, code_snapshot, description_snapshot,
                    quantity, list_price_cents, pricing_kind, line_discount_bps,
                    override_price_cents, unit_price_cents, subtotal_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#
            }
        }
    }

    /// Selects the lines of one parent, in entry order, as [`ItemRow`]s.
    pub fn select_sql(self) -> &'static str {
        match self {
            ItemTable::Sale => {
                r#"
                SELECT id, sale_id AS parent_id, product_id, code_snapshot, description_snapshot,
                       quantity, list_price_cents, pricing_kind, line_discount_bps,
                       override_price_cents, unit_price_cents, subtotal_cents, created_at
                FROM sale_items
                WHERE sale_id = ?1
                ORDER BY line_no
                "#
            }
            ItemTable::Purchase => {
                r#"
                SELECT id, purchase_id AS parent_id, product_id, code_snapshot, description_snapshot,
                       quantity, list_price_cents, pricing_kind, line_discount_bps,
                       override_price_cents, unit_price_cents, subtotal_cents, created_at
                FROM purchase_items
                WHERE purchase_id = ?1
                ORDER BY line_no
                "#
            }
        }
    }
}

/// Writes draft lines as snapshot items of `parent_id`, numbered from 1.
pub(crate) async fn insert_items(
    conn: &mut SqliteConnection,
    table: ItemTable,
    parent_id: &str,
    lines: &[DraftLine],
    created_at: DateTime<Utc>,
) -> DbResult<()> {
    for (index, line) in lines.iter().enumerate() {
        let (kind, discount_bps, override_cents) = line.pricing.to_parts();

        sqlx::query(table.insert_sql())
            .bind(new_id())
            .bind(parent_id)
            .bind(index as i64 + 1)
            .bind(&line.product_id)
            .bind(&line.code)
            .bind(&line.description)
            .bind(line.quantity)
            .bind(line.list_price.cents())
            .bind(kind)
            .bind(discount_bps)
            .bind(override_cents)
            .bind(line.unit_price().cents())
            .bind(line.line_subtotal().cents())
            .bind(created_at)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Fixtures shared by repository tests.
#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use mostrador_core::{Client, Product, Supplier};

    use super::new_id;
    use crate::{Database, DbConfig};

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn product(code: &str, description: &str, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: new_id(),
            code: code.to_string(),
            description: description.to_string(),
            category: Some("Abarrotes".to_string()),
            unit: "pieza".to_string(),
            purchase_price_cents: 1_800,
            sale_price_cents: 2_500,
            stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn client(name: &str) -> Client {
        let now = Utc::now();
        Client {
            id: new_id(),
            name: name.to_string(),
            tax_id: None,
            phone: None,
            email: None,
            address: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn supplier(name: &str) -> Supplier {
        let now = Utc::now();
        Supplier {
            id: new_id(),
            name: name.to_string(),
            contact_name: None,
            tax_id: None,
            phone: None,
            email: None,
            address: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("arroz"), "%arroz%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }
}
