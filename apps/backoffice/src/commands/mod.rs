//! # Commands
//!
//! Actions the dashboard invokes. Each takes `&AppState` plus its
//! arguments and returns `Result<Dto, ApiError>`; DTOs serialise in
//! camelCase.
//!
//! ## Command Groups
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  product   search, CRUD, manual stock correction, low stock            │
//! │  party     clients and suppliers                                       │
//! │  sale      draft editing, save (pending / completed), complete, cancel │
//! │  purchase  draft editing, save, cancel                                 │
//! │  config    settings entries and company profile                        │
//! │  report    sales / purchase summaries, top products, valuation         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod draft;
pub mod party;
pub mod product;
pub mod purchase;
pub mod report;
pub mod sale;

/// Clamps a caller-supplied page size.
pub(crate) fn page_size(limit: Option<u32>, default: u32) -> u32 {
    limit.unwrap_or(default).clamp(1, 100)
}

/// Treats blank optional text as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod test_support {
    use mostrador_db::DbConfig;

    use super::product::{create_product, ProductDto, ProductInput};
    use crate::state::AppState;

    pub async fn app() -> AppState {
        AppState::open(DbConfig::in_memory()).await.unwrap()
    }

    /// Creates a product priced 25.00 (cost 18.00) with `stock` units.
    pub async fn stocked(state: &AppState, code: &str, stock: i64) -> ProductDto {
        create_product(
            state,
            ProductInput {
                code: code.to_string(),
                description: format!("Producto {}", code),
                category: None,
                unit: None,
                purchase_price_cents: 1_800,
                sale_price_cents: 2_500,
                initial_stock: Some(stock),
            },
        )
        .await
        .unwrap()
    }
}
