//! # Product Commands
//!
//! Catalog maintenance and inventory lookups.
//!
//! ## Stock Changes
//! The product form never writes `stock` directly. A new product's initial
//! stock and every later correction go through [`adjust_stock`], which
//! records a manual stock movement.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use mostrador_core::validation::{
    validate_description, validate_price_cents, validate_product_code, validate_search_query,
    validate_stock,
};
use mostrador_core::{Product, StockMovement};

use super::{non_blank, page_size};
use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_UNIT: &str = "pieza";

/// Product data transfer object for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: String,
    pub code: String,
    pub description: String,
    pub category: Option<String>,
    pub unit: String,
    pub purchase_price_cents: i64,
    pub sale_price_cents: i64,
    pub stock: i64,
    pub is_active: bool,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        ProductDto {
            id: p.id,
            code: p.code,
            description: p.description,
            category: p.category,
            unit: p.unit,
            purchase_price_cents: p.purchase_price_cents,
            sale_price_cents: p.sale_price_cents,
            stock: p.stock,
            is_active: p.is_active,
        }
    }
}

/// Product form fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub code: String,
    pub description: String,
    pub category: Option<String>,
    /// Unit of measure; defaults to "pieza".
    pub unit: Option<String>,
    pub purchase_price_cents: i64,
    pub sale_price_cents: i64,
    /// Only read on create.
    pub initial_stock: Option<i64>,
}

impl ProductInput {
    fn validate(&self) -> Result<(), ApiError> {
        validate_product_code(self.code.trim())?;
        validate_description(&self.description)?;
        validate_price_cents(self.purchase_price_cents)?;
        validate_price_cents(self.sale_price_cents)?;
        if let Some(stock) = self.initial_stock {
            validate_stock(stock)?;
        }
        Ok(())
    }

    /// Copies the form fields onto `product`, leaving id, stock and
    /// timestamps alone.
    fn apply_to(self, product: &mut Product) {
        product.code = self.code.trim().to_string();
        product.description = self.description.trim().to_string();
        product.category = non_blank(self.category);
        product.unit = non_blank(self.unit).unwrap_or_else(|| DEFAULT_UNIT.to_string());
        product.purchase_price_cents = self.purchase_price_cents;
        product.sale_price_cents = self.sale_price_cents;
    }
}

/// Searches active products by code or description.
///
/// ## Arguments
/// * `query` - Text to match; empty lists the catalog
/// * `limit` - Maximum results (default: 20, max: 100)
pub async fn search_products(
    state: &AppState,
    query: &str,
    limit: Option<u32>,
) -> Result<Vec<ProductDto>, ApiError> {
    let start = Instant::now();
    let query = validate_search_query(query)?;
    let limit = page_size(limit, 20);

    debug!(query = %query, limit = %limit, "search_products command");

    let products = state.db().products().search(&query, limit).await?;
    let dtos: Vec<ProductDto> = products.into_iter().map(ProductDto::from).collect();

    debug!(
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        count = dtos.len(),
        "search_products complete"
    );
    Ok(dtos)
}

pub async fn get_product(state: &AppState, id: &str) -> Result<ProductDto, ApiError> {
    debug!(id = %id, "get_product command");
    let product = state
        .db()
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;
    Ok(ProductDto::from(product))
}

/// Looks a product up by its business code (barcode scanners, quick entry).
pub async fn get_product_by_code(state: &AppState, code: &str) -> Result<ProductDto, ApiError> {
    debug!(code = %code, "get_product_by_code command");
    let product = state
        .db()
        .products()
        .get_by_code(code)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", code))?;
    Ok(ProductDto::from(product))
}

/// Creates a product. A positive initial stock is booked as a manual
/// movement.
pub async fn create_product(state: &AppState, input: ProductInput) -> Result<ProductDto, ApiError> {
    debug!(code = %input.code, "create_product command");
    input.validate()?;

    let now = Utc::now();
    let initial_stock = input.initial_stock.unwrap_or(0);
    let mut product = Product {
        id: Uuid::new_v4().to_string(),
        code: String::new(),
        description: String::new(),
        category: None,
        unit: DEFAULT_UNIT.to_string(),
        purchase_price_cents: 0,
        sale_price_cents: 0,
        stock: 0,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    input.apply_to(&mut product);

    let products = state.db().products();
    let mut product = products.insert(&product).await?;

    if initial_stock > 0 {
        let movement = products.adjust_stock(&product.id, initial_stock).await?;
        product.stock = movement.stock_after;
    }

    info!(id = %product.id, code = %product.code, "Product created");
    Ok(ProductDto::from(product))
}

/// Updates catalog fields. Stock is left unchanged.
pub async fn update_product(
    state: &AppState,
    id: &str,
    input: ProductInput,
) -> Result<ProductDto, ApiError> {
    debug!(id = %id, "update_product command");
    input.validate()?;

    let products = state.db().products();
    let mut product = products
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;

    input.apply_to(&mut product);
    products.update(&product).await?;

    get_product(state, id).await
}

/// Deactivates a product. Its sales and purchases keep their snapshots.
pub async fn delete_product(state: &AppState, id: &str) -> Result<(), ApiError> {
    debug!(id = %id, "delete_product command");
    state.db().products().soft_delete(id).await?;
    Ok(())
}

/// Manual inventory correction by `delta` units (negative to remove).
///
/// Removing more than is on hand leaves the stock at zero; the returned
/// movement is flagged as clamped.
pub async fn adjust_stock(
    state: &AppState,
    id: &str,
    delta: i64,
) -> Result<StockMovement, ApiError> {
    debug!(id = %id, delta = %delta, "adjust_stock command");

    if delta == 0 {
        return Err(ApiError::validation("Adjustment must not be zero"));
    }

    let products = state.db().products();
    let product = products
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;
    if !product.is_active {
        return Err(ApiError::validation(format!(
            "Product {} is no longer active",
            product.code
        )));
    }

    Ok(products.adjust_stock(id, delta).await?)
}

/// Active products at or below `threshold` units, lowest first.
///
/// Without a threshold the configured `low_stock_threshold` is used.
pub async fn low_stock_products(
    state: &AppState,
    threshold: Option<i64>,
) -> Result<Vec<ProductDto>, ApiError> {
    let threshold = threshold.unwrap_or_else(|| state.config.snapshot().low_stock_threshold);
    debug!(threshold = %threshold, "low_stock_products command");

    let products = state.db().products().low_stock(threshold).await?;
    Ok(products.into_iter().map(ProductDto::from).collect())
}

/// Recent stock movements of a product, newest first.
pub async fn stock_movements(
    state: &AppState,
    product_id: &str,
    limit: Option<u32>,
) -> Result<Vec<StockMovement>, ApiError> {
    debug!(product_id = %product_id, "stock_movements command");
    let movements = state
        .db()
        .stock()
        .list_for_product(product_id, page_size(limit, 50))
        .await?;
    Ok(movements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{app, stocked};
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_create_books_initial_stock_as_movement() {
        let state = app().await;
        let product = stocked(&state, "ARZ-1KG", 12).await;
        assert_eq!(product.stock, 12);

        let movements = stock_movements(&state, &product.id, None).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].stock_after, 12);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let state = app().await;
        stocked(&state, "ARZ-1KG", 0).await;

        let err = create_product(
            &state,
            ProductInput {
                code: "ARZ-1KG".to_string(),
                description: "Otro arroz".to_string(),
                category: None,
                unit: None,
                purchase_price_cents: 100,
                sale_price_cents: 200,
                initial_stock: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Duplicate);
    }

    #[tokio::test]
    async fn test_price_above_maximum_rejected() {
        let state = app().await;

        let err = create_product(
            &state,
            ProductInput {
                code: "ORO-1KG".to_string(),
                description: "Lingote".to_string(),
                category: None,
                unit: None,
                purchase_price_cents: 100,
                sale_price_cents: mostrador_core::MAX_PRICE_CENTS + 1,
                initial_stock: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(get_product_by_code(&state, "ORO-1KG").await.is_err());
    }

    #[tokio::test]
    async fn test_update_keeps_stock() {
        let state = app().await;
        let product = stocked(&state, "FRJ-1KG", 7).await;

        let updated = update_product(
            &state,
            &product.id,
            ProductInput {
                code: "FRJ-1KG".to_string(),
                description: "Frijol negro".to_string(),
                category: Some("  ".to_string()),
                unit: Some("kg".to_string()),
                purchase_price_cents: 2_000,
                sale_price_cents: 2_900,
                initial_stock: Some(99),
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.stock, 7);
        assert_eq!(updated.sale_price_cents, 2_900);
        assert_eq!(updated.category, None);
        assert_eq!(updated.unit, "kg");
    }

    #[tokio::test]
    async fn test_adjust_stock_clamps_and_low_stock_uses_config() {
        let state = app().await;
        let product = stocked(&state, "SAL-1KG", 3).await;
        stocked(&state, "AZU-2KG", 40).await;

        let movement = adjust_stock(&state, &product.id, -5).await.unwrap();
        assert_eq!(movement.stock_after, 0);
        assert!(movement.clamped);

        assert!(adjust_stock(&state, &product.id, 0).await.is_err());

        let low = low_stock_products(&state, None).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].code, "SAL-1KG");
    }

    #[tokio::test]
    async fn test_deleted_product_leaves_search() {
        let state = app().await;
        let product = stocked(&state, "CLO-1L", 4).await;

        delete_product(&state, &product.id).await.unwrap();

        assert!(search_products(&state, "CLO", None).await.unwrap().is_empty());
        assert!(!get_product(&state, &product.id).await.unwrap().is_active);
        assert!(adjust_stock(&state, &product.id, 1).await.is_err());
    }
}
