//! # Report Commands
//!
//! Summaries over whole days. A range `from..=to` of calendar dates (UTC)
//! becomes the half-open timestamp range `[from 00:00, to + 1 day 00:00)`.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use mostrador_db::{InventoryValuation, PurchaseSummary, SalesSummary, TopProduct};

use crate::error::ApiError;
use crate::state::AppState;

/// Midnight UTC at the start of `date`.
fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Converts optional inclusive dates into optional `[from, to)` bounds.
pub(crate) fn day_bounds(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), ApiError> {
    if let (Some(from), Some(to)) = (from, to) {
        if to < from {
            return Err(ApiError::validation(format!(
                "Date range ends ({}) before it starts ({})",
                to, from
            )));
        }
    }

    Ok((
        from.map(day_start),
        to.map(|d| day_start(d) + Duration::days(1)),
    ))
}

/// A report period. Missing ends default to today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ReportRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        ReportRange { from, to }
    }

    /// Today only.
    pub fn today() -> Self {
        ReportRange::default()
    }

    /// The concrete dates, `from` defaulting to `to` and `to` to today.
    pub fn dates(&self) -> (NaiveDate, NaiveDate) {
        let to = self.to.unwrap_or_else(|| Utc::now().date_naive());
        let from = self.from.unwrap_or(to);
        (from, to)
    }

    fn bounds(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), ApiError> {
        let (from, to) = self.dates();
        match day_bounds(Some(from), Some(to))? {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(ApiError::internal("Report range has no bounds")),
        }
    }
}

/// All reports for one period, as printed by the report runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub sales: SalesSummary,
    pub purchases: PurchaseSummary,
    pub top_products: Vec<TopProduct>,
    pub inventory: InventoryValuation,
    pub low_stock_count: usize,
}

pub async fn sales_summary(state: &AppState, range: ReportRange) -> Result<SalesSummary, ApiError> {
    let (from, to) = range.bounds()?;
    debug!(%from, %to, "sales_summary command");
    Ok(state.db().reports().sales_summary(from, to).await?)
}

pub async fn purchase_summary(
    state: &AppState,
    range: ReportRange,
) -> Result<PurchaseSummary, ApiError> {
    let (from, to) = range.bounds()?;
    debug!(%from, %to, "purchase_summary command");
    Ok(state.db().reports().purchase_summary(from, to).await?)
}

/// Best sellers by units in completed sales (default 10, max 100).
pub async fn top_products(
    state: &AppState,
    range: ReportRange,
    limit: Option<u32>,
) -> Result<Vec<TopProduct>, ApiError> {
    let (from, to) = range.bounds()?;
    let limit = super::page_size(limit, 10);
    debug!(%from, %to, limit, "top_products command");
    Ok(state.db().reports().top_products(from, to, limit).await?)
}

pub async fn inventory_valuation(state: &AppState) -> Result<InventoryValuation, ApiError> {
    debug!("inventory_valuation command");
    Ok(state.db().reports().inventory_valuation().await?)
}

/// Every report for `range` in one response.
pub async fn period_report(state: &AppState, range: ReportRange) -> Result<PeriodReport, ApiError> {
    let (from, to) = range.dates();
    let threshold = state.config.snapshot().low_stock_threshold;

    Ok(PeriodReport {
        from,
        to,
        sales: sales_summary(state, range).await?,
        purchases: purchase_summary(state, range).await?,
        top_products: top_products(state, range, None).await?,
        inventory: inventory_valuation(state).await?,
        low_stock_count: state.db().products().low_stock(threshold).await?.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::sale::{add_sale_line, cancel_sale, save_sale, PaymentInput};
    use crate::commands::test_support::{app, stocked};
    use mostrador_core::PaymentMethod;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_bounds_are_half_open() {
        let (from, to) = day_bounds(Some(date(2024, 3, 1)), Some(date(2024, 3, 31))).unwrap();
        assert_eq!(from.unwrap().to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(to.unwrap().to_rfc3339(), "2024-04-01T00:00:00+00:00");

        assert_eq!(day_bounds(None, None).unwrap(), (None, None));
        assert!(day_bounds(Some(date(2024, 3, 2)), Some(date(2024, 3, 1))).is_err());
    }

    #[test]
    fn test_range_defaults_to_today() {
        let today = Utc::now().date_naive();
        assert_eq!(ReportRange::today().dates(), (today, today));

        let range = ReportRange::new(None, Some(date(2024, 5, 10)));
        assert_eq!(range.dates(), (date(2024, 5, 10), date(2024, 5, 10)));
    }

    #[tokio::test]
    async fn test_period_report() {
        let state = app().await;
        let rice = stocked(&state, "ARZ-1KG", 10).await;
        stocked(&state, "SAL-1KG", 2).await;

        let card = Some(PaymentInput {
            method: PaymentMethod::Card,
            tendered_cents: None,
        });
        add_sale_line(&state, &rice.id, Some(2)).await.unwrap();
        save_sale(&state, card).await.unwrap();
        add_sale_line(&state, &rice.id, Some(1)).await.unwrap();
        let voided = save_sale(&state, card).await.unwrap();
        cancel_sale(&state, &voided.id).await.unwrap();

        let report = period_report(&state, ReportRange::today()).await.unwrap();

        // 2 × 25.00 + 16%
        assert_eq!(report.sales.sale_count, 1);
        assert_eq!(report.sales.total_cents, 5_800);
        assert_eq!(report.sales.cancelled_count, 1);
        assert_eq!(report.top_products.len(), 1);
        assert_eq!(report.top_products[0].quantity, 2);
        assert_eq!(report.inventory.units, 8 + 2);
        assert_eq!(report.low_stock_count, 1);
        assert_eq!(report.purchases, PurchaseSummary::default());
    }
}
