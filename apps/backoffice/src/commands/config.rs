//! # Config Commands
//!
//! Settings entries and the company profile.
//!
//! Entries the back office understands (`tax_rate`, `store_name`,
//! `low_stock_threshold`, `currency_symbol`) are validated before they are
//! stored and take effect immediately. Any other snake_case key is stored
//! as-is for the dashboard's own use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use mostrador_core::validation::{validate_config_key, validate_email, validate_party_name};
use mostrador_core::{CompanyProfile, ConfigEntry};
use mostrador_db::CompanyProfileInput;

use super::non_blank;
use crate::error::ApiError;
use crate::state::{AppState, Settings};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDto {
    pub name: String,
    pub tax_id: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub logo_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<CompanyProfile> for CompanyDto {
    fn from(c: CompanyProfile) -> Self {
        CompanyDto {
            name: c.name,
            tax_id: c.tax_id,
            address: c.address,
            phone: c.phone,
            email: c.email,
            logo_url: c.logo_url,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntryDto {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

impl From<ConfigEntry> for ConfigEntryDto {
    fn from(e: ConfigEntry) -> Self {
        ConfigEntryDto {
            key: e.key,
            value: e.value,
            updated_at: e.updated_at,
        }
    }
}

/// Effective settings after defaults, environment and stored entries.
pub fn get_config(state: &AppState) -> Settings {
    debug!("get_config command");
    state.config.snapshot()
}

pub async fn list_config_entries(state: &AppState) -> Result<Vec<ConfigEntryDto>, ApiError> {
    let entries = state.db().config().all().await?;
    Ok(entries.into_iter().map(ConfigEntryDto::from).collect())
}

pub async fn get_config_entry(state: &AppState, key: &str) -> Result<Option<String>, ApiError> {
    validate_config_key(key)?;
    Ok(state.db().config().get(key).await?)
}

/// Stores a settings entry.
///
/// Known keys are validated first; an invalid value is rejected without
/// being stored.
pub async fn set_config_entry(
    state: &AppState,
    key: &str,
    value: &str,
) -> Result<ConfigEntryDto, ApiError> {
    debug!(key = %key, "set_config_entry command");
    validate_config_key(key)?;

    // Validate against a scratch copy so a bad value never reaches the db.
    let mut scratch = state.config.snapshot();
    scratch.apply(key, value)?;

    let entry = state.db().config().set(key, value.trim()).await?;
    if state.config.apply(key, value)? {
        info!(key = %key, "Setting applied");
    }

    Ok(ConfigEntryDto::from(entry))
}

/// Removes a settings entry; the setting falls back to its environment
/// value or default.
///
/// ## Returns
/// Whether the entry existed.
pub async fn delete_config_entry(state: &AppState, key: &str) -> Result<bool, ApiError> {
    debug!(key = %key, "delete_config_entry command");
    validate_config_key(key)?;

    let existed = state.db().config().delete(key).await?;
    if existed {
        state.config.reload(state.db()).await?;
    }
    Ok(existed)
}

pub async fn get_company_profile(state: &AppState) -> Result<Option<CompanyDto>, ApiError> {
    Ok(state.db().company().get().await?.map(CompanyDto::from))
}

pub async fn update_company_profile(
    state: &AppState,
    input: CompanyProfileInput,
) -> Result<CompanyDto, ApiError> {
    debug!(name = %input.name, "update_company_profile command");
    validate_party_name(&input.name)?;

    let email = non_blank(input.email);
    if let Some(email) = &email {
        validate_email(email)?;
    }

    let profile = state
        .db()
        .company()
        .upsert(&CompanyProfileInput {
            name: input.name.trim().to_string(),
            tax_id: non_blank(input.tax_id).map(|t| t.to_uppercase()),
            address: non_blank(input.address),
            phone: non_blank(input.phone),
            email,
            logo_url: non_blank(input.logo_url),
        })
        .await?;

    Ok(CompanyDto::from(profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::sale::get_sale_draft;
    use crate::commands::test_support::app;
    use crate::error::ErrorCode;
    use crate::state::{KEY_LOW_STOCK, KEY_TAX_RATE};
    use mostrador_core::Percentage;

    #[tokio::test]
    async fn test_tax_rate_entry_reaches_new_drafts() {
        let state = app().await;

        set_config_entry(&state, KEY_TAX_RATE, "8").await.unwrap();
        assert_eq!(get_config(&state).tax_rate, Percentage::from_percent(8));

        // The open draft keeps its tax until it is cleared
        assert_eq!(get_sale_draft(&state).tax_bps, 1_600);
        let cleared = crate::commands::sale::clear_sale_draft(&state);
        assert_eq!(cleared.tax_bps, 800);
    }

    #[tokio::test]
    async fn test_invalid_value_is_not_stored() {
        let state = app().await;

        let err = set_config_entry(&state, KEY_LOW_STOCK, "muchos").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(get_config_entry(&state, KEY_LOW_STOCK).await.unwrap(), None);

        assert!(set_config_entry(&state, "Bad Key", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_falls_back() {
        let state = app().await;
        set_config_entry(&state, KEY_LOW_STOCK, "12").await.unwrap();
        set_config_entry(&state, "receipt_footer", "Gracias por su compra").await.unwrap();
        assert_eq!(get_config(&state).low_stock_threshold, 12);
        assert_eq!(list_config_entries(&state).await.unwrap().len(), 2);

        assert!(delete_config_entry(&state, KEY_LOW_STOCK).await.unwrap());
        assert_eq!(get_config(&state).low_stock_threshold, Settings::from_env().low_stock_threshold);
        assert!(!delete_config_entry(&state, KEY_LOW_STOCK).await.unwrap());
    }

    #[tokio::test]
    async fn test_company_profile() {
        let state = app().await;
        assert!(get_company_profile(&state).await.unwrap().is_none());

        let profile = update_company_profile(
            &state,
            CompanyProfileInput {
                name: "Abarrotes La Esquina".to_string(),
                tax_id: Some("ale900101ab1".to_string()),
                logo_url: Some("https://storage.example.com/logos/esquina.png".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(profile.tax_id.as_deref(), Some("ALE900101AB1"));
        let stored = get_company_profile(&state).await.unwrap().unwrap();
        assert_eq!(stored.logo_url, profile.logo_url);
    }
}
